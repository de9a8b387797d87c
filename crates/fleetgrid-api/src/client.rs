//! reqwest-based implementation of [`ApiSession`].
//!
//! The platform speaks a JSON-RPC style convention over HTTPS: a single
//! endpoint accepting `{"method": ..., "params": ...}` bodies, where the
//! methods are `Authenticate`, `Get`, `Add`, `Set` and `Remove` and
//! entity-typed calls carry a `typeName`. Session credentials obtained
//! from `Authenticate` are attached to every subsequent call.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::entities::{AssetClass, AssetRef, EntityId, Group};
use crate::error::{ApiError, ApiResult};
use crate::session::ApiSession;

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Session credentials returned by `Authenticate` and replayed on every
/// call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCredentials {
    database: String,
    user_name: String,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResult {
    credentials: SessionCredentials,
}

/// Error object embedded in an RPC response body.
#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
    #[serde(default)]
    code: Option<u16>,
}

/// Asset entity as it appears on the wire; only the group references are
/// decoded.
#[derive(Debug, Serialize, Deserialize)]
struct WireAsset {
    id: EntityId,
    #[serde(default)]
    groups: Vec<EntityId>,
}

/// HTTP client for the platform API.
///
/// Holds connection parameters and, after [`authenticate`], the session
/// credentials. Cheap to share behind a reference; all methods take
/// `&self`.
///
/// [`authenticate`]: ApiClient::authenticate
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
    database: String,
    username: String,
    password: String,
    credentials: RwLock<Option<SessionCredentials>>,
}

impl ApiClient {
    /// Create a client for the given server and account.
    ///
    /// `server` is a host name (`my.fleetgrid.example`) or a full base URL;
    /// the RPC endpoint path is appended either way.
    pub fn new(
        server: &str,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::network(format!("failed to build HTTP client: {e}")))?;

        let base = if server.contains("://") {
            server.trim_end_matches('/').to_string()
        } else {
            format!("https://{server}")
        };

        Ok(Self {
            http,
            endpoint: format!("{base}/apiv1"),
            database: database.into(),
            username: username.into(),
            password: password.into(),
            credentials: RwLock::new(None),
        })
    }

    /// The RPC endpoint this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Authenticate and store session credentials for subsequent calls.
    pub async fn authenticate(&self) -> ApiResult<()> {
        let params = json!({
            "database": self.database,
            "userName": self.username,
            "password": self.password,
        });

        let result: AuthenticateResult = match self.post("Authenticate", params).await? {
            RpcOutcome::Result(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(format!("authenticate result: {e}")))?,
            RpcOutcome::Error(err) => return Err(ApiError::Authentication(err.message)),
        };

        debug!(database = %self.database, user = %self.username, "authenticated");
        *self.credentials.write().expect("credentials lock poisoned") =
            Some(result.credentials);
        Ok(())
    }

    /// Issue one RPC call, attaching session credentials.
    async fn call<T: DeserializeOwned>(&self, method: &str, mut params: Value) -> ApiResult<T> {
        let credentials = self
            .credentials
            .read()
            .expect("credentials lock poisoned")
            .clone()
            .ok_or_else(|| ApiError::Authentication("not authenticated".to_string()))?;

        params["credentials"] = serde_json::to_value(&credentials)?;

        match self.post(method, params).await? {
            RpcOutcome::Result(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(format!("{method} result: {e}"))),
            RpcOutcome::Error(err) => Err(ApiError::Server {
                code: err.code.unwrap_or(400),
                message: err.message,
            }),
        }
    }

    async fn post(&self, method: &str, params: Value) -> ApiResult<RpcOutcome> {
        debug!(%method, endpoint = %self.endpoint, "rpc call");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "method": method, "params": params }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                code: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        if let Some(error) = body.get("error") {
            let err: RpcError = serde_json::from_value(error.clone())
                .map_err(|e| ApiError::InvalidResponse(format!("error object: {e}")))?;
            return Ok(RpcOutcome::Error(err));
        }

        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| ApiError::InvalidResponse("missing result field".to_string()))?;
        Ok(RpcOutcome::Result(result))
    }
}

enum RpcOutcome {
    Result(Value),
    Error(RpcError),
}

#[async_trait]
impl ApiSession for ApiClient {
    async fn fetch_groups(&self) -> ApiResult<Vec<Group>> {
        self.call("Get", json!({ "typeName": "Group" })).await
    }

    async fn add_group(&self, group: &Group) -> ApiResult<EntityId> {
        self.call(
            "Add",
            json!({ "typeName": "Group", "entity": group }),
        )
        .await
    }

    async fn set_group(&self, group: &Group) -> ApiResult<EntityId> {
        self.call(
            "Set",
            json!({ "typeName": "Group", "entity": group }),
        )
        .await
    }

    async fn remove_group(&self, group: &Group) -> ApiResult<()> {
        let _: Value = self
            .call(
                "Remove",
                json!({ "typeName": "Group", "entity": group }),
            )
            .await?;
        Ok(())
    }

    async fn fetch_asset_refs(&self, class: AssetClass) -> ApiResult<Vec<AssetRef>> {
        let wire: Vec<WireAsset> = self
            .call("Get", json!({ "typeName": class.type_name() }))
            .await?;
        Ok(wire
            .into_iter()
            .map(|asset| AssetRef {
                id: asset.id,
                class,
                group_ids: asset.groups,
            })
            .collect())
    }

    async fn set_asset_groups(&self, asset: &AssetRef) -> ApiResult<()> {
        let entity = WireAsset {
            id: asset.id.clone(),
            groups: asset.group_ids.clone(),
        };
        let _: Value = self
            .call(
                "Set",
                json!({ "typeName": asset.class.type_name(), "entity": entity }),
            )
            .await?;
        Ok(())
    }
}
