//! fleetgrid API client library
//!
//! Models the slice of the fleetgrid platform's object store that the
//! import tooling consumes: groups, the asset classes that may reference
//! them, and a session trait offering `Get`/`Add`/`Set`/`Remove` style
//! operations.
//!
//! # Modules
//!
//! - [`entities`] - Wire entities (`Group`, `AssetRef`, `EntityId`)
//! - [`session`] - The [`ApiSession`] trait consumed by callers
//! - [`client`] - [`ApiClient`], the reqwest-based implementation
//! - [`error`] - [`ApiError`] with transient/permanent classification

pub mod client;
pub mod entities;
pub mod error;
pub mod session;

pub use client::ApiClient;
pub use entities::{AssetClass, AssetRef, EntityId, Group};
pub use error::{ApiError, ApiResult};
pub use session::ApiSession;
