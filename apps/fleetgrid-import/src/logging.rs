//! Progress logging.
//!
//! Lines go to stdout, or to a file when redirected with `--f`. File
//! lines are timestamped; terminal lines are not.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

enum Sink {
    Stdout,
    File(BufWriter<File>),
}

pub struct Logger {
    verbose: bool,
    sink: Mutex<Sink>,
}

impl Logger {
    /// Create a logger, opening (and truncating) the log file if one was
    /// requested.
    pub fn new(verbose: bool, log_file: Option<&Path>) -> io::Result<Self> {
        let sink = match log_file {
            Some(path) => Sink::File(BufWriter::new(File::create(path)?)),
            None => Sink::Stdout,
        };
        Ok(Self {
            verbose,
            sink: Mutex::new(sink),
        })
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Write one line.
    pub fn line(&self, message: &str) {
        let mut sink = self.sink.lock().expect("log sink lock poisoned");
        match &mut *sink {
            Sink::Stdout => println!("{message}"),
            Sink::File(writer) => {
                let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
                // A log line that cannot be written is not worth aborting
                // an import over.
                let _ = writeln!(writer, "[{now}] {message}");
                let _ = writer.flush();
            }
        }
    }

    /// Write one line only in verbose mode.
    pub fn verbose_line(&self, message: &str) {
        if self.verbose {
            self.line(message);
        }
    }
}
