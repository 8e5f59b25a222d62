use std::fmt;
use thiserror::Error;

/// Result alias
pub type Result<T, E = Error> = anyhow::Result<T, E>;

/// Application level error. Library crates keep their own typed errors;
/// this one carries what the binary reports before exiting.
#[derive(Error, Debug)]
pub struct Error {
    pub msg: String,
    #[cfg(feature = "nightly")]
    backtrace: std::backtrace::Backtrace,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(msg: impl Into<String>) -> Self {
        Error {
            msg: msg.into(),
            #[cfg(feature = "nightly")]
            backtrace: std::backtrace::Backtrace::capture(),
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.msg, source),
            None => write!(f, "{}", self.msg),
        }
    }
}

macro_rules! impl_from_error {
    ($error_type:ty, $msg:expr) => {
        impl From<$error_type> for Error {
            fn from(err: $error_type) -> Self {
                Error {
                    source: Some(Box::new(err)),
                    ..Error::new($msg)
                }
            }
        }
    };
}

impl_from_error!(std::io::Error, "io error");
impl_from_error!(serde_json::Error, "invalid json");
impl_from_error!(serde_yaml::Error, "invalid yaml");
impl_from_error!(config::ConfigError, "invalid config");
impl_from_error!(tracing::subscriber::SetGlobalDefaultError, "logger already installed");
