#![cfg_attr(feature = "nightly", feature(backtrace))]

pub mod error;
pub mod logger;
pub mod settings;

pub fn log_error(err: impl std::fmt::Debug) {
    tracing::error!("{:?}", err)
}

pub fn log_warn(warn: impl std::fmt::Debug) {
    tracing::warn!("{:?}", warn)
}
