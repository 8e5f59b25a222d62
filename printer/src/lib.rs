//! The printer capability the dispatcher drives, and a dry-run implementation
//! that "prints" by waiting for the job's declared duration.

mod dry_printer;

pub use dry_printer::DryPrinter;

use async_trait::async_trait;
use job::Job;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrintError {
    #[error("print has been canceled")]
    Cancelled,
    #[error("printer is busy with another job")]
    Busy,
    #[error("print failed: {0}")]
    Failed(String),
}

/// Performs one job at a time.
///
/// `print` resolves when the job is done or has been aborted. `cancel` aborts
/// whatever job is inside `print` right now and hands it back once `print`
/// has observed the abort. When no job is printing, `cancel` must resolve
/// immediately with `None`.
#[async_trait]
pub trait Printer: Send + Sync {
    async fn print(&self, job: &Job) -> Result<(), PrintError>;
    async fn cancel(&self) -> Option<Job>;
}
