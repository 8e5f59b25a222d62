//! Single-printer job dispatcher.
//!
//! A coordinator task owns every piece of mutable dispatcher state: the
//! pending queue receiver, the printed list and the printer slot. Callers talk
//! to it through [`DispatcherTx`], which only ever sends messages.
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use dispatcher::DispatcherOptions;
//! use job::Job;
//! use printer::DryPrinter;
//!
//! # async fn demo() {
//! let dispatcher = dispatcher::spawn(Arc::new(DryPrinter::new()), DispatcherOptions::default());
//!
//! dispatcher
//!     .print(Job::new(4, "invoice".to_owned(), Duration::from_millis(10)))
//!     .await;
//!
//! let printed = dispatcher.printed_jobs().await;
//! let never_printed = dispatcher.stop().await;
//! # }
//! ```
//!
//! Jobs are handed to the printer one at a time, but not necessarily in
//! submission order: every dequeued job gets its own helper task, and helpers
//! race for the single printer slot.

mod coordinator;

use std::time::Duration;

use thiserror::Error;
use utils::settings;

pub use coordinator::{average_duration, create, spawn, DispatcherRx, DispatcherTx};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no printed jobs, average print duration is undefined")]
    NoPrintedJobs,
    #[error("dispatcher is stopped")]
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Pending queue capacity. Submitters wait while it is full.
    pub capacity: usize,
    /// Upper bound on how long the coordinator waits for `Printer::cancel`.
    pub cancel_timeout: Option<Duration>,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            capacity: settings::DEFAULT_QUEUE_CAPACITY,
            cancel_timeout: None,
        }
    }
}

impl DispatcherOptions {
    pub fn from_settings() -> Self {
        Self {
            capacity: settings::queue_capacity(),
            cancel_timeout: settings::cancel_timeout(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_cancel_timeout(mut self, timeout: Duration) -> Self {
        self.cancel_timeout = Some(timeout);
        self
    }
}
