use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use job::Job;
use tokio::sync::oneshot;
use tracing::{debug, info};
use utils::log_warn;

use crate::{PrintError, Printer};

/// Sent by `cancel` to the running `print`, which answers with its job.
type AbortTx = oneshot::Sender<oneshot::Sender<Job>>;

/// Idle while `current` is `None`, Running otherwise.
#[derive(Default)]
pub struct DryPrinter {
    current: Mutex<Option<AbortTx>>,
}

impl DryPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_printing(&self) -> bool {
        self.current().is_some()
    }

    fn current(&self) -> MutexGuard<'_, Option<AbortTx>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Printer for DryPrinter {
    async fn print(&self, job: &Job) -> Result<(), PrintError> {
        let (abort_tx, abort_rx) = oneshot::channel::<oneshot::Sender<Job>>();
        {
            let mut current = self.current();
            if current.is_some() {
                return Err(PrintError::Busy);
            }
            *current = Some(abort_tx);
        }

        debug!("dry printing {} for {:?}", job, job.print_duration());

        let result = tokio::select! {
            _ = tokio::time::sleep(job.print_duration()) => Ok(()),
            Ok(reply) = abort_rx => {
                info!("dry print aborted: {}", job);
                reply.send(job.clone()).unwrap_or_else(log_warn);
                Err(PrintError::Cancelled)
            }
        };

        // Already empty when `cancel` raced the timer; its reply channel is
        // dropped together with `abort_rx` and it resolves to `None`.
        self.current().take();

        result
    }

    async fn cancel(&self) -> Option<Job> {
        let current = self.current().take();
        let Some(abort_tx) = current else {
            debug!("nothing to cancel, dry printer is idle");
            return None;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        abort_tx.send(reply_tx).ok()?;
        reply_rx.await.ok()
    }
}
