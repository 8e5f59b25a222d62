use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use job::Job;
use printer::{PrintError, Printer};
use tokio::sync::{oneshot, OnceCell, Semaphore};
use tracing::{debug, info, warn};
use utils::log_warn;

use crate::{DispatchError, DispatcherOptions};

const CANCEL_RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// Dequeue position of a job. Jobs handed back by helper tasks are sorted by
/// it, which restores submission order.
type Seq = u64;

enum Command {
    Cancel(oneshot::Sender<Option<Job>>),
    PrintedJobs(oneshot::Sender<Vec<Job>>),
    /// Ends the loop. The reply carries every job that never reached the
    /// printer.
    Abort(oneshot::Sender<Vec<Job>>),
}

struct Shared {
    stopped: AtomicBool,
    leftover: OnceCell<Vec<Job>>,
}

/// Caller side of the dispatcher. Cheap to clone; all clones share the same
/// coordinator and the same stopped state.
#[derive(Clone)]
pub struct DispatcherTx {
    queue_tx: Sender<Job>,
    control_tx: Sender<Command>,
    shared: Arc<Shared>,
}

/// Coordinator side of the dispatcher, consumed by [`DispatcherRx::event_loop`].
pub struct DispatcherRx<P: Printer> {
    printer: Arc<P>,
    cancel_timeout: Option<Duration>,
    queue_rx: Receiver<Job>,
    control_rx: Receiver<Command>,
}

/// The single printer slot. `in_print` is set while the permit holder is
/// committed to printing its job.
#[derive(Clone)]
struct Slot {
    quota: Arc<Semaphore>,
    in_print: Arc<AtomicBool>,
}

pub fn create<P: Printer>(
    printer: Arc<P>, options: DispatcherOptions,
) -> (DispatcherTx, DispatcherRx<P>) {
    let (queue_tx, queue_rx) = flume::bounded(options.capacity.max(1));
    let (control_tx, control_rx) = flume::unbounded();

    (
        DispatcherTx {
            queue_tx,
            control_tx,
            shared: Arc::new(Shared {
                stopped: AtomicBool::new(false),
                leftover: OnceCell::new(),
            }),
        },
        DispatcherRx {
            printer,
            cancel_timeout: options.cancel_timeout,
            queue_rx,
            control_rx,
        },
    )
}

/// Creates a dispatcher and starts its coordinator on the current runtime.
pub fn spawn<P: Printer + 'static>(printer: Arc<P>, options: DispatcherOptions) -> DispatcherTx {
    let (tx, rx) = create(printer, options);
    rx.event_loop();
    tx
}

impl DispatcherTx {
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Queues `job`, waiting while the pending queue is full. A no-op once
    /// the dispatcher is stopped.
    pub async fn print(&self, job: Job) {
        if self.is_stopped() {
            debug!("dispatcher stopped, ignore job: {}", job);
            return;
        }

        info!("put job in queue: {}", job);
        if let Err(flume::SendError(job)) = self.queue_tx.send_async(job).await {
            warn!("coordinator is gone, dropping job: {}", job);
        }
    }

    /// Aborts the job the printer is working on and returns it, or `None`
    /// when nothing is printing or the dispatcher is stopped.
    pub async fn cancel(&self) -> Option<Job> {
        if self.is_stopped() {
            debug!("cannot cancel, dispatcher already stopped");
            return None;
        }

        info!("cancel active printing");
        let (tx, rx) = oneshot::channel();
        if !self.send_command(Command::Cancel(tx)) {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Snapshot of the successfully printed jobs, in completion order. Empty
    /// once the dispatcher is stopped.
    pub async fn printed_jobs(&self) -> Vec<Job> {
        if self.is_stopped() {
            return Vec::new();
        }

        debug!("get printed jobs");
        let (tx, rx) = oneshot::channel();
        if !self.send_command(Command::PrintedJobs(tx)) {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn avg_print_duration(&self) -> Result<Duration, DispatchError> {
        if self.is_stopped() {
            return Err(DispatchError::Stopped);
        }

        let jobs = self.printed_jobs().await;
        debug!("calc avg duration of {} printed job(s)", jobs.len());
        average_duration(&jobs)
    }

    /// Stops the dispatcher and returns the jobs that never entered
    /// `Printer::print`, in submission order. The job being printed is
    /// cancelled and not returned. Later calls return the same jobs and do
    /// nothing else.
    pub async fn stop(&self) -> Vec<Job> {
        if self
            .shared
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("dispatcher already stopped");
        }

        self.shared
            .leftover
            .get_or_init(|| self.shutdown())
            .await
            .clone()
    }

    async fn shutdown(&self) -> Vec<Job> {
        let (tx, rx) = oneshot::channel();
        if !self.send_command(Command::Abort(tx)) {
            return Vec::new();
        }

        let leftover = rx.await.unwrap_or_else(|err| {
            log_warn(err);
            Vec::new()
        });
        info!("dispatcher stopped, {} job(s) never printed", leftover.len());
        leftover
    }

    fn send_command(&self, command: Command) -> bool {
        match self.control_tx.send(command) {
            Ok(()) => true,
            Err(_) => {
                debug!("coordinator is gone");
                false
            }
        }
    }
}

impl<P> DispatcherRx<P>
where
    P: Printer + 'static,
{
    pub fn event_loop(self) -> tokio::task::JoinHandle<()> {
        let Self {
            printer,
            cancel_timeout,
            queue_rx,
            control_rx,
        } = self;

        let slot = Slot {
            quota: Arc::new(Semaphore::new(1)),
            in_print: Arc::new(AtomicBool::new(false)),
        };
        let (printed_tx, printed_rx) = flume::unbounded::<Job>();
        let (returned_tx, returned_rx) = flume::unbounded::<(Seq, Job)>();
        let mut printed: Vec<Job> = Vec::new();
        let mut seq: Seq = 0;

        tokio::spawn(async move {
            let abort = loop {
                // Completions first, so a query sees every job whose helper
                // already reported success.
                tokio::select! {
                    biased;

                    Ok(job) = printed_rx.recv_async() => {
                        debug!("add job to printed list: {}", job);
                        printed.push(job);
                    }
                    command = control_rx.recv_async() => match command {
                        Ok(Command::Cancel(reply)) => {
                            debug!("perform cancel action");
                            let job = cancel_printing(printer.as_ref(), cancel_timeout).await;
                            reply.send(job).unwrap_or_else(log_warn);
                        }
                        Ok(Command::PrintedJobs(reply)) => {
                            reply.send(printed.clone()).unwrap_or_else(log_warn);
                        }
                        Ok(Command::Abort(reply)) => break Some(reply),
                        Err(_) => {
                            info!("all dispatcher handles dropped");
                            break None;
                        }
                    },
                    Ok(job) = queue_rx.recv_async() => {
                        debug!("get new job: {}", job);
                        spawn_print(
                            seq,
                            job,
                            Arc::clone(&printer),
                            slot.clone(),
                            printed_tx.clone(),
                            returned_tx.clone(),
                        );
                        seq += 1;
                    }
                }
            };

            slot.quota.close();
            drop(returned_tx);

            // Waiting helpers hand their job back; the channel closes once
            // every helper has either done so or committed to printing.
            let mut returned = Vec::new();
            while let Ok(job) = returned_rx.recv_async().await {
                returned.push(job);
            }
            returned.sort_by_key(|(seq, _)| *seq);

            if let Some(job) = abort_printing(printer.as_ref(), &slot, cancel_timeout).await {
                info!("cancelled while stopping: {}", job);
            }

            let mut leftover: Vec<Job> = returned.into_iter().map(|(_, job)| job).collect();
            // `try_recv` also takes the jobs of submitters blocked on a full
            // queue.
            while let Ok(job) = queue_rx.try_recv() {
                leftover.push(job);
            }

            if let Some(reply) = abort {
                reply.send(leftover).unwrap_or_else(log_warn);
            }
            info!("stopped printer");
        })
    }
}

/// Helper task for one job: waits for the printer slot, prints, reports.
/// Hands the job back instead when the slot is closed first.
fn spawn_print<P: Printer + 'static>(
    seq: Seq, job: Job, printer: Arc<P>, slot: Slot, printed_tx: Sender<Job>,
    returned_tx: Sender<(Seq, Job)>,
) {
    tokio::spawn(async move {
        debug!("wait for printing: {}", job);
        let permit = match Arc::clone(&slot.quota).acquire_owned().await {
            Ok(permit) if !slot.quota.is_closed() => permit,
            _ => {
                debug!("dispatcher stopped before printing, hand back job: {}", job);
                returned_tx.send((seq, job)).unwrap_or_else(log_warn);
                return;
            }
        };
        slot.in_print.store(true, Ordering::Release);
        drop(returned_tx);

        info!("printing: {}", job);
        let result = printer.print(&job).await;
        slot.in_print.store(false, Ordering::Release);
        drop(permit);

        match result {
            Ok(()) => {
                info!("successful printed: {}", job);
                printed_tx.send(job).unwrap_or_else(log_warn);
            }
            Err(PrintError::Cancelled) => info!("print canceled: {}", job),
            Err(err) => warn!("print failed: {} {}", job, err),
        }
    });
}

async fn cancel_printing<P: Printer + ?Sized>(
    printer: &P, timeout: Option<Duration>,
) -> Option<Job> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, printer.cancel())
            .await
            .unwrap_or_else(|_| {
                warn!("printer did not cancel within {:?}", timeout);
                None
            }),
        None => printer.cancel().await,
    }
}

/// Cancels the job in the slot. A helper may own the slot before its printer
/// has registered the job, so cancel is retried until the printer hands the
/// job back or the helper leaves the slot.
async fn abort_printing<P: Printer + ?Sized>(
    printer: &P, slot: &Slot, timeout: Option<Duration>,
) -> Option<Job> {
    loop {
        if let Some(job) = cancel_printing(printer, timeout).await {
            return Some(job);
        }
        if !slot.in_print.load(Ordering::Acquire) {
            return None;
        }
        tokio::time::sleep(CANCEL_RETRY_INTERVAL).await;
    }
}

/// Mean print duration of `jobs`; undefined for an empty slice.
pub fn average_duration(jobs: &[Job]) -> Result<Duration, DispatchError> {
    if jobs.is_empty() {
        return Err(DispatchError::NoPrintedJobs);
    }

    let total: u128 = jobs.iter().map(|j| j.print_duration().as_nanos()).sum();
    let avg = total / jobs.len() as u128;
    Ok(Duration::from_nanos(u64::try_from(avg).unwrap_or(u64::MAX)))
}
