#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dispatcher::DispatcherTx;
use job::Job;
use printer::{PrintError, Printer};

pub const WAIT: Duration = Duration::from_millis(500);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn job(type_name: &str, print_duration: Duration) -> Job {
    Job::new(42, type_name.to_owned(), print_duration)
}

/// Printer driven by the test: `print` blocks until the test takes the job
/// with [`MockPrinter::current_job`] or the dispatcher cancels it.
pub struct MockPrinter {
    tx: flume::Sender<Job>,
    rx: flume::Receiver<Job>,
    started_tx: flume::Sender<()>,
    started_rx: flume::Receiver<()>,
    cancelled: AtomicBool,
}

impl MockPrinter {
    pub fn new() -> Self {
        let (tx, rx) = flume::bounded(0);
        let (started_tx, started_rx) = flume::bounded(1);
        Self {
            tx,
            rx,
            started_tx,
            started_rx,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Resolves once some job entered `print`.
    pub async fn wait_for_printing(&self) -> bool {
        tokio::time::timeout(WAIT, self.started_rx.recv_async())
            .await
            .is_ok()
    }

    /// Finishes the job currently inside `print` and returns it.
    pub async fn current_job(&self) -> Option<Job> {
        tokio::time::timeout(WAIT, self.rx.recv_async())
            .await
            .ok()?
            .ok()
    }
}

#[async_trait]
impl Printer for MockPrinter {
    async fn print(&self, job: &Job) -> Result<(), PrintError> {
        let _ = self.started_tx.try_send(());
        self.tx
            .send_async(job.clone())
            .await
            .map_err(|e| PrintError::Failed(e.to_string()))?;

        if self.cancelled.swap(false, Ordering::AcqRel) {
            Err(PrintError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn cancel(&self) -> Option<Job> {
        self.cancelled.store(true, Ordering::Release);
        let job = tokio::time::timeout(WAIT, self.rx.recv_async())
            .await
            .ok()
            .and_then(Result::ok);
        if job.is_none() {
            self.cancelled.store(false, Ordering::Release);
        }
        job
    }
}

/// Wraps a printer and records which jobs entered `print`, how many were
/// inside at once and how often `cancel` was called.
pub struct CountingPrinter<P> {
    inner: P,
    started: Mutex<Vec<Job>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl<P> CountingPrinter<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            started: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn started(&self) -> Vec<Job> {
        self.started.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<P: Printer> Printer for CountingPrinter<P> {
    async fn print(&self, job: &Job) -> Result<(), PrintError> {
        self.started.lock().unwrap().push(job.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.inner.print(job).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn cancel(&self) -> Option<Job> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel().await
    }
}

/// Prints instantly, but `cancel` holds the coordinator until the test drops
/// the release handle returned by [`GatePrinter::new`].
pub struct GatePrinter {
    release_rx: flume::Receiver<()>,
    entered_tx: flume::Sender<()>,
    entered_rx: flume::Receiver<()>,
}

impl GatePrinter {
    pub fn new() -> (Self, flume::Sender<()>) {
        let (release_tx, release_rx) = flume::bounded(0);
        let (entered_tx, entered_rx) = flume::bounded(1);
        (
            Self {
                release_rx,
                entered_tx,
                entered_rx,
            },
            release_tx,
        )
    }

    /// Resolves once the coordinator is stuck inside `cancel`.
    pub async fn wait_for_cancel(&self) -> bool {
        tokio::time::timeout(WAIT, self.entered_rx.recv_async())
            .await
            .is_ok()
    }
}

#[async_trait]
impl Printer for GatePrinter {
    async fn print(&self, _job: &Job) -> Result<(), PrintError> {
        Ok(())
    }

    async fn cancel(&self) -> Option<Job> {
        let _ = self.entered_tx.try_send(());
        let _ = self.release_rx.recv_async().await;
        None
    }
}

/// Polls `condition` until it holds or five seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}

/// Polls until at least `count` jobs are reported printed.
pub async fn wait_for_printed(dispatcher: &DispatcherTx, count: usize) -> Vec<Job> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let printed = dispatcher.printed_jobs().await;
        if printed.len() >= count || tokio::time::Instant::now() >= deadline {
            return printed;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
