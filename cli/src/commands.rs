use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dispatcher::{average_duration, DispatcherOptions, DispatcherTx};
use job::Job;
use printer::DryPrinter;
use tracing::info;
use utils::error::{Error, Result};
use utils::logger::{setup_logging, LogParams};
use utils::settings;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Show the configuration
pub fn config() -> Result<()> {
    let config = settings::current_config();
    print!("{}", serde_yaml::to_string(&config)?);

    println!("# effective");
    println!("printq_dir: {:?}", settings::printq_dir());
    println!("queue_capacity: {}", settings::queue_capacity());
    println!("cancel_timeout: {:?}", settings::cancel_timeout());

    Ok(())
}

pub struct RunArgs {
    pub jobs_file: PathBuf,
    pub capacity: Option<usize>,
    pub cancel_after: Option<u64>,
    pub stop_after: Option<u64>,
    pub log_dir: Option<PathBuf>,
}

struct Report {
    printed: Vec<Job>,
    cancelled: Option<Job>,
    not_printed: Vec<Job>,
    dropped: usize,
}

pub fn run(args: RunArgs) -> Result<()> {
    let _guard = setup_logging(LogParams {
        log_dir: args.log_dir.as_deref(),
        sub_dir: None,
        log_name: "printq",
        output_to_console: true,
    })?;

    let jobs = job::load_jobs(&args.jobs_file)?;

    let mut options = DispatcherOptions::from_settings();
    if let Some(capacity) = args.capacity {
        if capacity == 0 {
            return Err(Error::new("--capacity must be greater than 0"));
        }
        options = options.with_capacity(capacity);
    }

    let report = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_async(jobs, options, args.cancel_after, args.stop_after));

    print_report(&report);
    Ok(())
}

async fn run_async(
    jobs: Vec<Job>, options: DispatcherOptions, cancel_after: Option<u64>,
    stop_after: Option<u64>,
) -> Report {
    let total = jobs.len();
    info!("submitting {} job(s) with {:?}", total, options);

    let dispatcher = dispatcher::spawn(Arc::new(DryPrinter::new()), options);
    let started = tokio::time::Instant::now();

    let submitter = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move {
            for job in jobs {
                dispatcher.print(job).await;
            }
        }
    });

    let cancelled = match cancel_after {
        Some(ms) => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            dispatcher.cancel().await
        }
        None => None,
    };

    match stop_after {
        Some(ms) => tokio::time::sleep_until(started + Duration::from_millis(ms)).await,
        None => wait_until_settled(&dispatcher, total - usize::from(cancelled.is_some())).await,
    }

    let printed = dispatcher.printed_jobs().await;
    let not_printed = dispatcher.stop().await;
    if let Err(err) = submitter.await {
        utils::log_error(err);
    }

    let dropped = total
        .saturating_sub(printed.len())
        .saturating_sub(not_printed.len())
        .saturating_sub(usize::from(cancelled.is_some()));

    Report {
        printed,
        cancelled,
        not_printed,
        dropped,
    }
}

async fn wait_until_settled(dispatcher: &DispatcherTx, expected: usize) {
    while dispatcher.printed_jobs().await.len() < expected {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_report(report: &Report) {
    println!("printed {} job(s):", report.printed.len());
    for job in &report.printed {
        println!("  {}", job);
    }

    match &report.cancelled {
        Some(job) => println!("cancelled: {}", job),
        None => println!("cancelled: none"),
    }

    println!("not printed {} job(s):", report.not_printed.len());
    for job in &report.not_printed {
        println!("  {}", job);
    }

    if report.dropped > 0 {
        println!("dropped {} unfinished job(s)", report.dropped);
    }

    match average_duration(&report.printed) {
        Ok(avg) => println!("average print duration: {:?}", avg),
        Err(err) => println!("average print duration: undefined ({})", err),
    }
}
