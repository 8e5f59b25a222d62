use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::settings;

use super::error::Result;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

pub struct LogParams<'a, P: AsRef<Path>> {
    /// Overrides the configured printq dir.
    pub log_dir: Option<P>,
    pub sub_dir: Option<&'a str>,
    pub log_name: &'a str,
    pub output_to_console: bool,
}

pub fn log_file_path<P: AsRef<Path>>(params: &LogParams<P>) -> PathBuf {
    let mut logger_dir = match &params.log_dir {
        Some(dir) => dir.as_ref().to_path_buf(),
        None => settings::printq_dir().unwrap_or_else(std::env::temp_dir),
    };

    if let Some(sub_dir) = params.sub_dir {
        logger_dir.push(sub_dir);
    }

    logger_dir.join(format!("{}.log", params.log_name))
}

pub fn setup_logging<P: AsRef<Path>>(params: LogParams<P>) -> Result<non_blocking::WorkerGuard> {
    let file_path = log_file_path(&params);

    let f = create_file_with_dirs(&file_path)?;

    let (non_blocking, guard) = non_blocking(f);
    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(LevelFilter::TRACE);

    let subscriber = Registry::default().with(file_layer);

    if params.output_to_console {
        // console goes to stderr, stdout is reserved for command output
        let console_layer = fmt::Layer::default()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(cfg!(debug_assertions))
            .with_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            );

        tracing::subscriber::set_global_default(subscriber.with(console_layer))?;
    } else {
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Logging to file: {:?}", file_path);

    Ok(guard)
}

fn create_file_with_dirs<P: AsRef<Path>>(file_path: P) -> io::Result<File> {
    if let Some(parent) = file_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    File::options().create(true).append(true).open(file_path)
}
