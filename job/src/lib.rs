mod duration_ms;

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use utils::error::{Error, Result};

/// One unit of print work. Jobs have no identity of their own: two jobs with
/// the same attributes are the same job.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
    derive_more::Constructor,
)]
#[display(
    fmt = "[type: {}, size: {}, duration: {:?}]",
    type_name,
    paper_size,
    print_duration
)]
pub struct Job {
    paper_size: i64,
    type_name: String,
    #[serde(rename = "print_duration_ms", with = "duration_ms")]
    print_duration: Duration,
}

impl Job {
    pub fn paper_size(&self) -> i64 {
        self.paper_size
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn print_duration(&self) -> Duration {
        self.print_duration
    }
}

/// Reads a YAML (`.yaml`/`.yml`) or JSON (`.json`) sequence of jobs.
pub fn load_jobs<P: AsRef<Path>>(path: P) -> Result<Vec<Job>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&content)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        _ => Err(Error::new(&format!(
            "unsupported job file {}, expected .json, .yaml or .yml",
            path.display()
        ))),
    }
}
