//! Batch conversion
//!
//! A [`ConversionJob`] converts one input file. The [`Orchestrator`] runs a
//! batch of jobs on a worker pool, waits for all of them, and reports
//! through the injected [`StatusSink`]: header lines listing the inputs and
//! the conversion parameters, one line per error or skipped dataset, and a
//! footer with the elapsed time.
//! A failing job never stops its siblings.

use crate::container::{Container, Hdf5Container};
use crate::errors::{ConvertError, Result};
use crate::export::{export, ExportSettings};
use crate::formats::FormatRegistry;
use crate::parallel::ParallelConfig;
use crate::status::StatusSink;
use crate::walker::{FrameClassification, Walker};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_FORMAT: &str = "tiff";
pub const DEFAULT_DIGITS: usize = 3;
pub const DEFAULT_SEARCH_TERM: &str = "data";
pub const MIN_DIGITS: usize = 1;
pub const MAX_DIGITS: usize = 10;

/// One input file plus the parameters it is converted with
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub search_term: String,
    pub format: String,
    pub digits: usize,
}

impl ConversionJob {
    pub fn new(
        input: impl Into<PathBuf>,
        search_term: impl Into<String>,
        format: impl Into<String>,
        digits: usize,
    ) -> Self {
        Self {
            input: input.into(),
            search_term: search_term.into(),
            format: format.into(),
            digits,
        }
    }

    /// A job with the default search term, format and padding
    pub fn with_defaults(input: impl Into<PathBuf>) -> Self {
        Self::new(input, DEFAULT_SEARCH_TERM, DEFAULT_FORMAT, DEFAULT_DIGITS)
    }

    fn validate_digits(&self) -> Result<()> {
        if (MIN_DIGITS..=MAX_DIGITS).contains(&self.digits) {
            Ok(())
        } else {
            Err(ConvertError::InvalidArgument {
                message: format!(
                    "digits must be between {} and {}, got {}",
                    MIN_DIGITS, MAX_DIGITS, self.digits
                ),
            })
        }
    }
}

/// What one job did
#[derive(Debug)]
pub struct JobOutcome {
    pub input: PathBuf,
    pub matches: usize,
    pub files_written: usize,
    pub errors: Vec<ConvertError>,
}

impl JobOutcome {
    fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            matches: 0,
            files_written: 0,
            errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcomes of every job in a batch, in submission order
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(JobOutcome::is_success)
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.errors.len()).sum()
    }

    pub fn files_written(&self) -> usize {
        self.outcomes.iter().map(|o| o.files_written).sum()
    }
}

/// Formats a wall-clock duration as seconds under a minute, minutes and seconds above
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < 60.0 {
        format!("{:.2} seconds", seconds)
    } else {
        let minutes = elapsed.as_secs() / 60;
        let remainder = seconds - (minutes * 60) as f64;
        format!("{} minutes and {:.2} seconds", minutes, remainder)
    }
}

/// Distinct values in first-seen order, comma separated
fn distinct<T: ToString>(values: impl Iterator<Item = T>) -> String {
    let mut seen: Vec<String> = Vec::new();
    for value in values.map(|v| v.to_string()) {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen.join(", ")
}

/// Runs conversion jobs and reports to a status sink
pub struct Orchestrator<'s> {
    registry: FormatRegistry,
    parallel: ParallelConfig,
    sink: &'s dyn StatusSink,
}

impl<'s> Orchestrator<'s> {
    pub fn new(sink: &'s dyn StatusSink) -> Self {
        Self {
            registry: FormatRegistry::default(),
            parallel: ParallelConfig::default(),
            sink,
        }
    }

    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    fn report(&self, input: &Path, error: &ConvertError) {
        warn!(input = %input.display(), %error, "conversion error");
        self.sink.append(&format!("{}: {}", input.display(), error));
    }

    fn record(&self, outcome: &mut JobOutcome, error: ConvertError) {
        self.report(&outcome.input, &error);
        outcome.errors.push(error);
    }

    /// Converts every matching dataset of one input file.
    ///
    /// Errors scoped to a dataset or frame are reported and the walk goes
    /// on; an unknown format, bad digits or an unopenable file end the job.
    pub fn run_job(&self, job: &ConversionJob) -> JobOutcome {
        let mut outcome = JobOutcome::new(&job.input);

        let format = match job
            .validate_digits()
            .and_then(|()| self.registry.resolve(&job.format))
        {
            Ok(format) => format,
            Err(e) => {
                self.record(&mut outcome, e);
                return outcome;
            }
        };

        let container = match Hdf5Container::open(&job.input) {
            Ok(container) => container,
            Err(e) => {
                self.record(&mut outcome, e);
                return outcome;
            }
        };

        let parent_dir = job.input.parent().unwrap_or_else(|| Path::new(""));
        let stem = job
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let settings = ExportSettings {
            stem: &stem,
            parent_dir,
            format: &format,
            digits: job.digits,
        };

        self.convert_matches(&container, &job.search_term, &settings, &mut outcome);

        info!(
            input = %job.input.display(),
            matches = outcome.matches,
            written = outcome.files_written,
            errors = outcome.errors.len(),
            "job finished"
        );
        outcome
    }

    fn convert_matches<C: Container + ?Sized>(
        &self,
        container: &C,
        search_term: &str,
        settings: &ExportSettings<'_>,
        outcome: &mut JobOutcome,
    ) {
        for item in Walker::new(container, search_term) {
            let found = match item {
                Ok(found) => found,
                Err(e) => {
                    self.record(outcome, e);
                    continue;
                }
            };
            outcome.matches += 1;

            let classification = found.classification();
            if classification == FrameClassification::NotImage {
                debug!(dataset = %found.name, shape = ?found.shape, "not an image");
                self.sink.append(&format!(
                    "{}: skipped dataset {} with shape {:?}",
                    outcome.input.display(),
                    found.name,
                    found.shape
                ));
                continue;
            }

            let values = match container.read(&found.name) {
                Ok(values) => values,
                Err(e) => {
                    self.record(outcome, e);
                    continue;
                }
            };

            let report = export(&values, classification, settings);
            outcome.files_written += report.written.len();
            if let Some(e) = report.error {
                self.record(outcome, e);
            }
        }
    }

    /// Runs all jobs to completion on the worker pool and reports the elapsed time.
    pub fn run_batch(&self, jobs: &[ConversionJob]) -> Result<BatchReport> {
        let pool = self.parallel.build_pool()?;

        self.sink.clear();
        let inputs: Vec<String> = jobs
            .iter()
            .map(|job| job.input.display().to_string())
            .collect();
        self.sink.append(&format!("Input files: {}", inputs.join(", ")));
        if !jobs.is_empty() {
            let formats = distinct(jobs.iter().map(|job| job.format.as_str()));
            let digits = distinct(jobs.iter().map(|job| job.digits));
            let terms = distinct(jobs.iter().map(|job| job.search_term.as_str()));
            self.sink.append(&format!("Output format: {}", formats));
            self.sink.append(&format!("Number of digits: {}", digits));
            self.sink.append(&format!("Search term: {}", terms));
        }

        let started = Instant::now();
        let outcomes: Vec<JobOutcome> =
            pool.install(|| jobs.par_iter().map(|job| self.run_job(job)).collect());
        let elapsed = started.elapsed();

        self.sink.append(&format!(
            "Conversion finished in {}",
            format_elapsed(elapsed)
        ));

        Ok(BatchReport { outcomes, elapsed })
    }
}
