//! Output naming and image export
//!
//! Naming is fixed and other tools rely on it:
//!
//! - single frame: `{parent}/{stem}.{format}`
//! - frame stack: directory `{parent}/{stem}_{format}/` holding
//!   `{stem}_{n}.{format}` for `n` in `1..=N`, zero-padded to `digits`
//!   characters when `digits > 1`
//!
//! Nothing is ever overwritten. Every target is checked before it is written,
//! and the final rename refuses to replace a file that appeared in between.

use crate::container::{Frame, PixelData};
use crate::errors::{ConvertError, Result};
use crate::formats::OutputFormat;
use crate::walker::FrameClassification;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Renders a 1-based frame number, zero-padded to `digits` when `digits > 1`
pub fn pad_frame_number(number: usize, digits: usize) -> String {
    if digits > 1 {
        format!("{:0width$}", number, width = digits)
    } else {
        number.to_string()
    }
}

pub fn single_frame_target(parent_dir: &Path, stem: &str, format: &str) -> PathBuf {
    parent_dir.join(format!("{}.{}", stem, format))
}

pub fn stack_directory(parent_dir: &Path, stem: &str, format: &str) -> PathBuf {
    parent_dir.join(format!("{}_{}", stem, format))
}

pub fn frame_target(
    directory: &Path,
    stem: &str,
    number: usize,
    digits: usize,
    format: &str,
) -> PathBuf {
    directory.join(format!("{}_{}.{}", stem, pad_frame_number(number, digits), format))
}

/// Where an export goes and how frames are named
#[derive(Debug, Clone)]
pub struct ExportSettings<'a> {
    pub stem: &'a str,
    pub parent_dir: &'a Path,
    pub format: &'a OutputFormat,
    pub digits: usize,
}

/// Files written by one export, and the error that stopped it, if any.
///
/// Frames written before a failure are kept and listed in `written`.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub error: Option<ConvertError>,
}

impl ExportReport {
    fn failed(error: ConvertError) -> Self {
        Self {
            written: Vec::new(),
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.written),
        }
    }
}

/// Writes one frame to `target` through a temporary file in the same directory.
fn write_target(target: &Path, frame: &Frame<'_>, format: &OutputFormat) -> Result<()> {
    if target.exists() {
        return Err(ConvertError::OutputExists {
            path: target.to_path_buf(),
        });
    }

    let directory = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".h5convert-")
        .suffix(".part")
        .tempfile_in(directory)?;

    format
        .encode(frame, staged.as_file_mut())
        .map_err(|e| ConvertError::Encode {
            path: target.to_path_buf(),
            message: e.to_string(),
        })?;
    staged.as_file().sync_all()?;

    staged.persist_noclobber(target).map_err(|e| {
        if e.error.kind() == ErrorKind::AlreadyExists {
            ConvertError::OutputExists {
                path: target.to_path_buf(),
            }
        } else {
            ConvertError::IoError(e.error)
        }
    })?;

    debug!(path = %target.display(), "wrote image");
    Ok(())
}

fn create_stack_directory(directory: &Path) -> Result<()> {
    if directory.exists() {
        return Err(ConvertError::OutputExists {
            path: directory.to_path_buf(),
        });
    }
    fs::create_dir(directory).map_err(|e| {
        if e.kind() == ErrorKind::AlreadyExists {
            ConvertError::OutputExists {
                path: directory.to_path_buf(),
            }
        } else {
            ConvertError::DirectoryCreate {
                path: directory.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Exports materialized dataset values according to their classification.
///
/// A single frame becomes one file next to the source. A stack of `N` frames
/// becomes a new directory of `N` files; the first frame that fails stops
/// the remaining ones.
pub fn export(
    values: &PixelData,
    classification: FrameClassification,
    settings: &ExportSettings<'_>,
) -> ExportReport {
    let format = settings.format.name();

    match classification {
        FrameClassification::SingleFrame => {
            let target = single_frame_target(settings.parent_dir, settings.stem, format);
            let result = values
                .single_frame()
                .and_then(|frame| write_target(&target, &frame, settings.format));
            match result {
                Ok(()) => {
                    info!(path = %target.display(), "exported single frame");
                    ExportReport {
                        written: vec![target],
                        error: None,
                    }
                }
                Err(e) => ExportReport::failed(e),
            }
        }
        FrameClassification::FrameStack { frames } => export_stack(values, frames, settings),
        FrameClassification::NotImage => ExportReport::failed(ConvertError::Generic(format!(
            "shape {:?} cannot be exported as images",
            values.shape()
        ))),
    }
}

fn export_stack(values: &PixelData, frames: usize, settings: &ExportSettings<'_>) -> ExportReport {
    let format = settings.format.name();
    let directory = stack_directory(settings.parent_dir, settings.stem, format);

    if values.shape().len() != 3 {
        return ExportReport::failed(ConvertError::Encode {
            path: directory,
            message: format!("frames of shape {:?} are not 2D", values.shape()),
        });
    }

    if let Err(e) = create_stack_directory(&directory) {
        return ExportReport::failed(e);
    }

    let mut report = ExportReport::default();
    for index in 0..frames {
        let target = frame_target(&directory, settings.stem, index + 1, settings.digits, format);
        let result = values
            .frame(index)
            .and_then(|frame| write_target(&target, &frame, settings.format));
        match result {
            Ok(()) => report.written.push(target),
            Err(e) => {
                report.error = Some(e);
                break;
            }
        }
    }

    info!(
        directory = %directory.display(),
        written = report.written.len(),
        frames,
        "exported frame stack"
    );
    report
}
