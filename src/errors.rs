//! Centralized error handling for h5convert
//!
//! Every failure the conversion pipeline can report is a variant of
//! [`ConvertError`]. The variants are scoped: some abort a whole job, others
//! only the dataset or frame they occurred on (see [`ConvertError::is_fatal_to_job`]).

use std::fmt;
use std::path::PathBuf;

/// Main error type for h5convert operations
#[derive(Debug)]
pub enum ConvertError {
    /// Input file missing, unreadable, or not an HDF5 container
    ContainerOpen { path: PathBuf, reason: String },

    /// A matched dataset could not be read into memory
    DatasetRead { dataset: String, reason: String },

    /// Requested output format has no registered encoder
    UnsupportedFormat { format: String },

    /// Output file or directory already exists
    OutputExists { path: PathBuf },

    /// Output directory for a frame stack could not be created
    DirectoryCreate { path: PathBuf, source: std::io::Error },

    /// Encoder failed while writing a target
    Encode { path: PathBuf, message: String },

    /// Conversion request parameter out of range
    InvalidArgument { message: String },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// I/O operation errors
    IoError(std::io::Error),

    /// HDF5 library errors not tied to a specific dataset
    Hdf5Error(hdf5::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Generic error
    Generic(String),
}

impl ConvertError {
    /// Errors that stop the whole job rather than one dataset or frame.
    pub fn is_fatal_to_job(&self) -> bool {
        matches!(
            self,
            ConvertError::ContainerOpen { .. }
                | ConvertError::UnsupportedFormat { .. }
                | ConvertError::InvalidArgument { .. }
        )
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::ContainerOpen { path, reason } => {
                write!(f, "Cannot open '{}': {}", path.display(), reason)
            }
            ConvertError::DatasetRead { dataset, reason } => {
                write!(f, "Error processing dataset {}: {}", dataset, reason)
            }
            ConvertError::UnsupportedFormat { format } => {
                write!(f, "Unsupported format: {}", format)
            }
            ConvertError::OutputExists { path } => write!(
                f,
                "'{}' already exists. Conversion stopped to prevent data loss.",
                path.display()
            ),
            ConvertError::DirectoryCreate { path, source } => {
                write!(f, "Cannot create directory '{}': {}", path.display(), source)
            }
            ConvertError::Encode { path, message } => {
                write!(f, "Failed to write '{}': {}", path.display(), message)
            }
            ConvertError::InvalidArgument { message } => write!(f, "Invalid argument: {}", message),
            ConvertError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            ConvertError::IoError(e) => write!(f, "I/O error: {}", e),
            ConvertError::Hdf5Error(e) => write!(f, "HDF5 error: {}", e),
            ConvertError::ArrayError(e) => write!(f, "Array error: {}", e),
            ConvertError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::DirectoryCreate { source, .. } => Some(source),
            ConvertError::IoError(e) => Some(e),
            ConvertError::Hdf5Error(e) => Some(e),
            ConvertError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<hdf5::Error> for ConvertError {
    fn from(error: hdf5::Error) -> Self {
        ConvertError::Hdf5Error(error)
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(error: std::io::Error) -> Self {
        ConvertError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for ConvertError {
    fn from(error: ndarray::ShapeError) -> Self {
        ConvertError::ArrayError(error)
    }
}

impl From<String> for ConvertError {
    fn from(error: String) -> Self {
        ConvertError::Generic(error)
    }
}

impl From<&str> for ConvertError {
    fn from(error: &str) -> Self {
        ConvertError::Generic(error.to_string())
    }
}

/// Result type alias for h5convert operations
pub type Result<T> = std::result::Result<T, ConvertError>;
