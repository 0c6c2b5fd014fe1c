//! h5convert: export HDF5 datasets as raster images
//!
//! Walks HDF5 files, selects the datasets whose path contains a search term,
//! and writes each one as a single image or as a directory of numbered frames
//! in TIFF, CBF, PNG, JPEG or BMP. Existing files are never overwritten.
//!
//! ## Module Organization
//!
//! - [`container`]: read-only container access and HDF5 backend
//! - [`walker`]: depth-first dataset discovery and frame classification
//! - [`formats`]: format registry and encoders
//! - [`export`]: output naming, collision checks and writing
//! - [`orchestrator`]: per-file jobs and batch execution
//! - [`status`]: status line sinks
//! - [`inventory`]: dataset listing
//! - [`parallel`]: worker pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use h5convert::prelude::*;
//!
//! let sink = MemorySink::new();
//! let orchestrator = Orchestrator::new(&sink);
//! let report = orchestrator
//!     .run_batch(&[ConversionJob::new("scan.h5", "data", "tiff", 3)])
//!     .unwrap();
//!
//! for line in sink.lines() {
//!     println!("{}", line);
//! }
//! assert!(report.is_success());
//! ```

pub mod cli;
pub mod container;
pub mod errors;
pub mod export;
pub mod formats;
pub mod inventory;
pub mod orchestrator;
pub mod parallel;
pub mod status;
pub mod walker;

pub use errors::{ConvertError, Result};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::container::{Container, Hdf5Container, PixelData};
    pub use crate::errors::{ConvertError, Result};
    pub use crate::export::{export, ExportReport, ExportSettings};
    pub use crate::formats::{FormatRegistry, OutputFormat};
    pub use crate::orchestrator::{BatchReport, ConversionJob, JobOutcome, Orchestrator};
    pub use crate::parallel::ParallelConfig;
    pub use crate::status::{ConsoleSink, MemorySink, StatusSink};
    pub use crate::walker::{classify, walk, FrameClassification, Match, Walker};
}
