//! Read-only access to hierarchical containers
//!
//! The walker and the exporter never talk to HDF5 directly. They go through
//! the [`Container`] trait, which exposes a tree of groups and datasets and
//! materializes a dataset's values as [`PixelData`]. [`Hdf5Container`] is the
//! production implementation.

use crate::errors::{ConvertError, Result};
use hdf5::types::{FloatSize, IntSize, TypeDescriptor};
use ndarray::{ArrayD, ArrayView2, Axis, Ix2, IxDyn};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions offered for input selection. Not a validity check.
pub const INPUT_EXTENSIONS: [&str; 4] = ["h5", "hdf5", "mh5", "ph5"];

/// Returns true if the path carries one of the usual HDF5 extensions
pub fn has_container_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            INPUT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Element type family of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Integer,
    Float,
    Other,
}

/// Identity of an object reachable through more than one hard link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKey {
    Hdf5 {
        fileno: u64,
        token: hdf5::LocationToken,
    },
    /// For containers without native object tokens
    Named(String),
}

/// A node in the container tree. Paths are relative to the root, without a leading slash.
///
/// `shared` is set when the object has several hard links, so a walk can
/// visit it once.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group {
        path: String,
        shared: Option<ObjectKey>,
    },
    Dataset {
        path: String,
        shape: Vec<usize>,
        kind: ElementKind,
        shared: Option<ObjectKey>,
    },
}

impl Node {
    pub fn path(&self) -> &str {
        match self {
            Node::Group { path, .. } | Node::Dataset { path, .. } => path,
        }
    }

    pub fn shared(&self) -> Option<&ObjectKey> {
        match self {
            Node::Group { shared, .. } | Node::Dataset { shared, .. } => shared.as_ref(),
        }
    }
}

/// Joins a child link name onto a group path
pub fn join_path(group_path: &str, name: &str) -> String {
    if group_path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", group_path, name)
    }
}

/// Tree access needed by the walker and the exporter
pub trait Container {
    /// Direct children of a group, in the container's native iteration order.
    /// The root group is addressed by the empty path.
    fn children(&self, group_path: &str) -> Result<Vec<Node>>;

    /// Reads all values of a dataset into memory.
    fn read(&self, dataset_path: &str) -> Result<PixelData>;
}

/// Materialized dataset values.
///
/// Signed integers up to 32 bits and unsigned up to 16 bits are held as
/// `i32`, 32-bit unsigned as `u32`. Doubles and 64-bit integers are held as
/// `f64`, which is exact for integers up to 2^53.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    Integer(ArrayD<i32>),
    Unsigned(ArrayD<u32>),
    Float(ArrayD<f32>),
    Double(ArrayD<f64>),
}

/// One 2D slice of a dataset, ready for encoding
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    Integer(ArrayView2<'a, i32>),
    Unsigned(ArrayView2<'a, u32>),
    Float(ArrayView2<'a, f32>),
    Double(ArrayView2<'a, f64>),
}

fn plane<T>(values: &ArrayD<T>, index: Option<usize>) -> Result<ArrayView2<'_, T>> {
    let view = match index {
        Some(i) => values.index_axis(Axis(0), i),
        None => values.view(),
    };
    Ok(view.into_dimensionality::<Ix2>()?)
}

impl PixelData {
    pub fn shape(&self) -> &[usize] {
        match self {
            PixelData::Integer(a) => a.shape(),
            PixelData::Unsigned(a) => a.shape(),
            PixelData::Float(a) => a.shape(),
            PixelData::Double(a) => a.shape(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            PixelData::Integer(_) | PixelData::Unsigned(_) => ElementKind::Integer,
            PixelData::Float(_) | PixelData::Double(_) => ElementKind::Float,
        }
    }

    /// The single image of a `(H, W)` or `(1, H, W)` dataset
    pub fn single_frame(&self) -> Result<Frame<'_>> {
        match self.shape() {
            [_, _] => self.view_2d(None),
            [1, _, _] => self.view_2d(Some(0)),
            other => Err(ConvertError::Generic(format!(
                "shape {:?} does not hold a single frame",
                other
            ))),
        }
    }

    /// Frame `index` (0-based) along the leading axis of a stack
    pub fn frame(&self, index: usize) -> Result<Frame<'_>> {
        let shape = self.shape();
        if shape.len() < 3 || index >= shape[0] {
            return Err(ConvertError::Generic(format!(
                "frame {} out of range for shape {:?}",
                index, shape
            )));
        }
        self.view_2d(Some(index))
    }

    fn view_2d(&self, index: Option<usize>) -> Result<Frame<'_>> {
        Ok(match self {
            PixelData::Integer(a) => Frame::Integer(plane(a, index)?),
            PixelData::Unsigned(a) => Frame::Unsigned(plane(a, index)?),
            PixelData::Float(a) => Frame::Float(plane(a, index)?),
            PixelData::Double(a) => Frame::Double(plane(a, index)?),
        })
    }
}

impl Frame<'_> {
    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Frame::Integer(v) => v.dim(),
            Frame::Unsigned(v) => v.dim(),
            Frame::Float(v) => v.dim(),
            Frame::Double(v) => v.dim(),
        }
    }

    /// Values in row-major order, widened to f64
    pub fn values_f64(&self) -> Vec<f64> {
        match self {
            Frame::Integer(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Frame::Unsigned(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Frame::Float(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Frame::Double(v) => v.iter().copied().collect(),
        }
    }

    /// Values in row-major order as i32; floats are rounded, and everything
    /// saturates at the i32 range
    #[allow(clippy::cast_possible_truncation)]
    pub fn values_i32(&self) -> Vec<i32> {
        match self {
            Frame::Integer(v) => v.iter().copied().collect(),
            Frame::Unsigned(v) => v.iter().map(|&x| i32::try_from(x).unwrap_or(i32::MAX)).collect(),
            Frame::Float(v) => v.iter().map(|&x| x.round() as i32).collect(),
            Frame::Double(v) => v.iter().map(|&x| x.round() as i32).collect(),
        }
    }
}

/// An open, read-only HDF5 file
pub struct Hdf5Container {
    path: PathBuf,
    file: hdf5::File,
}

impl Hdf5Container {
    /// Opens `path` read-only. Fails with `ContainerOpen` if the path is not a
    /// regular file or is not a valid HDF5 container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConvertError::ContainerOpen {
                path: path.to_path_buf(),
                reason: "file does not exist or cannot be accessed".to_string(),
            });
        }

        let file = hdf5::File::open(path).map_err(|e| ConvertError::ContainerOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "opened container");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Hdf5Container {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "closing container");
    }
}

fn element_kind(dataset: &hdf5::Dataset) -> ElementKind {
    match dataset.dtype().and_then(|dtype| dtype.to_descriptor()) {
        Ok(TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Boolean) => {
            ElementKind::Integer
        }
        Ok(TypeDescriptor::Float(_)) => ElementKind::Float,
        _ => ElementKind::Other,
    }
}

fn shaped<T>(shape: &[usize], values: Vec<T>) -> Result<ArrayD<T>> {
    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?)
}

impl Container for Hdf5Container {
    fn children(&self, group_path: &str) -> Result<Vec<Node>> {
        let group = self
            .file
            .group(if group_path.is_empty() { "/" } else { group_path })?;

        // Soft and external links are not followed. Objects with several hard
        // links are tagged so the walker reaches them once.
        let names = group.iter_visit_default(Vec::new(), |_, name, info, names: &mut Vec<String>| {
            if matches!(info.link_type, hdf5::LinkType::Hard) {
                names.push(name.to_string());
            }
            true
        })?;

        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            let path = join_path(group_path, &name);
            let shared = match group.loc_info_by_name(&name) {
                Ok(info) if info.num_links > 1 => Some(ObjectKey::Hdf5 {
                    fileno: info.fileno,
                    token: info.token,
                }),
                Ok(_) => None,
                Err(e) => {
                    debug!(path = %path, error = %e, "no object info");
                    None
                }
            };

            if group.group(&name).is_ok() {
                nodes.push(Node::Group { path, shared });
            } else if let Ok(dataset) = group.dataset(&name) {
                nodes.push(Node::Dataset {
                    path,
                    shape: dataset.shape(),
                    kind: element_kind(&dataset),
                    shared,
                });
            } else {
                debug!(path = %path, "skipping link that is neither group nor dataset");
            }
        }

        Ok(nodes)
    }

    fn read(&self, dataset_path: &str) -> Result<PixelData> {
        let read_error = |reason: String| ConvertError::DatasetRead {
            dataset: dataset_path.to_string(),
            reason,
        };

        let dataset = self
            .file
            .dataset(dataset_path)
            .map_err(|e| read_error(e.to_string()))?;
        let shape = dataset.shape();
        let descriptor = dataset
            .dtype()
            .and_then(|dtype| dtype.to_descriptor())
            .map_err(|e| read_error(e.to_string()))?;

        // Each family is read at a width that holds every stored value
        let data = match descriptor {
            TypeDescriptor::Integer(IntSize::U8)
            | TypeDescriptor::Unsigned(IntSize::U8)
            | TypeDescriptor::Float(FloatSize::U8) => {
                let values = dataset.read_raw::<f64>().map_err(|e| read_error(e.to_string()))?;
                PixelData::Double(shaped(&shape, values)?)
            }
            TypeDescriptor::Unsigned(IntSize::U4) => {
                let values = dataset.read_raw::<u32>().map_err(|e| read_error(e.to_string()))?;
                PixelData::Unsigned(shaped(&shape, values)?)
            }
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Boolean => {
                let values = dataset.read_raw::<i32>().map_err(|e| read_error(e.to_string()))?;
                PixelData::Integer(shaped(&shape, values)?)
            }
            TypeDescriptor::Float(_) => {
                let values = dataset.read_raw::<f32>().map_err(|e| read_error(e.to_string()))?;
                PixelData::Float(shaped(&shape, values)?)
            }
            other => {
                return Err(read_error(format!("unsupported element type {}", other)));
            }
        };

        debug!(dataset = dataset_path, ?shape, "read dataset");
        Ok(data)
    }
}
