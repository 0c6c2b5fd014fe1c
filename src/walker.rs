//! Depth-first dataset discovery
//!
//! [`Walker`] visits every node of a [`Container`] in pre-order and yields a
//! [`Match`] for each dataset whose path contains the search term. Groups are
//! descended into but never matched. The walk is lazy: a group is only listed
//! when the iterator reaches it, and a fresh `Walker` is needed for every pass.
//! An object with several hard links is visited under the first name reached.

use crate::container::{Container, ElementKind, Node, ObjectKey};
use crate::errors::Result;
use tracing::debug;

/// How a dataset's shape maps onto images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClassification {
    /// Rank 2, or rank 3 with a leading dimension of 1
    SingleFrame,
    /// Rank 3 or more with a leading dimension greater than 1
    FrameStack { frames: usize },
    /// Anything that cannot be exported as images
    NotImage,
}

/// Classifies a dataset shape. Depends on nothing but the shape.
pub fn classify(shape: &[usize]) -> FrameClassification {
    match shape {
        [_, _] => FrameClassification::SingleFrame,
        [1, _, _] => FrameClassification::SingleFrame,
        [frames, _, _, ..] if *frames > 1 => FrameClassification::FrameStack { frames: *frames },
        _ => FrameClassification::NotImage,
    }
}

/// A dataset whose path contains the search term
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub name: String,
    pub rank: usize,
    pub shape: Vec<usize>,
    pub kind: ElementKind,
}

impl Match {
    pub fn classification(&self) -> FrameClassification {
        classify(&self.shape)
    }
}

/// Lazy pre-order traversal yielding matching datasets.
///
/// A group that cannot be listed yields one `Err` item and the walk moves on
/// to its siblings.
pub struct Walker<'c, C: Container + ?Sized> {
    container: &'c C,
    search_term: String,
    pending: Vec<Node>,
    visited: Vec<ObjectKey>,
    started: bool,
}

impl<'c, C: Container + ?Sized> Walker<'c, C> {
    pub fn new(container: &'c C, search_term: impl Into<String>) -> Self {
        Self {
            container,
            search_term: search_term.into(),
            pending: Vec::new(),
            visited: Vec::new(),
            started: false,
        }
    }

    /// Records a multiply linked object; false if it was already reached
    fn first_visit(&mut self, node: &Node) -> bool {
        match node.shared() {
            Some(key) if self.visited.contains(key) => false,
            Some(key) => {
                self.visited.push(key.clone());
                true
            }
            None => true,
        }
    }

    fn descend(&mut self, group_path: &str) -> Result<()> {
        let children = self.container.children(group_path)?;
        // Reversed so the first child is popped first.
        self.pending.extend(children.into_iter().rev());
        Ok(())
    }
}

impl<C: Container + ?Sized> Iterator for Walker<'_, C> {
    type Item = Result<Match>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            if let Err(e) = self.descend("") {
                return Some(Err(e));
            }
        }

        while let Some(node) = self.pending.pop() {
            if !self.first_visit(&node) {
                debug!(path = node.path(), "already visited through another link");
                continue;
            }

            match node {
                Node::Group { path, .. } => {
                    debug!(group = %path, "visiting group");
                    if let Err(e) = self.descend(&path) {
                        return Some(Err(e));
                    }
                }
                Node::Dataset { path, shape, kind, .. } => {
                    if path.contains(self.search_term.as_str()) {
                        debug!(dataset = %path, ?shape, "matched dataset");
                        return Some(Ok(Match {
                            name: path,
                            rank: shape.len(),
                            shape,
                            kind,
                        }));
                    }
                }
            }
        }

        None
    }
}

/// Starts a walk over `container` for datasets whose path contains `search_term`
pub fn walk<'c, C: Container + ?Sized>(container: &'c C, search_term: &str) -> Walker<'c, C> {
    Walker::new(container, search_term)
}
