//! Container inspection for the `list` subcommand
//!
//! Walks a container without writing anything and describes every dataset:
//! shape, element kind, whether the search term selects it and how it would
//! be exported.

use crate::container::{Container, ElementKind};
use crate::errors::Result;
use crate::walker::{FrameClassification, Walker};

/// One dataset as seen by a conversion run
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub kind: ElementKind,
    pub selected: bool,
    pub classification: FrameClassification,
}

/// Lists every dataset of `container`, marking the ones `search_term` selects
pub fn list_datasets<C: Container + ?Sized>(
    container: &C,
    search_term: &str,
) -> Result<Vec<DatasetEntry>> {
    // Every path contains the empty string, so this visits all datasets.
    Walker::new(container, "")
        .map(|item| {
            item.map(|found| DatasetEntry {
                selected: found.name.contains(search_term),
                classification: found.classification(),
                name: found.name,
                shape: found.shape,
                kind: found.kind,
            })
        })
        .collect()
}

fn describe_classification(classification: FrameClassification) -> String {
    match classification {
        FrameClassification::SingleFrame => "single frame".to_string(),
        FrameClassification::FrameStack { frames } => format!("stack of {} frames", frames),
        FrameClassification::NotImage => "not an image".to_string(),
    }
}

/// Prints the listing of one file
pub fn print_inventory(file_name: &str, entries: &[DatasetEntry]) {
    println!("\n Datasets in {}", file_name);
    println!("={}", "=".repeat(file_name.len() + 13));

    if entries.is_empty() {
        println!("   (No datasets found)");
        return;
    }

    for entry in entries {
        let shape: Vec<String> = entry.shape.iter().map(|s| s.to_string()).collect();
        let kind = format!("{:?}", entry.kind).to_lowercase();
        let marker = if entry.selected { "*" } else { " " };
        println!(
            "  {} {} ({}): ({}) -> {}",
            marker,
            entry.name,
            kind,
            shape.join(" × "),
            describe_classification(entry.classification)
        );
    }

    let selected = entries.iter().filter(|e| e.selected).count();
    println!(
        "\n💡 {} of {} datasets selected by the search term (marked *)",
        selected,
        entries.len()
    );
}
