use h5convert::{
    container::{Container, ElementKind, Hdf5Container, PixelData},
    errors::ConvertError,
    orchestrator::{ConversionJob, Orchestrator},
    parallel::ParallelConfig,
    status::{MemorySink, StatusSink},
    walker::{walk, FrameClassification},
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Writes an HDF5 file holding `/entry/data` with the given shape
fn create_scan(path: &Path, shape: &[usize]) {
    let file = hdf5::File::create(path).expect("Failed to create HDF5 file");
    let entry = file.create_group("entry").expect("Failed to create group");

    let count: usize = shape.iter().product();
    let values: Vec<u16> = (0..count).map(|i| (i % 60_000) as u16).collect();
    let dataset = entry
        .new_dataset::<u16>()
        .shape(shape.to_vec())
        .create("data")
        .expect("Failed to create dataset");
    dataset.write_raw(&values).expect("Failed to write data");
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_walk_real_container() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("scan.h5");
    {
        let file = hdf5::File::create(&path).unwrap();
        let entry = file.create_group("entry").unwrap();
        let instrument = entry.create_group("instrument").unwrap();
        instrument
            .new_dataset::<f32>()
            .shape(vec![4, 4])
            .create("flat_data")
            .unwrap()
            .write_raw(&[1.0f32; 16])
            .unwrap();
        entry
            .new_dataset::<i32>()
            .shape(vec![3, 2, 2])
            .create("data")
            .unwrap()
            .write_raw(&[0i32; 12])
            .unwrap();
        entry
            .new_dataset::<i32>()
            .shape(vec![3])
            .create("title")
            .unwrap()
            .write_raw(&[0i32; 3])
            .unwrap();
    }

    let container = Hdf5Container::open(&path).unwrap();
    let mut matches: Vec<_> = walk(&container, "data").map(|m| m.unwrap()).collect();
    matches.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].name, "entry/data");
    assert_eq!(matches[0].kind, ElementKind::Integer);
    assert_eq!(
        matches[0].classification(),
        FrameClassification::FrameStack { frames: 3 }
    );
    assert_eq!(matches[1].name, "entry/instrument/flat_data");
    assert_eq!(matches[1].kind, ElementKind::Float);
    assert_eq!(matches[1].classification(), FrameClassification::SingleFrame);

    let values = container.read("entry/instrument/flat_data").unwrap();
    assert_eq!(values.shape(), &[4, 4]);
}

#[test]
fn test_frame_stack_scenario() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("scan.h5");
    create_scan(&input, &[5, 100, 100]);

    let sink = MemorySink::new();
    let orchestrator = Orchestrator::new(&sink);
    let outcome = orchestrator.run_job(&ConversionJob::new(&input, "data", "tiff", 3));

    assert!(outcome.is_success(), "errors: {:?}", outcome.errors);
    assert_eq!(outcome.matches, 1);
    assert_eq!(outcome.files_written, 5);
    assert_eq!(
        files_in(&temp_dir.path().join("scan_tiff")),
        vec![
            "scan_001.tiff",
            "scan_002.tiff",
            "scan_003.tiff",
            "scan_004.tiff",
            "scan_005.tiff"
        ]
    );
    assert!(sink.lines().is_empty());

    let frame = fs::File::open(temp_dir.path().join("scan_tiff/scan_002.tiff")).unwrap();
    let mut decoder = tiff::decoder::Decoder::new(frame).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (100, 100));
}

#[test]
fn test_single_frame_scenario() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("scan.h5");
    create_scan(&input, &[100, 100]);

    let sink = MemorySink::new();
    let outcome = Orchestrator::new(&sink).run_job(&ConversionJob::new(&input, "data", "tiff", 3));

    assert!(outcome.is_success());
    assert_eq!(outcome.files_written, 1);
    assert_eq!(files_in(temp_dir.path()), vec!["scan.h5", "scan.tiff"]);
}

#[test]
fn test_leading_singleton_is_single_frame() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("scan.h5");
    create_scan(&input, &[1, 20, 30]);

    let sink = MemorySink::new();
    let outcome = Orchestrator::new(&sink).run_job(&ConversionJob::new(&input, "data", "cbf", 3));

    assert!(outcome.is_success());
    assert!(temp_dir.path().join("scan.cbf").is_file());
    assert!(!temp_dir.path().join("scan_cbf").exists());
}

#[test]
fn test_no_match_writes_nothing() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("scan.h5");
    create_scan(&input, &[5, 10, 10]);

    let sink = MemorySink::new();
    let orchestrator = Orchestrator::new(&sink).with_parallel(ParallelConfig::with_threads(1));
    let report = orchestrator
        .run_batch(&[ConversionJob::new(&input, "foo", "tiff", 3)])
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.outcomes[0].matches, 0);
    assert_eq!(files_in(temp_dir.path()), vec!["scan.h5"]);

    let lines = sink.lines();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Input files:"));
    assert_eq!(lines[3], "Search term: foo");
    assert!(lines[4].starts_with("Conversion finished in"));
}

#[test]
fn test_unsupported_format_fails_before_any_write() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("scan.h5");
    create_scan(&input, &[5, 10, 10]);

    let sink = MemorySink::new();
    let outcome = Orchestrator::new(&sink).run_job(&ConversionJob::new(&input, "data", "webp", 3));

    assert!(matches!(
        outcome.errors.as_slice(),
        [ConvertError::UnsupportedFormat { .. }]
    ));
    assert_eq!(outcome.matches, 0);
    assert_eq!(files_in(temp_dir.path()), vec!["scan.h5"]);

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Unsupported format: webp"));
}

#[test]
fn test_second_run_refuses_to_overwrite() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let stack = temp_dir.path().join("stack.h5");
    let single = temp_dir.path().join("single.h5");
    create_scan(&stack, &[3, 8, 8]);
    create_scan(&single, &[8, 8]);
    let jobs = vec![
        ConversionJob::new(&stack, "data", "cbf", 2),
        ConversionJob::new(&single, "data", "cbf", 2),
    ];

    let sink = MemorySink::new();
    let orchestrator = Orchestrator::new(&sink);
    let first = orchestrator.run_batch(&jobs).unwrap();
    assert!(first.is_success());
    assert_eq!(first.files_written(), 4);

    let before = fs::read(temp_dir.path().join("single.cbf")).unwrap();
    let second = orchestrator.run_batch(&jobs).unwrap();
    assert!(!second.is_success());
    assert_eq!(second.files_written(), 0);
    for outcome in &second.outcomes {
        assert!(matches!(
            outcome.errors.as_slice(),
            [ConvertError::OutputExists { .. }]
        ));
    }
    assert_eq!(fs::read(temp_dir.path().join("single.cbf")).unwrap(), before);
    assert_eq!(files_in(&temp_dir.path().join("stack_cbf")).len(), 3);

    // The sink was cleared at the start of the second run
    let lines = sink.lines();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("Input files:"));
}

#[test]
fn test_batch_with_one_unopenable_file() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let first = temp_dir.path().join("first.h5");
    let second = temp_dir.path().join("second.h5");
    let broken = temp_dir.path().join("broken.h5");
    create_scan(&first, &[2, 6, 6]);
    create_scan(&second, &[6, 6]);
    fs::write(&broken, b"this is not an HDF5 file").unwrap();

    let jobs: Vec<ConversionJob> = [&first, &broken, &second]
        .iter()
        .map(|p| ConversionJob::new(*p, "data", "tiff", 1))
        .collect();

    let sink = MemorySink::new();
    let report = Orchestrator::new(&sink)
        .with_parallel(ParallelConfig::with_threads(3))
        .run_batch(&jobs)
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.error_count(), 1);
    assert!(matches!(
        report.outcomes[1].errors.as_slice(),
        [ConvertError::ContainerOpen { .. }]
    ));
    assert!(report.outcomes[0].is_success());
    assert!(report.outcomes[2].is_success());
    assert!(temp_dir.path().join("first_tiff/first_1.tiff").is_file());
    assert!(temp_dir.path().join("first_tiff/first_2.tiff").is_file());
    assert!(temp_dir.path().join("second.tiff").is_file());

    let lines = sink.lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[1], "Output format: tiff");
    assert!(lines[4].contains("broken.h5"));
    assert!(lines[5].starts_with("Conversion finished in"));
}

#[test]
fn test_missing_input_file() {
    let sink = MemorySink::new();
    let missing = PathBuf::from("/no/such/dir/scan.h5");
    let outcome = Orchestrator::new(&sink).run_job(&ConversionJob::with_defaults(&missing));

    assert!(matches!(
        outcome.errors.as_slice(),
        [ConvertError::ContainerOpen { .. }]
    ));
    assert!(sink.lines()[0].contains("does not exist"));
    sink.clear();
    assert!(sink.lines().is_empty());
}

#[test]
fn test_hard_linked_dataset_converted_once() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("scan.h5");
    create_scan(&input, &[2, 6, 6]);
    {
        let file = hdf5::File::open_rw(&input).expect("Failed to reopen HDF5 file");
        file.link_hard("entry/data", "data_alias")
            .expect("Failed to create hard link");
    }

    {
        let container = Hdf5Container::open(&input).unwrap();
        let matches: Vec<_> = walk(&container, "data").map(|m| m.unwrap()).collect();
        assert_eq!(matches.len(), 1);
    }

    let sink = MemorySink::new();
    let outcome = Orchestrator::new(&sink).run_job(&ConversionJob::new(&input, "data", "tiff", 3));

    assert!(outcome.is_success(), "errors: {:?}", outcome.errors);
    assert_eq!(outcome.matches, 1);
    assert_eq!(outcome.files_written, 2);
    assert_eq!(
        files_in(&temp_dir.path().join("scan_tiff")),
        vec!["scan_001.tiff", "scan_002.tiff"]
    );
    assert!(sink.lines().is_empty());
}

#[test]
fn test_unsigned_32_bit_values_survive_tiff_export() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("mask.h5");
    let stored = [0u32, 3_000_000_000, u32::MAX];
    {
        let file = hdf5::File::create(&input).expect("Failed to create HDF5 file");
        file.new_dataset::<u32>()
            .shape(vec![1, 3])
            .create("pixel_mask")
            .unwrap()
            .write_raw(&stored)
            .unwrap();
    }

    {
        let container = Hdf5Container::open(&input).unwrap();
        match container.read("pixel_mask").unwrap() {
            PixelData::Unsigned(values) => {
                assert_eq!(values.iter().copied().collect::<Vec<_>>(), stored.to_vec());
            }
            other => panic!("Expected unsigned pixel data, got {:?}", other),
        }
    }

    let sink = MemorySink::new();
    let outcome = Orchestrator::new(&sink).run_job(&ConversionJob::new(&input, "mask", "tiff", 3));
    assert!(outcome.is_success(), "errors: {:?}", outcome.errors);

    let image = fs::File::open(temp_dir.path().join("mask.tiff")).unwrap();
    match tiff::decoder::Decoder::new(image).unwrap().read_image().unwrap() {
        tiff::decoder::DecodingResult::U32(samples) => assert_eq!(samples, stored.to_vec()),
        _ => panic!("Expected 32-bit unsigned samples"),
    }
}

#[test]
fn test_double_dataset_keeps_precision() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("flux.h5");
    let stored = [0.1f64, 1.0e-300, -2.5e12, 7.0];
    {
        let file = hdf5::File::create(&input).expect("Failed to create HDF5 file");
        file.new_dataset::<f64>()
            .shape(vec![2, 2])
            .create("data")
            .unwrap()
            .write_raw(&stored)
            .unwrap();
    }

    let container = Hdf5Container::open(&input).unwrap();
    match container.read("data").unwrap() {
        PixelData::Double(values) => {
            assert_eq!(values.shape(), &[2, 2]);
            assert_eq!(values.iter().copied().collect::<Vec<_>>(), stored.to_vec());
        }
        other => panic!("Expected double pixel data, got {:?}", other),
    }
}
