//! End-to-end tests for the `trunk-opt` binary and pipeline.

mod common;

use std::io::Write;

use common::run_trunk_opt;
use insta::assert_snapshot;
use tempfile::NamedTempFile;
use trunk_opt::{PipelineError, PipelineOptions, lower_file};

const PAIR_SWAP: &str = r#"core.module @swap {
  func.func @swap {type = core.func(core.tuple(core.f64, core.i32), core.tuple(core.i32, core.f64))} {
    ^bb0(%p: core.tuple(core.i32, core.f64)):
      %a = adt.tuple_get %p {index = 0} : core.i32
      %b = adt.tuple_get %p {index = 1} : core.f64
      %q = adt.tuple_new %b, %a : core.tuple(core.f64, core.i32)
      func.return %q
  }
}
"#;

#[test]
fn lower_file_reads_from_disk() {
    let mut input = NamedTempFile::with_suffix(".ir").expect("Failed to create temp file");
    input
        .write_all(PAIR_SWAP.as_bytes())
        .expect("Failed to write IR");

    let output = lower_file(input.path(), PipelineOptions { verify: true }).expect("lowers");
    assert_eq!(output.stats.rewrites, 3);
    assert_eq!(output.stats.retyped, 2);
    assert_snapshot!(output.text, @r"
    core.module @swap {
      func.func @swap {type = core.func(adt.struct() {fields = [[@elemet_0, core.f64], [@elemet_1, core.i32]], name = @_tupletoStruct}, adt.struct() {fields = [[@elemet_0, core.i32], [@elemet_1, core.f64]], name = @_tupletoStruct})} {
        ^bb0(%0: adt.struct() {fields = [[@elemet_0, core.i32], [@elemet_1, core.f64]], name = @_tupletoStruct}):
          %1 = adt.struct_extract %0 {field = @elemet_0} : core.i32
          %2 = adt.struct_extract %0 {field = @elemet_1} : core.f64
          %3 = adt.struct_new %2, %1 : adt.struct() {fields = [[@elemet_0, core.f64], [@elemet_1, core.i32]], name = @_tupletoStruct}
          func.return %3
      }
    }
    ");
}

#[test]
fn binary_prints_lowered_module() {
    let output = run_trunk_opt(PAIR_SWAP, &["--verify", "--stats"]);
    assert!(
        output.status.success(),
        "trunk-opt failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("adt.struct_new %2, %1"), "{stdout}");
    assert!(!stdout.contains("core.tuple"), "{stdout}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("rewrites: 3, retyped: 2"), "{stderr}");
}

#[test]
fn binary_reports_out_of_bounds_extraction() {
    let source = r#"core.module @bad {
  func.func @f {type = core.func(core.i32, core.tuple(core.i32))} {
    ^bb0(%p: core.tuple(core.i32)):
      %x = adt.tuple_get %p {index = 3} : core.i32
      func.return %x
  }
}
"#;
    let output = run_trunk_opt(source, &[]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("tuple-to-struct"), "{stderr}");
    assert!(stderr.contains("adt.tuple_get"), "{stderr}");
    assert!(stderr.contains("index out of bounds"), "{stderr}");
}

#[test]
fn binary_rejects_malformed_input() {
    let output = run_trunk_opt("core.module @m {\n  %x = \n}", &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse error at offset"), "{stderr}");
}

#[test]
fn missing_input_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let err = lower_file(&dir.path().join("absent.ir"), PipelineOptions::default())
        .expect_err("file does not exist");
    assert!(matches!(err, PipelineError::Io(_)));
}
