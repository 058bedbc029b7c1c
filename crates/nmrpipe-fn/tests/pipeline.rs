use nmrpipe_core::{DataFrame, NmrArray, PipeError, QuadFlag, Samples, Stage};
use nmrpipe_fn::*;
use nmrpipe_io::{read_from_file, read_from_stream, write_output, write_to_file, Output};
use num_complex::Complex32;
use std::io::Cursor;

fn fid_2d(rows: usize, cols: usize) -> DataFrame {
    let values = (0..rows * cols)
        .map(|i| {
            let t = (i % cols) as f32;
            let row = (i / cols) as f32;
            Complex32::new((0.3 * t).cos() * (-0.05 * t).exp() + row, (0.3 * t).sin())
        })
        .collect();
    let mut frame = DataFrame::from_array(NmrArray::complex(vec![rows, cols], values).unwrap());
    frame.header.set_quad(2, QuadFlag::Complex).unwrap();
    frame.header.set("NDSW", 8000.0, 1).unwrap();
    frame.header.set("NDOBS", 600.0, 1).unwrap();
    frame
}

fn with_workers(workers: usize) -> Parallelism {
    Parallelism {
        enabled: true,
        workers,
        threads: 2,
    }
}

#[test]
fn chunked_pipeline_matches_serial() {
    let specs = vec![
        FnSpec::Sp(SpParams {
            off: 0.5,
            pow: 2.0,
            ..Default::default()
        }),
        FnSpec::Zf(ZfParams::default()),
        FnSpec::Ft(FtParams::default()),
        FnSpec::Ps(PsParams {
            p0: 45.0,
            p1: -10.0,
            ..Default::default()
        }),
        FnSpec::Tp(TpParams::default()),
    ];
    let mut serial = fid_2d(6, 8);
    run_all(
        &TransformRunner::new(Parallelism::serial()),
        &mut serial,
        &specs,
        None,
    )
    .unwrap();
    assert_eq!(serial.array.shape(), &[32, 3]);

    for workers in [1, 2, 5, 6] {
        let mut chunked = fid_2d(6, 8);
        run_all(
            &TransformRunner::new(with_workers(workers)),
            &mut chunked,
            &specs,
            None,
        )
        .unwrap();
        assert_eq!(chunked.array, serial.array, "workers = {workers}");
        assert_eq!(chunked.header, serial.header);
    }
}

#[test]
fn processed_stream_round_trips() {
    let mut frame = fid_2d(4, 8);
    let runner = TransformRunner::default();
    run_all(
        &runner,
        &mut frame,
        &[FnSpec::Zf(ZfParams::default()), FnSpec::Ft(FtParams::default())],
        None,
    )
    .unwrap();

    let mut bytes = Vec::new();
    write_output(&mut frame, Output::Stream(&mut bytes)).unwrap();
    let back = read_from_stream(Cursor::new(bytes)).unwrap();
    assert_eq!(back.array, frame.array);
    assert_eq!(back.header.get_float("FDSIZE", 0).unwrap(), 16.0);
    assert_eq!(back.header.get_float("NDFTFLAG", 1).unwrap(), 1.0);
    assert_eq!(back.header.pipe_count(), 1);
}

#[test]
fn failing_stage_is_reported() {
    let mut frame = DataFrame::from_array(NmrArray::real(vec![8], vec![0.0; 8]).unwrap());
    let err = run_all(
        &TransformRunner::default(),
        &mut frame,
        &[FnSpec::Tp(TpParams::default())],
        None,
    )
    .unwrap_err();
    match err {
        PipeError::Transform { name, stage, .. } => {
            assert_eq!(name, "TP");
            assert_eq!(stage, Stage::Created);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn di_after_transpose_gives_real_plane() {
    let mut frame = fid_2d(4, 8);
    run_all(
        &TransformRunner::default(),
        &mut frame,
        &[
            FnSpec::Ft(FtParams::default()),
            FnSpec::Tp(TpParams::default()),
            FnSpec::Ft(FtParams::default()),
            FnSpec::Di,
        ],
        None,
    )
    .unwrap();
    // hyper TP gives [16, 2]; DI keeps the real rows of the interleaved axis
    assert_eq!(frame.array.shape(), &[8, 2]);
    assert!(matches!(frame.array.samples(), Samples::Real(_)));
    assert_eq!(frame.header.get_float("FDQUADFLAG", 0).unwrap(), 1.0);
}

#[test]
fn deco_fits_bases_and_writes_coefficients() {
    let dir = tempfile::tempdir().unwrap();
    let b1: Vec<f32> = (0..8).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
    let b2: Vec<f32> = (0..8).map(|i| i as f32).collect();
    // written out of name order on purpose
    let path_b = dir.path().join("basis_b.ft1");
    let path_a = dir.path().join("basis_a.ft1");
    write_to_file(
        &DataFrame::from_array(NmrArray::real(vec![8], b2.clone()).unwrap()),
        &path_b,
        false,
    )
    .unwrap();
    write_to_file(
        &DataFrame::from_array(NmrArray::real(vec![8], b1.clone()).unwrap()),
        &path_a,
        false,
    )
    .unwrap();

    let target: Vec<f32> = b1.iter().zip(&b2).map(|(a, b)| 2.0 * a + 0.5 * b).collect();
    let mut frame = DataFrame::from_array(NmrArray::real(vec![8], target.clone()).unwrap());
    let coef_path = dir.path().join("out").join("coef.dat");
    let spec = FnSpec::Deco(DecoParams {
        bases: vec![path_b, path_a],
        file: coef_path.clone(),
    });
    run_all(&TransformRunner::default(), &mut frame, &[spec], None).unwrap();

    match frame.array.samples() {
        Samples::Real(v) => {
            for (a, b) in v.iter().zip(&target) {
                assert!((a - b).abs() < 1e-3);
            }
        }
        other => panic!("unexpected samples {other:?}"),
    }
    let coef = read_from_file(&coef_path).unwrap();
    match coef.array.samples() {
        Samples::Real(c) => {
            assert_eq!(c.len(), 2);
            assert!((c[0] - 2.0).abs() < 1e-3);
            assert!((c[1] - 0.5).abs() < 1e-3);
        }
        other => panic!("unexpected samples {other:?}"),
    }
}

#[test]
fn deco_missing_basis_fails_in_initialize() {
    let dir = tempfile::tempdir().unwrap();
    let mut frame = DataFrame::from_array(NmrArray::real(vec![4], vec![1.0; 4]).unwrap());
    let spec = FnSpec::Deco(DecoParams {
        bases: vec![dir.path().join("missing.ft1")],
        file: dir.path().join("coef.dat"),
    });
    let err = run_all(&TransformRunner::default(), &mut frame, &[spec], None).unwrap_err();
    assert!(matches!(
        err,
        PipeError::Transform {
            stage: Stage::Created,
            ..
        }
    ));
}

fn write_real(path: &std::path::Path, values: Vec<f32>) {
    let len = values.len();
    let frame = DataFrame::from_array(NmrArray::real(vec![len], values).unwrap());
    write_to_file(&frame, path, false).unwrap();
}

#[test]
fn deco_duplicate_bases_still_fit() {
    let dir = tempfile::tempdir().unwrap();
    let basis: Vec<f32> = vec![1.0, 2.0, 0.0, -1.0];
    write_real(&dir.path().join("basis_1.ft1"), basis.clone());
    write_real(&dir.path().join("basis_2.ft1"), basis.clone());

    // not in the span of the basis: the output is its projection
    let target = vec![1.0, 1.0, 3.0, 0.0];
    let mut frame = DataFrame::from_array(NmrArray::real(vec![4], target).unwrap());
    let coef_path = dir.path().join("coef.dat");
    let spec = FnSpec::Deco(DecoParams {
        bases: vec![dir.path().join("basis_1.ft1"), dir.path().join("basis_2.ft1")],
        file: coef_path.clone(),
    });
    run_all(&TransformRunner::default(), &mut frame, &[spec], None).unwrap();

    // <t, b> / <b, b> = 3 / 6
    let scale = 0.5;
    match frame.array.samples() {
        Samples::Real(v) => {
            for (out, b) in v.iter().zip(&basis) {
                assert!((out - scale * b).abs() < 1e-4);
            }
        }
        other => panic!("unexpected samples {other:?}"),
    }
    match read_from_file(&coef_path).unwrap().array.samples() {
        Samples::Real(c) => {
            assert_eq!(c.len(), 2);
            assert!((c[0] - 0.25).abs() < 1e-4);
            assert!((c[1] - 0.25).abs() < 1e-4);
        }
        other => panic!("unexpected samples {other:?}"),
    }
}

#[test]
fn deco_zero_bases_pass_data_through() {
    let dir = tempfile::tempdir().unwrap();
    write_real(&dir.path().join("zero.ft1"), vec![0.0; 4]);
    let input = NmrArray::real(vec![4], vec![1.0, -2.0, 3.0, 0.5]).unwrap();
    let mut frame = DataFrame::from_array(input.clone());
    let coef_path = dir.path().join("coef.dat");
    let spec = FnSpec::Deco(DecoParams {
        bases: vec![dir.path().join("zero.ft1")],
        file: coef_path.clone(),
    });
    run_all(&TransformRunner::default(), &mut frame, &[spec], None).unwrap();
    assert_eq!(frame.array, input);
    assert!(!coef_path.exists());
}

#[test]
fn deco_basis_length_mismatch_fails_in_initialize() {
    let dir = tempfile::tempdir().unwrap();
    write_real(&dir.path().join("short.ft1"), vec![1.0; 3]);
    let input = NmrArray::real(vec![4], vec![1.0; 4]).unwrap();
    let mut frame = DataFrame::from_array(input.clone());
    let spec = FnSpec::Deco(DecoParams {
        bases: vec![dir.path().join("short.ft1")],
        file: dir.path().join("coef.dat"),
    });
    let err = run_all(&TransformRunner::default(), &mut frame, &[spec], None).unwrap_err();
    match err {
        PipeError::Transform { stage, source, .. } => {
            assert_eq!(stage, Stage::Created);
            assert!(matches!(*source, PipeError::Shape(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(frame.array, input);
}
