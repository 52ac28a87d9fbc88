// tests/test_pipeline.rs — JSON-described operator chains.

use rasterkit::convolution::convolve;
use rasterkit::{
    despeckle, detect_edges, equalize_histogram, grayscale, warp, EdgeConfig, Kernel, Operation,
    OverflowPolicy, Pipeline, RasterBuffer, RasterError, Rgb, WarpConfig,
};

fn make_scene(w: u32, h: u32) -> RasterBuffer {
    RasterBuffer::from_fn(w, h, |x, y| {
        let base = (x * 150 / w + y * 60 / h) as u8;
        if (w / 4..w / 2).contains(&x) && (h / 3..2 * h / 3).contains(&y) {
            Rgb::new(base + 90, 40, base)
        } else {
            Rgb::new(base, base / 2, 200 - base / 2)
        }
    })
}

#[test]
fn json_pipeline_equals_manual_chain() {
    let json = r#"{
        "steps": [
            { "op": "despeckle" },
            { "op": "equalize" },
            { "op": "grayscale" },
            { "op": "edges", "threshold": 100 }
        ]
    }"#;
    let src = make_scene(64, 48);
    let got = Pipeline::from_json(json).unwrap().run(&src).unwrap();

    let manual = detect_edges(
        &grayscale(&equalize_histogram(&despeckle(&src)).unwrap()),
        &EdgeConfig { threshold: 100 },
    );
    assert_eq!(got, manual);
}

#[test]
fn smooth_and_sharpen_steps_use_preset_kernels() {
    let src = make_scene(20, 20);
    let p = Pipeline::new()
        .then(Operation::Smooth { policy: OverflowPolicy::Clamp })
        .then(Operation::Sharpen { policy: OverflowPolicy::Skip });
    let manual = convolve(
        &convolve(&src, &Kernel::smooth(), OverflowPolicy::Clamp),
        &Kernel::sharpen(),
        OverflowPolicy::Skip,
    );
    assert_eq!(p.run(&src).unwrap(), manual);
}

#[test]
fn warp_step_honors_policy() {
    let src = make_scene(50, 10);
    let clamp = Pipeline::from_json(r#"{ "steps": [{ "op": "warp" }] }"#).unwrap();
    assert_eq!(clamp.run(&src).unwrap(), warp(&src, &WarpConfig::default()).unwrap());

    let fail = Pipeline::from_json(r#"{ "steps": [{ "op": "warp", "policy": "fail" }] }"#).unwrap();
    assert!(matches!(fail.run(&src), Err(RasterError::OutOfBounds { .. })));
}

#[test]
fn input_is_not_modified() {
    let src = make_scene(16, 16);
    let before = src.clone();
    Pipeline::new()
        .then(Operation::Grayscale)
        .then(Operation::Equalize)
        .run(&src)
        .unwrap();
    assert_eq!(src, before);
}

#[test]
fn unknown_field_types_are_config_errors() {
    let err = Pipeline::from_json(r#"{ "steps": [{ "op": "edges", "threshold": "high" }] }"#).unwrap_err();
    assert!(matches!(err, RasterError::Config(_)));
}

#[test]
fn full_range_kernel_weights_saturate() {
    let json = r#"{ "steps": [{ "op": "convolve",
        "kernel": { "weights": [[2147483647, 0, 0], [0, 0, 0], [0, 0, 0]], "divisor": 1 } }] }"#;
    let src = RasterBuffer::filled(3, 3, Rgb::gray(2));
    let out = Pipeline::from_json(json).unwrap().run(&src).unwrap();
    assert_eq!(out[(1, 1)], Rgb::WHITE);
    assert_eq!(out[(0, 0)], Rgb::gray(2));
}

#[test]
fn steep_warp_segment_clamps_to_last_column() {
    let json = r#"{ "steps": [{ "op": "warp", "segments": [
        { "origin": 0, "base": 0, "num": 9223372036854775807, "den": 1 },
        { "origin": 0, "base": 0, "num": 1, "den": 1 },
        { "origin": 0, "base": 0, "num": 1, "den": 1 }
    ] }] }"#;
    let src = RasterBuffer::from_fn(4, 1, |x, _| Rgb::gray(x as u8 * 10));
    let out = Pipeline::from_json(json).unwrap().run(&src).unwrap();
    assert_eq!(out[(0, 0)], Rgb::gray(0));
    assert_eq!(out[(1, 0)], Rgb::gray(30));
    assert_eq!(out[(3, 0)], Rgb::gray(30));
}
