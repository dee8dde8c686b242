//! Serial archive round-trips against the bundled adapters.

use wta_core::{Geometry, Reader, TextureBlock, Writer, VOXELS};
use wta_codecs::{adapter_for_encoder, DeflateAdapter, RawAdapter};

// ── helpers ────────────────────────────────────────────────────────────────

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("wta_test_{}_{}.wta", name, std::process::id()))
}

/// Deterministic smooth field: the same (ix, iy, iz) always produces the
/// same cube.
fn gradient_block(ix: usize, iy: usize, iz: usize) -> TextureBlock {
    let mut block = TextureBlock::new();
    for axis in 0..3 {
        let g = [ix, iy, iz][axis] as i32 * VOXELS as i32;
        block
            .geometry
            .set_axis(axis, g, g + VOXELS as i32, 1, 0.125);
    }
    for k in 0..VOXELS {
        for j in 0..VOXELS {
            for i in 0..VOXELS {
                let v = (ix * 31 + iy * 17 + iz * 7) as f32 * 0.01
                    + i as f32 * 0.002
                    + j as f32 * 0.003
                    + k as f32 * 0.005;
                block.cube.set(i, j, k, v);
            }
        }
    }
    block
}

fn constant_block(value: f32) -> TextureBlock {
    let mut block = TextureBlock::new();
    block.cube.fill(value);
    block
}

// ── tests ──────────────────────────────────────────────────────────────────

#[test]
fn roundtrip_zlib_exact_at_threshold_zero() {
    let path = temp_path("zlib_exact");
    let mut w = Writer::create(&path, 2, 2, 2, 0.0, false, Box::new(DeflateAdapter::default()))
        .unwrap();
    for iz in 0..2 {
        for iy in 0..2 {
            for ix in 0..2 {
                w.write(ix, iy, iz, &gradient_block(ix, iy, iz)).unwrap();
            }
        }
    }
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(DeflateAdapter::default())).unwrap();
    let mut block = TextureBlock::new();
    for iz in 0..2 {
        for iy in 0..2 {
            for ix in 0..2 {
                r.read(ix, iy, iz, &mut block).unwrap();
                let expected = gradient_block(ix, iy, iz);
                assert_eq!(
                    block.cube.as_slice(),
                    expected.cube.as_slice(),
                    "threshold 0 round-trip must be exact at ({ix}, {iy}, {iz})"
                );
                assert_eq!(block.geometry, expected.geometry);
            }
        }
    }
}

#[test]
fn roundtrip_raw_exact() {
    let path = temp_path("raw_exact");
    let mut w = Writer::create(&path, 1, 1, 1, 0.0, false, Box::new(RawAdapter::default())).unwrap();
    w.write(0, 0, 0, &gradient_block(0, 0, 0)).unwrap();
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(RawAdapter::default())).unwrap();
    let mut block = TextureBlock::new();
    r.read(0, 0, 0, &mut block).unwrap();
    assert_eq!(block.cube.as_slice(), gradient_block(0, 0, 0).cube.as_slice());
}

#[test]
fn roundtrip_error_bounded_by_threshold() {
    let threshold = 0.05f32;
    let path = temp_path("thresholded");
    let mut w = Writer::create(
        &path,
        1,
        1,
        1,
        threshold,
        false,
        Box::new(DeflateAdapter::default()),
    )
    .unwrap();
    let original = gradient_block(0, 0, 0);
    w.write(0, 0, 0, &original).unwrap();
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(DeflateAdapter::default())).unwrap();
    let mut block = TextureBlock::new();
    r.read(0, 0, 0, &mut block).unwrap();
    for (got, want) in block.cube.as_slice().iter().zip(original.cube.as_slice()) {
        assert!(
            (got - want).abs() <= threshold,
            "sample error {} exceeds threshold {threshold}",
            (got - want).abs()
        );
    }
}

#[test]
fn roundtrip_halffloat_error_small() {
    let path = temp_path("halffloat");
    let mut w =
        Writer::create(&path, 1, 1, 1, 0.0, true, Box::new(DeflateAdapter::default())).unwrap();
    let original = gradient_block(0, 0, 0);
    w.write(0, 0, 0, &original).unwrap();
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(DeflateAdapter::default())).unwrap();
    let mut block = TextureBlock::new();
    r.read(0, 0, 0, &mut block).unwrap();
    for (got, want) in block.cube.as_slice().iter().zip(original.cube.as_slice()) {
        // f16 has ~3 decimal digits; all samples here are < 4.0
        assert!(
            (got - want).abs() <= 2e-3,
            "half-float error {} too large",
            (got - want).abs()
        );
    }
}

/// The concrete acceptance scenario: 2×2×1 grid, threshold 0, full floats.
/// Four constant blocks written in a fixed order must read back with exact
/// voxel averages, and their LUT offsets must increase in write order.
#[test]
fn four_slot_grid_scenario() {
    let path = temp_path("scenario_2x2x1");
    let mut w =
        Writer::create(&path, 2, 2, 1, 0.0, false, Box::new(DeflateAdapter::default())).unwrap();

    let order = [(0, 0), (1, 0), (0, 1), (1, 1)];
    for (n, (ix, iy)) in order.iter().enumerate() {
        w.write(*ix, *iy, 0, &constant_block((n + 1) as f32)).unwrap();
    }
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(DeflateAdapter::default())).unwrap();
    assert_eq!((r.xtextures(), r.ytextures(), r.ztextures()), (2, 2, 1));

    let mut block = TextureBlock::new();
    let mut offsets = Vec::new();
    for (n, (ix, iy)) in order.iter().enumerate() {
        r.read(*ix, *iy, 0, &mut block).unwrap();
        assert_eq!(
            block.cube.mean(),
            (n + 1) as f32,
            "block {n} must average its written constant exactly"
        );
        offsets.push(r.entry(*ix, *iy, 0).offset);
    }
    assert!(
        offsets.windows(2).all(|w| w[0] < w[1]),
        "LUT offsets must strictly increase in write order: {offsets:?}"
    );
}

#[test]
fn unwritten_slot_is_an_error() {
    let path = temp_path("unwritten");
    let mut w =
        Writer::create(&path, 2, 1, 1, 0.0, false, Box::new(DeflateAdapter::default())).unwrap();
    w.write(0, 0, 0, &constant_block(1.0)).unwrap();
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(DeflateAdapter::default())).unwrap();
    let mut block = TextureBlock::new();
    let err = r.read(1, 0, 0, &mut block).unwrap_err();
    assert!(
        err.to_string().contains("never written"),
        "unexpected error: {err}"
    );
}

/// Rewriting a slot repoints the LUT entry; the first payload stays in the
/// file as orphaned bytes.
#[test]
fn slot_overwrite_orphans_first_payload() {
    let path = temp_path("overwrite");
    let mut w =
        Writer::create(&path, 1, 1, 1, 0.0, false, Box::new(RawAdapter::default())).unwrap();
    w.write(0, 0, 0, &constant_block(1.0)).unwrap();
    w.write(0, 0, 0, &constant_block(2.0)).unwrap();
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(RawAdapter::default())).unwrap();
    let entry = *r.entry(0, 0, 0);

    let mut block = TextureBlock::new();
    r.read(0, 0, 0, &mut block).unwrap();
    assert_eq!(block.cube.mean(), 2.0);

    // both payloads occupy the data region; the entry points at the second
    let layout = wta_core::ArchiveLayout::new(r.header());
    let first_payload = (wta_core::VOXEL_COUNT * 4) as u64;
    assert_eq!(entry.offset, layout.data_start + first_payload);
    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len, entry.offset + entry.nbytes as u64);
}

#[test]
fn open_with_wrong_encoder_fails() {
    let path = temp_path("encoder_mismatch");
    let mut w =
        Writer::create(&path, 1, 1, 1, 0.0, false, Box::new(DeflateAdapter::default())).unwrap();
    w.write(0, 0, 0, &constant_block(1.0)).unwrap();
    w.close().unwrap();

    let err = Reader::open(&path, Box::new(RawAdapter::default())).unwrap_err();
    assert!(
        err.to_string().contains("encoder mismatch"),
        "unexpected error: {err}"
    );
}

#[test]
fn open_with_mismatched_voxel_count_fails() {
    use std::io::Write as _;

    let path = temp_path("voxel_mismatch");
    {
        let mut w =
            Writer::create(&path, 1, 1, 1, 0.0, false, Box::new(RawAdapter::default())).unwrap();
        w.write(0, 0, 0, &constant_block(1.0)).unwrap();
        w.close().unwrap();
    }

    // doctor the header to claim a different build constant
    let contents = std::fs::read(&path).unwrap();
    let doctored = String::from_utf8_lossy(&contents[..200]).replace(
        &format!("Voxelsperdimension: {VOXELS}"),
        &format!("Voxelsperdimension: {}", VOXELS * 2),
    );
    let mut out = std::fs::File::create(&path).unwrap();
    out.write_all(doctored.as_bytes()).unwrap();
    out.write_all(&contents[200..]).unwrap();
    drop(out);

    let err = Reader::open(&path, Box::new(RawAdapter::default())).unwrap_err();
    assert!(
        err.to_string().contains("voxel count mismatch"),
        "unexpected error: {err}"
    );
}

/// Tooling path: discover the encoder from the header, then open.
#[test]
fn adapter_discovery_from_header() {
    let path = temp_path("discovery");
    let mut w =
        Writer::create(&path, 1, 1, 1, 0.0, false, Box::new(DeflateAdapter::default())).unwrap();
    w.write(0, 0, 0, &constant_block(3.0)).unwrap();
    w.close().unwrap();

    let header = wta_core::ArchiveHeader::load(&path).unwrap();
    assert_eq!(header.encoder, "zlib");

    let adapter = adapter_for_encoder(&header.encoder).unwrap();
    let mut r = Reader::open(&path, adapter).unwrap();
    let mut block = TextureBlock::new();
    r.read(0, 0, 0, &mut block).unwrap();
    assert_eq!(block.cube.mean(), 3.0);
}

#[test]
fn geometry_travels_with_the_entry() {
    let path = temp_path("geometry");
    let mut w =
        Writer::create(&path, 1, 1, 1, 0.0, false, Box::new(RawAdapter::default())).unwrap();
    let mut block = constant_block(1.0);
    let mut g = Geometry::default();
    g.set_axis(0, 8, 16, 1, 0.25);
    g.set_axis(1, 0, 8, 1, 0.25);
    g.set_axis(2, 16, 24, 1, 0.25);
    block.geometry = g;
    w.write(0, 0, 0, &block).unwrap();
    w.close().unwrap();

    let mut r = Reader::open(&path, Box::new(RawAdapter::default())).unwrap();
    let mut restored = TextureBlock::new();
    r.read(0, 0, 0, &mut restored).unwrap();
    assert_eq!(restored.geometry, g);
}
