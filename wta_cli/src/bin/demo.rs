//! WTA end-to-end demo.
//!
//! Builds a small archive twice — once with the serial writer, once with the
//! distributed writer driven by concurrent participants — then reads both
//! back and verifies every block. The distributed pass runs the participants
//! as threads, each attached through its own file handles exactly like a
//! separate process would be.

use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::Result;

use wta_codecs::DeflateAdapter;
use wta_core::{DistributedWriter, Reader, TextureBlock, Writer, VOXELS};

const GRID: usize = 4; // GRID³ blocks
const THRESHOLD: f32 = 0.0;

fn demo_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("wta_demo_{}_{}.wta", name, std::process::id()))
}

/// Deterministic smooth scalar field for block (ix, iy, iz).
fn make_block(ix: usize, iy: usize, iz: usize) -> TextureBlock {
    let mut block = TextureBlock::new();
    let spacing = 1.0 / (GRID * VOXELS) as f64;
    for (axis, g) in [ix, iy, iz].into_iter().enumerate() {
        let gstart = (g * VOXELS) as i32;
        block
            .geometry
            .set_axis(axis, gstart, gstart + VOXELS as i32, 1, spacing);
    }
    for k in 0..VOXELS {
        for j in 0..VOXELS {
            for i in 0..VOXELS {
                let x = (ix * VOXELS + i) as f32;
                let y = (iy * VOXELS + j) as f32;
                let z = (iz * VOXELS + k) as f32;
                block.cube.set(i, j, k, (x * 0.07).sin() + (y * 0.05).cos() + z * 0.01);
            }
        }
    }
    block
}

fn verify(path: &PathBuf) -> Result<()> {
    let mut reader = Reader::open(path, Box::new(DeflateAdapter::default()))?;
    let mut block = TextureBlock::new();
    for iz in 0..GRID {
        for iy in 0..GRID {
            for ix in 0..GRID {
                reader.read(ix, iy, iz, &mut block)?;
                let expected = make_block(ix, iy, iz);
                anyhow::ensure!(
                    block.cube.as_slice() == expected.cube.as_slice(),
                    "block ({ix}, {iy}, {iz}) did not round-trip"
                );
            }
        }
    }
    Ok(())
}

fn serial_pass() -> Result<()> {
    let path = demo_path("serial");
    let t0 = Instant::now();

    let mut writer = Writer::create(
        &path,
        GRID,
        GRID,
        GRID,
        THRESHOLD,
        false,
        Box::new(DeflateAdapter::default()),
    )?;
    for iz in 0..GRID {
        for iy in 0..GRID {
            for ix in 0..GRID {
                writer.write(ix, iy, iz, &make_block(ix, iy, iz))?;
            }
        }
    }
    writer.close()?;
    let wrote = t0.elapsed();

    verify(&path)?;
    let size = std::fs::metadata(&path)?.len();
    println!(
        "serial      : {} blocks, {} B on disk, wrote+verified in {:.1} ms",
        GRID * GRID * GRID,
        size,
        wrote.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn distributed_pass() -> Result<()> {
    const PARTICIPANTS: usize = 4;
    let path = demo_path("shared");
    let t0 = Instant::now();

    // coordinator: header, data-title, counter — then the barrier point
    let coordinator = DistributedWriter::initialize(
        &path,
        GRID,
        GRID,
        GRID,
        THRESHOLD,
        false,
        Box::new(DeflateAdapter::default()),
    )?;
    coordinator.close()?;

    // participant `p` owns the z-slabs with iz % PARTICIPANTS == p
    let mut handles = Vec::new();
    for p in 0..PARTICIPANTS {
        let path = path.clone();
        handles.push(thread::spawn(move || -> Result<()> {
            let mut writer = DistributedWriter::join(&path, Box::new(DeflateAdapter::default()))?;
            for iz in (p..GRID).step_by(PARTICIPANTS) {
                for iy in 0..GRID {
                    for ix in 0..GRID {
                        writer.write(ix, iy, iz, &make_block(ix, iy, iz))?;
                    }
                }
            }
            writer.close()
        }));
    }
    for handle in handles {
        handle.join().expect("participant panicked")?;
    }
    // all writers done: completion barrier, then finalize
    DistributedWriter::finalize(&path)?;
    let wrote = t0.elapsed();

    verify(&path)?;
    let size = std::fs::metadata(&path)?.len();
    println!(
        "distributed : {} blocks via {} writers, {} B on disk, wrote+verified in {:.1} ms",
        GRID * GRID * GRID,
        PARTICIPANTS,
        size,
        wrote.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    serial_pass()?;
    distributed_pass()?;
    println!("ok");
    Ok(())
}
