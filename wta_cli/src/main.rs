use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use wta_codecs::adapter_for_encoder;
use wta_core::{ArchiveHeader, ArchiveLayout, Reader, TextureBlock, LUT_ENTRY_SIZE, VOXELS};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "wta",
    about = "Wavelet Texture Archive — inspect and extract compressed voxel-block archives",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header metadata, layout, and LUT statistics
    Inspect {
        /// Archive to inspect
        file: PathBuf,
        /// Print the per-slot LUT table
        #[arg(long)]
        slots: bool,
    },
    /// Decompress a single block and write its samples as raw f32 LE
    Extract {
        /// Archive to read
        file: PathBuf,
        /// Texture grid coordinate
        ix: usize,
        iy: usize,
        iz: usize,
        /// Output file for the raw samples
        #[arg(short, long)]
        output: PathBuf,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn open_reader(file: &PathBuf) -> anyhow::Result<Reader> {
    // first-pass header read picks the adapter matching the on-disk encoder
    let header = ArchiveHeader::load(file)?;
    let adapter = adapter_for_encoder(&header.encoder)?;
    Reader::open(file, adapter)
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_inspect(file: PathBuf, show_slots: bool) -> anyhow::Result<()> {
    let reader = open_reader(&file)?;
    let header = reader.header();
    let layout = ArchiveLayout::new(header);
    let file_size = std::fs::metadata(&file)?.len();

    let written: Vec<_> = reader.entries().iter().filter(|e| !e.is_unwritten()).collect();
    let payload_bytes: u64 = written.iter().map(|e| e.nbytes as u64).sum();
    let raw_bytes = written.len() as u64 * (VOXELS * VOXELS * VOXELS * 4) as u64;

    println!("=== WTA archive: {:?} ===", file);
    println!();
    println!("  voxels/dim    : {}", VOXELS);
    println!(
        "  texture grid  : {} x {} x {}",
        header.xtextures, header.ytextures, header.ztextures
    );
    println!("  half float    : {}", if header.halffloat { "yes" } else { "no" });
    println!("  wavelets      : {}", header.wavelet);
    println!("  threshold     : {}", header.threshold);
    println!("  encoder       : {}", header.encoder);
    println!("  LUT entry     : {} B", LUT_ENTRY_SIZE);
    println!();
    println!("  LUT start     : {}", layout.lut_start);
    println!("  data title    : {}", layout.data_title_start);
    println!("  data start    : {}", layout.data_start);
    println!();
    println!(
        "  slots written : {} / {}",
        written.len(),
        reader.entries().len()
    );
    println!("  payload bytes : {}", human_bytes(payload_bytes));
    println!("  file on disk  : {}", human_bytes(file_size));
    if payload_bytes > 0 {
        println!(
            "  ratio         : {:.2}x",
            raw_bytes as f64 / payload_bytes as f64
        );
    }

    if show_slots {
        println!();
        println!(
            "  {:>6}  {:>12}  {:>10}  {:>24}",
            "slot", "offset", "nbytes", "position"
        );
        println!("  {}", "-".repeat(60));
        for (i, e) in reader.entries().iter().enumerate() {
            if e.is_unwritten() {
                println!("  {:>6}  {:>12}  {:>10}  (unwritten)", i, "-", "-");
            } else {
                println!(
                    "  {:>6}  {:>12}  {:>10}  ({:.3}, {:.3}, {:.3})",
                    i,
                    e.offset,
                    human_bytes(e.nbytes as u64),
                    e.geometry.pos[0],
                    e.geometry.pos[1],
                    e.geometry.pos[2]
                );
            }
        }
    }

    Ok(())
}

fn run_extract(
    file: PathBuf,
    ix: usize,
    iy: usize,
    iz: usize,
    output: PathBuf,
) -> anyhow::Result<()> {
    let mut reader = open_reader(&file)?;
    let mut block = TextureBlock::new();
    reader.read(ix, iy, iz, &mut block)?;

    let mut out = std::fs::File::create(&output)
        .with_context(|| format!("creating output file {output:?}"))?;
    for v in block.cube.as_slice() {
        out.write_all(&v.to_le_bytes())?;
    }

    eprintln!(
        "extracted slot ({ix}, {iy}, {iz}): {} samples, mean {:.6}, written to {output:?}",
        block.cube.as_slice().len(),
        block.cube.mean()
    );
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { file, slots } => run_inspect(file, slots),
        Commands::Extract {
            file,
            ix,
            iy,
            iz,
            output,
        } => run_extract(file, ix, iy, iz, output),
    }
}
