//! Bundled [`CompressionAdapter`] implementations for WTA archives.

mod deflate;
mod raw;
mod samples;

pub use deflate::DeflateAdapter;
pub use raw::RawAdapter;

use wta_core::CompressionAdapter;

/// Resolve an adapter from an archive's on-disk `Encoder` field.
///
/// Called by tooling after a first-pass header read, so an existing archive
/// can be opened with the right adapter automatically.
pub fn adapter_for_encoder(encoder: &str) -> anyhow::Result<Box<dyn CompressionAdapter>> {
    match encoder {
        "zlib" => Ok(Box::new(DeflateAdapter::default())),
        "raw" => Ok(Box::new(RawAdapter::default())),
        other => anyhow::bail!("unknown encoder {other:?}; bundled adapters: zlib, raw"),
    }
}
