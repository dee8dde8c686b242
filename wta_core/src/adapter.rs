use crate::texture::VoxelCube;

/// Compression abstraction at the edge of the archive core.
///
/// The wavelet transform and byte encoder behind this trait are a black box:
/// the archive only moves opaque payload bytes and records their length.
/// Implementations own a single reusable buffer holding the most recent
/// payload; that buffer is valid until the adapter's next
/// `compress`/`stage`/`decompress` call.
///
/// Each implementation reports two stable identifiers stored in the archive
/// header and validated on open: the wavelet-kind name and the encoder id.
pub trait CompressionAdapter: Send {
    /// Wavelet-kind name written into the `Wavelets` header field.
    fn wavelet_name(&self) -> &'static str;

    /// Encoder identifier written into the `Encoder` header field
    /// (e.g. "zlib").
    fn encoder_name(&self) -> &'static str;

    /// Compress `cube` into the internal buffer and return the payload
    /// length in bytes.
    ///
    /// `threshold` bounds the per-sample reconstruction error (0 means the
    /// round-trip is exact); `halffloat` selects reduced-precision storage.
    fn compress(&mut self, threshold: f32, halffloat: bool, cube: &VoxelCube)
        -> anyhow::Result<usize>;

    /// The payload produced by the last `compress` call, or the bytes staged
    /// via `stage`.
    fn payload(&self) -> &[u8];

    /// Expose the internal buffer resized to `nbytes`, for a reader to fill
    /// with a payload before calling `decompress`.
    fn stage(&mut self, nbytes: usize) -> &mut [u8];

    /// Decompress the first `nbytes` of the internal buffer into `cube`.
    ///
    /// Exact inverse of `compress` when the payload was produced with
    /// threshold 0 and `halffloat == false`; bounded error otherwise.
    fn decompress(&mut self, halffloat: bool, nbytes: usize, cube: &mut VoxelCube)
        -> anyhow::Result<()>;
}
