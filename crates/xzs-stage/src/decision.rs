//! Per-entry compression gate.
//!
//! Only buffered entries have a known size, so only they can be turned away
//! before any work is done. A stream's length is unknown until it has been
//! drained; in pure streaming mode the stage compresses speculatively and
//! never consults this gate (see `Options::buffer_streams` to opt out).

use xzs_core::Threshold;

/// Whether an entry of `size` bytes should be compressed.
pub fn should_compress(size: u64, threshold: Threshold) -> bool {
    match threshold {
        Threshold::Disabled => true,
        Threshold::Bytes(min) => size >= min,
    }
}
