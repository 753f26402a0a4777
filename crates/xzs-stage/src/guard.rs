//! Growth guard: drop compression results that are not smaller.

/// Payload chosen by [`maybe_revert`].
#[derive(Debug, PartialEq, Eq)]
pub struct Guarded {
    pub payload: Vec<u8>,
    /// False when the original was kept; the entry must not be renamed.
    pub did_compress: bool,
}

/// Keep `compressed` only if it is strictly smaller than `original`.
///
/// On revert the original allocation is handed back as is.
pub fn maybe_revert(original: Vec<u8>, compressed: Vec<u8>) -> Guarded {
    if compressed.len() >= original.len() {
        Guarded {
            payload: original,
            did_compress: false,
        }
    } else {
        Guarded {
            payload: compressed,
            did_compress: true,
        }
    }
}
