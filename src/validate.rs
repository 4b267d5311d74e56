//! Image payload validation and the two-phase dimension probe.
//!
//! Validity requires a **full decode**, not a magic-byte sniff: corrupted
//! payloads with intact headers must be rejected, and only decoding the
//! whole structure catches them.
//!
//! Dimension extraction is cheaper — every supported format records its
//! dimensions in the leading bytes — so the probe runs against a capped
//! prefix first and only asks for the full payload when the prefix was not
//! enough. The outcome is an explicit tagged result rather than an internal
//! retry, so the caller controls the second read:
//!
//! ```text
//! probe_dimensions(prefix, false)  → Known(w, h)      done, no full read
//!                                  → NeedsFullRead    caller re-reads fully
//! probe_dimensions(full,   true)   → Known(w, h) | Unreadable
//! ```
//!
//! Decode failures are reported in the return value and never propagate as
//! run-fatal errors.

use image::ImageReader;
use std::io::Cursor;

/// Outcome of a dimension probe over a (possibly partial) byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionProbe {
    /// Dimensions recovered from the buffer.
    Known(u32, u32),
    /// The buffer was a prefix and did not contain enough of the header;
    /// retry with the full payload.
    NeedsFullRead,
    /// The full payload was available and still undecodable.
    Unreadable,
}

/// Whether the buffer decodes as a well-formed image.
///
/// Fully decodes the pixel data; a structurally broken payload behind a
/// valid header returns `false`.
pub fn is_valid_image(bytes: &[u8]) -> bool {
    image::load_from_memory(bytes).is_ok()
}

/// Probe (width, height) from a byte buffer.
///
/// `complete` states whether `bytes` is the whole payload or just a leading
/// range. Header parsing stops at the dimension fields, so this never
/// decodes pixel data.
pub fn probe_dimensions(bytes: &[u8], complete: bool) -> DimensionProbe {
    let reader = match ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(r) => r,
        Err(_) => return if complete { DimensionProbe::Unreadable } else { DimensionProbe::NeedsFullRead },
    };
    match reader.into_dimensions() {
        Ok((w, h)) => DimensionProbe::Known(w, h),
        Err(_) if complete => DimensionProbe::Unreadable,
        Err(_) => DimensionProbe::NeedsFullRead,
    }
}
