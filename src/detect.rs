//! PDF header sniffing.
//!
//! Rejecting non-PDF input early is the only fatal error of the pipeline, so
//! this check runs before lopdf ever sees the bytes.

use crate::error::{Error, Result};

/// PDF format information read from the file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Byte offset of the `%PDF-` marker (non-zero for files with a preamble)
    pub header_offset: usize,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3;

/// Readers accept the header anywhere in the first 1024 bytes.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Detect the PDF header in a byte buffer.
///
/// # Example
/// ```
/// use repaper::detect::detect_format_from_bytes;
///
/// let format = detect_format_from_bytes(b"%PDF-1.7\n%\xe2\xe3").unwrap();
/// assert_eq!(format.version, "1.7");
/// ```
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version_start = offset + PDF_MAGIC.len();
    let version_bytes = data
        .get(version_start..version_start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfFormat {
        version,
        header_offset: offset,
    })
}

/// Check if bytes start like a PDF document.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == VERSION_LEN
        && bytes[0].is_ascii_digit()
        && bytes[1] == b'.'
        && bytes[2].is_ascii_digit()
}
