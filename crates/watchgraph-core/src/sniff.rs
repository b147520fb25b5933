//! # Image Byte Sniffer
//!
//! Classifies an uploaded byte buffer by magic-number inspection. The
//! classification, the canonical MIME table, and the file-extension table
//! are part of the wire contract for image uploads and downloads.
//!
//! Sniffing is total: every input maps to a format, with [`ImageFormat::Unknown`]
//! as the terminal "no match" result. Nothing here allocates or fails.

use crate::types::WatchGraphError;

/// Upper bound for accepted image uploads (1 MiB).
pub const MAX_IMAGE_BYTES: usize = 1024 * 1024;

/// How far past an XML prolog the SVG root-tag scan may look.
const SVG_SCAN_LIMIT: usize = 1024;

const JPG: &[u8] = &[0xFF, 0xD8];
const BMP: &[u8] = &[0x42, 0x4D];
const GIF: &[u8] = &[0x47, 0x49, 0x46];
const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const SVG_LOWER: &[u8] = b"<svg";
const SVG_UPPER: &[u8] = b"<SVG";
const TIFF_LE: &[u8] = &[0x49, 0x49, 0x2A, 0x00];
const TIFF_BE: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A];
const XML_PROLOG_LOWER: &[u8] = b"<?xml";
const XML_PROLOG_UPPER: &[u8] = b"<?XML";

/// Image formats recognized by the sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpg,
    Bmp,
    Gif,
    Png,
    Svg,
    Tif,
    Unknown,
}

impl ImageFormat {
    /// Canonical MIME type served for this format.
    pub const fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Tif => "image/tiff",
            ImageFormat::Unknown => "application/octet-stream",
        }
    }

    /// Canonical download extension for this format.
    pub const fn file_extension(self) -> &'static str {
        match self {
            ImageFormat::Jpg => ".jpg",
            ImageFormat::Bmp => ".bmp",
            ImageFormat::Gif => ".gif",
            ImageFormat::Png => ".png",
            ImageFormat::Svg => ".svg",
            ImageFormat::Tif => ".tif",
            ImageFormat::Unknown => ".bin",
        }
    }
}

/// Classify a byte buffer by its magic numbers.
///
/// Fixed signatures are checked first, in table order. A buffer that opens
/// with an XML prolog is not decisive on its own (plenty of non-SVG XML
/// documents share it): classification defers to a bounded forward scan for
/// an `<svg`/`<SVG` root tag.
pub fn sniff(data: &[u8]) -> ImageFormat {
    const SIGNATURES: &[(&[u8], ImageFormat)] = &[
        (JPG, ImageFormat::Jpg),
        (BMP, ImageFormat::Bmp),
        (GIF, ImageFormat::Gif),
        (PNG, ImageFormat::Png),
        (SVG_LOWER, ImageFormat::Svg),
        (SVG_UPPER, ImageFormat::Svg),
        (TIFF_LE, ImageFormat::Tif),
        (TIFF_BE, ImageFormat::Tif),
    ];

    for (magic, format) in SIGNATURES {
        if data.starts_with(magic) {
            return *format;
        }
    }

    if data.starts_with(XML_PROLOG_LOWER) || data.starts_with(XML_PROLOG_UPPER) {
        return scan_for_svg_root(data, XML_PROLOG_LOWER.len());
    }

    ImageFormat::Unknown
}

/// Scan forward byte-by-byte from `start` for an SVG root tag, looking at
/// most [`SVG_SCAN_LIMIT`] bytes into the buffer and never past its end.
fn scan_for_svg_root(data: &[u8], start: usize) -> ImageFormat {
    let limit = SVG_SCAN_LIMIT.min(data.len());
    for offset in start..limit {
        let rest = &data[offset..];
        if rest.starts_with(SVG_LOWER) || rest.starts_with(SVG_UPPER) {
            return ImageFormat::Svg;
        }
    }
    ImageFormat::Unknown
}

/// Gate an uploaded buffer: recognized format first, then the size bound.
///
/// Returns the sniffed format so callers can reuse it without a second pass.
pub fn validate(data: &[u8]) -> Result<ImageFormat, WatchGraphError> {
    let format = sniff(data);
    if format == ImageFormat::Unknown {
        return Err(WatchGraphError::UnsupportedImageFormat);
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(WatchGraphError::ImageTooLarge);
    }
    Ok(format)
}

// =============================================================================
// TESTS
// =============================================================================
