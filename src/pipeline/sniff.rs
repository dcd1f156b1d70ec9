//! Image header sniffing: read pixel dimensions from PNG, GIF and JPEG
//! headers without decoding pixel data.
//!
//! A malformed or truncated header is an everyday outcome on the open web,
//! so [`sniff_dimensions`] never fails: it returns
//! [`ImageDimensions::UNKNOWN`] for anything it cannot read.
//!
//! ## Header layouts
//!
//! ```text
//! PNG   89 50 4E 47 0D 0A 1A 0A | len(4) | "IHDR" @12 | width u32be @16 | height u32be @20
//! GIF   "GIF87a" / "GIF89a"    | width u16le @6 | height u16le @8
//! JPEG  FF D8 | (FF+ type [len u16be payload])* … SOFn: len | precision | height u16be | width u16be
//! ```

use crate::output::ImageDimensions;

/// Shortest buffer worth inspecting; covers the PNG IHDR dimensions.
pub const MIN_HEADER_LEN: usize = 24;

const PNG_MAGIC: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const PNG_IHDR: &[u8; 4] = b"IHDR";
const GIF87A: &[u8; 6] = b"GIF87a";
const GIF89A: &[u8; 6] = b"GIF89a";
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Detected container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Gif,
    Jpeg,
}

/// Identify the format from its signature, if recognised.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.len() < MIN_HEADER_LEN {
        return None;
    }
    if bytes.starts_with(PNG_MAGIC) && &bytes[12..16] == PNG_IHDR {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(GIF87A) || bytes.starts_with(GIF89A) {
        Some(ImageFormat::Gif)
    } else if bytes.starts_with(&JPEG_SOI) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

/// Read `(width, height)` from the image header, or `(0, 0)` if unreadable.
pub fn sniff_dimensions(bytes: &[u8]) -> ImageDimensions {
    match detect_format(bytes) {
        Some(ImageFormat::Png) => png_dimensions(bytes),
        Some(ImageFormat::Gif) => gif_dimensions(bytes),
        Some(ImageFormat::Jpeg) => jpeg_dimensions(bytes).unwrap_or(ImageDimensions::UNKNOWN),
        None => ImageDimensions::UNKNOWN,
    }
}

fn png_dimensions(bytes: &[u8]) -> ImageDimensions {
    match (read_u32_be(bytes, 16), read_u32_be(bytes, 20)) {
        (Some(w), Some(h)) => ImageDimensions::new(w, h),
        _ => ImageDimensions::UNKNOWN,
    }
}

fn gif_dimensions(bytes: &[u8]) -> ImageDimensions {
    match (read_u16_le(bytes, 6), read_u16_le(bytes, 8)) {
        (Some(w), Some(h)) => ImageDimensions::new(u32::from(w), u32::from(h)),
        _ => ImageDimensions::UNKNOWN,
    }
}

/// Walk JPEG marker segments until the first Start-Of-Frame (0xC0–0xCF).
///
/// `None` on truncation or a length field below 2.
fn jpeg_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    let mut pos = JPEG_SOI.len();

    loop {
        // Marker prefix plus any fill bytes.
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        while *bytes.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *bytes.get(pos)?;
        pos += 1;

        // TEM and RSTn/SOI/EOI carry no length field.
        if marker == 0x01 || (0xD0..=0xD9).contains(&marker) {
            continue;
        }

        let length = usize::from(read_u16_be(bytes, pos)?);
        let payload = length.checked_sub(2)?;

        if (0xC0..=0xCF).contains(&marker) {
            // Skip the length field and the sample-precision byte.
            let height = read_u16_be(bytes, pos + 3)?;
            let width = read_u16_be(bytes, pos + 5)?;
            return Some(ImageDimensions::new(u32::from(width), u32::from(height)));
        }

        pos = pos.checked_add(2 + payload)?;
    }
}

fn read_u16_be(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

fn read_u16_le(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32_be(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut b = PNG_MAGIC.to_vec();
        b.extend_from_slice(&13u32.to_be_bytes());
        b.extend_from_slice(PNG_IHDR);
        b.extend_from_slice(&width.to_be_bytes());
        b.extend_from_slice(&height.to_be_bytes());
        b.extend_from_slice(&[8, 6, 0, 0, 0]);
        b
    }

    fn gif_header(sig: &[u8; 6], width: u16, height: u16) -> Vec<u8> {
        let mut b = sig.to_vec();
        b.extend_from_slice(&width.to_le_bytes());
        b.extend_from_slice(&height.to_le_bytes());
        b.resize(32, 0);
        b
    }

    /// SOI, APP0 (JFIF), DQT, SOF0: the usual baseline layout.
    fn jpeg_header(width: u16, height: u16) -> Vec<u8> {
        let mut b = vec![0xFF, 0xD8];
        // APP0, length 16
        b.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        b.extend_from_slice(b"JFIF\0");
        b.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
        // DQT, length 67
        b.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
        b.extend_from_slice(&[1u8; 64]);
        // SOF0, length 17, precision 8
        b.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        b.extend_from_slice(&height.to_be_bytes());
        b.extend_from_slice(&width.to_be_bytes());
        b.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        b
    }

    #[test]
    fn png_dimensions_read() {
        assert_eq!(
            sniff_dimensions(&png_header(1200, 800)),
            ImageDimensions::new(1200, 800)
        );
    }

    #[test]
    fn png_without_ihdr_is_unknown() {
        let mut b = png_header(10, 10);
        b[12..16].copy_from_slice(b"IDAT");
        assert_eq!(sniff_dimensions(&b), ImageDimensions::UNKNOWN);
    }

    #[test]
    fn gif_both_versions() {
        assert_eq!(
            sniff_dimensions(&gif_header(GIF87A, 320, 240)),
            ImageDimensions::new(320, 240)
        );
        assert_eq!(
            sniff_dimensions(&gif_header(GIF89A, 640, 480)),
            ImageDimensions::new(640, 480)
        );
    }

    #[test]
    fn jpeg_height_then_width() {
        assert_eq!(
            sniff_dimensions(&jpeg_header(1024, 768)),
            ImageDimensions::new(1024, 768)
        );
    }

    #[test]
    fn jpeg_fill_bytes_are_skipped() {
        let mut b = jpeg_header(500, 400);
        // Pad the SOF0 marker with two extra fill bytes.
        let sof = b.windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
        b.splice(sof..sof, [0xFF, 0xFF]);
        assert_eq!(sniff_dimensions(&b), ImageDimensions::new(500, 400));
    }

    #[test]
    fn jpeg_progressive_sof2() {
        let mut b = jpeg_header(800, 600);
        let sof = b.windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
        b[sof + 1] = 0xC2;
        assert_eq!(sniff_dimensions(&b), ImageDimensions::new(800, 600));
    }

    #[test]
    fn jpeg_truncated_before_sof() {
        let b = jpeg_header(800, 600);
        let sof = b.windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
        assert_eq!(sniff_dimensions(&b[..sof + 3]), ImageDimensions::UNKNOWN);
    }

    #[test]
    fn jpeg_length_underflow() {
        let mut b = jpeg_header(800, 600);
        // APP0 length of 1 cannot include its own two bytes.
        b[4] = 0x00;
        b[5] = 0x01;
        assert_eq!(sniff_dimensions(&b), ImageDimensions::UNKNOWN);
    }

    #[test]
    fn jpeg_segment_running_past_end() {
        let mut b = jpeg_header(800, 600);
        b[4] = 0xFF;
        b[5] = 0xFF;
        assert_eq!(sniff_dimensions(&b), ImageDimensions::UNKNOWN);
    }

    #[test]
    fn short_buffers_are_unknown() {
        let png = png_header(400, 400);
        for len in 0..MIN_HEADER_LEN {
            assert_eq!(sniff_dimensions(&png[..len]), ImageDimensions::UNKNOWN, "len {len}");
        }
    }

    #[test]
    fn unrecognised_signatures_are_unknown() {
        let webp = b"RIFF\x24\x00\x00\x00WEBPVP8 \x18\x00\x00\x00\x30\x01\x00\x9d\x01\x2a";
        assert_eq!(sniff_dimensions(webp), ImageDimensions::UNKNOWN);
        assert_eq!(sniff_dimensions(&[0u8; 64]), ImageDimensions::UNKNOWN);
        assert_eq!(
            sniff_dimensions(b"<html><body>not an image</body></html>"),
            ImageDimensions::UNKNOWN
        );
    }

    #[test]
    fn format_detection() {
        assert_eq!(detect_format(&png_header(1, 1)), Some(ImageFormat::Png));
        assert_eq!(detect_format(&gif_header(GIF89A, 1, 1)), Some(ImageFormat::Gif));
        assert_eq!(detect_format(&jpeg_header(1, 1)), Some(ImageFormat::Jpeg));
        assert_eq!(detect_format(b"short"), None);
    }
}
