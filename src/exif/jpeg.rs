// JPEG marker structure: https://www.w3.org/Graphics/JPEG/itu-t81.pdf (Annex B)
// Exif APP1 layout: Exif 2.32, section 4.5.4

use std::ops::Range;

use crate::error::{Result, StripError};

pub const MARKER_SOI: u8 = 0xD8;
pub const MARKER_EOI: u8 = 0xD9;
pub const MARKER_SOS: u8 = 0xDA;
pub const MARKER_APP0: u8 = 0xE0;
pub const MARKER_APP1: u8 = 0xE1;
const MARKER_TEM: u8 = 0x01;

/// Identifier that opens the payload of an Exif APP1 segment.
pub const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Largest payload a length-prefixed segment can carry.
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// One marker-delimited unit of a JPEG file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegSegment {
    pub marker: u8,
    /// Offset of the `0xFF` that introduces the marker.
    pub offset: usize,
    /// Whole segment length, marker bytes included.
    pub length: usize,
    /// Payload range in the file, after the marker and length field.
    pub payload: Range<usize>,
}

impl JpegSegment {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn payload<'a>(&self, file: &'a [u8]) -> &'a [u8] {
        &file[self.payload.clone()]
    }

    fn is_exif(&self, file: &[u8]) -> bool {
        self.marker == MARKER_APP1 && self.payload(file).starts_with(EXIF_HEADER)
    }
}

/// Result of walking the header of a JPEG file.
#[derive(Debug, Clone)]
pub struct JpegLayout {
    /// Segments in file order, from SOI up to and including SOS (or EOI).
    pub segments: Vec<JpegSegment>,
    /// Index into `segments` of the first Exif APP1 segment.
    pub exif_index: Option<usize>,
    /// Where opaque data (entropy-coded scans and whatever follows) begins.
    pub scan_data_offset: usize,
}

impl JpegLayout {
    pub fn exif_segment(&self) -> Option<&JpegSegment> {
        self.exif_index.map(|i| &self.segments[i])
    }
}

/// Walk the marker segments of a JPEG file up to the first start-of-scan.
pub fn scan(file: &[u8]) -> Result<JpegLayout> {
    if file.len() < 2 || file[0] != 0xFF || file[1] != MARKER_SOI {
        return Err(StripError::NotAJpeg);
    }

    let mut segments = vec![JpegSegment {
        marker: MARKER_SOI,
        offset: 0,
        length: 2,
        payload: 2..2,
    }];
    let mut exif_index = None;
    let mut pos = 2;

    while pos < file.len() {
        if file[pos] != 0xFF {
            return Err(StripError::UnsupportedVariant(format!(
                "expected a JPEG marker at offset {pos}, found 0x{:02x}",
                file[pos]
            )));
        }

        // any number of 0xFF fill bytes may precede a marker
        let offset = pos;
        while pos + 1 < file.len() && file[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= file.len() {
            return Err(StripError::TruncatedFile {
                offset,
                declared: 2,
                available: file.len() - offset,
            });
        }
        let marker = file[pos + 1];
        let marker_end = pos + 2;

        match marker {
            0x00 => {
                return Err(StripError::UnsupportedVariant(format!(
                    "stuffed byte outside of scan data at offset {offset}"
                )));
            }
            MARKER_TEM | 0xD0..=0xD7 | MARKER_EOI => {
                segments.push(JpegSegment {
                    marker,
                    offset,
                    length: marker_end - offset,
                    payload: marker_end..marker_end,
                });
                pos = marker_end;
                if marker == MARKER_EOI {
                    break;
                }
                continue;
            }
            _ => {}
        }

        if marker_end + 2 > file.len() {
            return Err(StripError::TruncatedFile {
                offset,
                declared: 2,
                available: file.len() - marker_end,
            });
        }
        let declared = u16::from_be_bytes([file[marker_end], file[marker_end + 1]]) as usize;
        let available = file.len() - marker_end;
        if declared < 2 || declared > available {
            return Err(StripError::TruncatedFile {
                offset,
                declared,
                available,
            });
        }

        let end = marker_end + declared;
        let segment = JpegSegment {
            marker,
            offset,
            length: end - offset,
            payload: marker_end + 2..end,
        };

        if marker == MARKER_APP1 && exif_index.is_none() {
            let payload = segment.payload(file);
            if segment.is_exif(file) {
                exif_index = Some(segments.len());
            } else if payload.starts_with(b"Exif") {
                return Err(StripError::UnsupportedVariant(format!(
                    "APP1 segment at offset {offset} has a non-standard Exif identifier"
                )));
            }
        }

        segments.push(segment);
        pos = end;

        if marker == MARKER_SOS {
            break;
        }
    }

    log::debug!(
        "scanned {} JPEG segments, exif segment: {:?}, scan data at {}",
        segments.len(),
        exif_index,
        pos
    );

    Ok(JpegLayout {
        segments,
        exif_index,
        scan_data_offset: pos,
    })
}

/// The TIFF block inside an Exif APP1 segment's payload.
pub fn exif_tiff<'a>(file: &'a [u8], segment: &JpegSegment) -> &'a [u8] {
    &segment.payload(file)[EXIF_HEADER.len()..]
}

/// Build a complete Exif APP1 segment around a TIFF block.
fn exif_segment_bytes(tiff: &[u8]) -> Result<Vec<u8>> {
    let payload_len = EXIF_HEADER.len() + tiff.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        return Err(StripError::SegmentTooLarge(payload_len));
    }

    let mut segment = Vec::with_capacity(payload_len + 4);
    segment.extend_from_slice(&[0xFF, MARKER_APP1]);
    segment.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(tiff);
    Ok(segment)
}

/// Rebuild `file` with the given TIFF block in place of its Exif segment.
///
/// Every byte outside the Exif segment is copied verbatim. A file without an
/// Exif segment is returned unchanged.
pub fn splice_exif(file: &[u8], layout: &JpegLayout, tiff: &[u8]) -> Result<Vec<u8>> {
    let Some(exif) = layout.exif_segment() else {
        return Ok(file.to_vec());
    };

    let segment = exif_segment_bytes(tiff)?;
    let mut out = Vec::with_capacity(file.len() - exif.length + segment.len());
    out.extend_from_slice(&file[..exif.offset]);
    out.extend_from_slice(&segment);
    out.extend_from_slice(&file[exif.end()..]);
    Ok(out)
}

/// Put a TIFF block into an existing JPEG.
///
/// Replaces its Exif segment if it has one, otherwise inserts a new APP1
/// right after SOI, or after a leading APP0 (JFIF) segment.
pub fn insert_exif(file: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
    let layout = scan(file)?;
    if layout.exif_index.is_some() {
        return splice_exif(file, &layout, tiff);
    }

    let at = match layout.segments.get(1) {
        Some(app0) if app0.marker == MARKER_APP0 => app0.end(),
        _ => layout.segments[0].end(),
    };

    let segment = exif_segment_bytes(tiff)?;
    let mut out = Vec::with_capacity(file.len() + segment.len());
    out.extend_from_slice(&file[..at]);
    out.extend_from_slice(&segment);
    out.extend_from_slice(&file[at..]);
    Ok(out)
}
