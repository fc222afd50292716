use crate::error::Result;

use super::decode::decode;
use super::encode::encode;
use super::ifd::ExifDocument;
use super::jpeg;
use super::tag;

/// Remove the GPS sub-directory and its pointer from IFD0.
///
/// Returns the document and whether anything was removed. Other directories
/// are left alone. Applying it to its own output removes nothing.
pub fn strip_gps(mut doc: ExifDocument) -> (ExifDocument, bool) {
    let pointer = doc.ifd0.remove(tag::GPS_INFO_IFD_POINTER);
    let gps = doc.gps.take();

    match (&pointer, &gps) {
        (None, None) => log::debug!("no GPS data present"),
        (_, Some(gps)) => log::debug!("removed GPS IFD with {} entries", gps.len()),
        (Some(_), None) => log::debug!("removed GPS pointer without a GPS IFD"),
    }

    let removed = pointer.is_some() || gps.is_some();
    (doc, removed)
}

/// A JPEG file with its GPS data removed.
#[derive(Debug, Clone)]
pub struct StripOutcome {
    pub bytes: Vec<u8>,
    pub had_gps: bool,
}

/// The Exif TIFF block of a JPEG with GPS data removed, ready to be put
/// into another file.
#[derive(Debug, Clone)]
pub struct StrippedExif {
    pub tiff: Vec<u8>,
    pub had_gps: bool,
}

/// Run the whole pipeline over an in-memory JPEG.
///
/// When the file has no Exif segment, or its Exif carries no GPS data, the
/// input comes back untouched with `had_gps == false`. Otherwise only the
/// Exif segment is rewritten; every other byte is copied as is.
pub fn strip_gps_from_bytes(file: &[u8]) -> Result<StripOutcome> {
    let layout = jpeg::scan(file)?;
    let Some(segment) = layout.exif_segment() else {
        log::debug!("no Exif segment");
        return Ok(StripOutcome {
            bytes: file.to_vec(),
            had_gps: false,
        });
    };

    let (doc, had_gps) = strip_gps(decode(jpeg::exif_tiff(file, segment))?);
    if !had_gps {
        return Ok(StripOutcome {
            bytes: file.to_vec(),
            had_gps,
        });
    }

    let tiff = encode(&doc)?;
    let bytes = jpeg::splice_exif(file, &layout, &tiff)?;
    Ok(StripOutcome { bytes, had_gps })
}

/// Decode, strip and re-encode the Exif block of a JPEG without rebuilding
/// the file. `None` when the file has no Exif segment.
pub fn extract_stripped_exif(file: &[u8]) -> Result<Option<StrippedExif>> {
    let layout = jpeg::scan(file)?;
    let Some(segment) = layout.exif_segment() else {
        return Ok(None);
    };

    let (doc, had_gps) = strip_gps(decode(jpeg::exif_tiff(file, segment))?);
    let tiff = encode(&doc)?;
    Ok(Some(StrippedExif { tiff, had_gps }))
}
