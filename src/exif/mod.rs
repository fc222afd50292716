//! JPEG/Exif codec: segment scanning, TIFF directory decoding, GPS removal
//! and re-encoding.
//!
//! The stages run in this order for each file:
//!
//! - [`jpeg::scan`]: locate the Exif APP1 segment and the start of scan data
//! - [`decode`]: parse the TIFF block into an [`ExifDocument`]
//! - [`strip_gps`]: drop the GPS sub-directory and its IFD0 pointer
//! - [`encode`]: lay the document out again with fresh offsets
//! - [`jpeg::splice_exif`]: swap the new block into the file
//!
//! [`strip_gps_from_bytes`] chains them for an in-memory file.

pub mod decode;
pub mod encode;
pub mod ifd;
pub mod jpeg;
pub mod strip;
pub mod tag;

#[cfg(test)]
pub(crate) mod test_support;

pub use decode::decode;
pub use encode::encode;
pub use ifd::{ByteOrder, ExifDocument, Ifd, IfdEntry, ValueType};
pub use jpeg::{JpegLayout, JpegSegment};
pub use strip::{StripOutcome, StrippedExif, extract_stripped_exif, strip_gps, strip_gps_from_bytes};
