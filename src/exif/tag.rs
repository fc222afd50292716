// Only the tags the codec needs to follow or rewrite.

pub const EXIF_IFD_POINTER: u16 = 0x8769;
pub const GPS_INFO_IFD_POINTER: u16 = 0x8825;
pub const INTEROPERABILITY_IFD_POINTER: u16 = 0xa005;

pub const JPEG_THUMBNAIL_OFFSET: u16 = 0x0201;
pub const JPEG_THUMBNAIL_LENGTH: u16 = 0x0202;

pub const MAKE: u16 = 0x010f;
pub const ORIENTATION: u16 = 0x0112;
pub const DATE_TIME: u16 = 0x0132;

pub mod gps {
    pub const LATITUDE_REF: u16 = 0x0001;
    pub const LATITUDE: u16 = 0x0002;
    pub const LONGITUDE_REF: u16 = 0x0003;
    pub const LONGITUDE: u16 = 0x0004;
    pub const ALTITUDE_REF: u16 = 0x0005;
    pub const ALTITUDE: u16 = 0x0006;
}

/// True for the tags whose value is an offset the encoder must recompute.
pub fn is_pointer(tag: u16) -> bool {
    matches!(
        tag,
        EXIF_IFD_POINTER | GPS_INFO_IFD_POINTER | INTEROPERABILITY_IFD_POINTER
    )
}
