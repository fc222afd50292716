//! Synthetic JPEG/Exif fixtures for the test suite.
//!
//! The TIFF writer here is deliberately independent of [`super::encode`] and
//! lays blocks out differently (GPS directory first, IFD0 last, values right
//! after their directory), so decoding and re-encoding a fixture exercises
//! real offset recomputation.

use super::ifd::ByteOrder;
use super::jpeg::{EXIF_HEADER, MARKER_APP0, MARKER_APP1, MARKER_EOI, MARKER_SOI, MARKER_SOS};
use super::tag;

/// Entropy-coded bytes placed after SOS, including a stuffed `FF 00` and a
/// restart marker.
pub const SCAN_DATA: &[u8] = &[
    0x12, 0x34, 0xFF, 0x00, 0x56, 0x78, 0xFF, 0xD0, 0x9A, 0xBC, 0xDE, 0xFF, 0x00, 0xF0,
];

/// An IFD entry as it should appear on disk. `data` is already in the
/// fixture's byte order.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub tag: u16,
    pub type_code: u16,
    pub count: u32,
    pub data: Vec<u8>,
}

/// Entry constructors bound to one byte order.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub order: ByteOrder,
}

impl Fixture {
    pub fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    pub fn ascii(&self, tag: u16, value: &str) -> RawEntry {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        RawEntry {
            tag,
            type_code: 2,
            count: data.len() as u32,
            data,
        }
    }

    pub fn short(&self, tag: u16, value: u16) -> RawEntry {
        RawEntry {
            tag,
            type_code: 3,
            count: 1,
            data: self.order.u16_bytes(value).to_vec(),
        }
    }

    pub fn long(&self, tag: u16, value: u32) -> RawEntry {
        RawEntry {
            tag,
            type_code: 4,
            count: 1,
            data: self.order.u32_bytes(value).to_vec(),
        }
    }

    pub fn bytes(&self, tag: u16, value: &[u8]) -> RawEntry {
        RawEntry {
            tag,
            type_code: 1,
            count: value.len() as u32,
            data: value.to_vec(),
        }
    }

    pub fn rationals(&self, tag: u16, values: &[(u32, u32)]) -> RawEntry {
        let mut data = Vec::with_capacity(values.len() * 8);
        for (num, den) in values {
            data.extend_from_slice(&self.order.u32_bytes(*num));
            data.extend_from_slice(&self.order.u32_bytes(*den));
        }
        RawEntry {
            tag,
            type_code: 5,
            count: values.len() as u32,
            data,
        }
    }

    /// Sub-directory pointer; the builder patches in the real offset.
    pub fn pointer(&self, tag: u16) -> RawEntry {
        self.long(tag, 0)
    }

    /// The 6-entry GPS directory used throughout the tests.
    pub fn gps_entries(&self) -> Vec<RawEntry> {
        vec![
            self.ascii(tag::gps::LATITUDE_REF, "N"),
            self.rationals(tag::gps::LATITUDE, &[(52, 1), (22, 1), (1234, 100)]),
            self.ascii(tag::gps::LONGITUDE_REF, "E"),
            self.rationals(tag::gps::LONGITUDE, &[(4, 1), (53, 1), (4321, 100)]),
            self.bytes(tag::gps::ALTITUDE_REF, &[0]),
            self.rationals(tag::gps::ALTITUDE, &[(1250, 10)]),
        ]
    }

    /// The three unrelated IFD0 tags used throughout the tests.
    pub fn camera_entries(&self) -> Vec<RawEntry> {
        vec![
            self.short(tag::ORIENTATION, 6),
            self.ascii(tag::DATE_TIME, "2016:02:07 10:21:33"),
            self.ascii(tag::MAKE, "Canon"),
        ]
    }
}

/// Description of a TIFF block to build.
#[derive(Debug, Clone)]
pub struct TiffSpec {
    pub order: ByteOrder,
    pub ifd0: Vec<RawEntry>,
    pub exif: Option<Vec<RawEntry>>,
    pub gps: Option<Vec<RawEntry>>,
    pub ifd1: Option<Vec<RawEntry>>,
    pub thumbnail: Option<Vec<u8>>,
}

impl TiffSpec {
    pub fn new(order: ByteOrder, ifd0: Vec<RawEntry>) -> Self {
        Self {
            order,
            ifd0,
            exif: None,
            gps: None,
            ifd1: None,
            thumbnail: None,
        }
    }

    /// IFD0 with the camera tags, a GPS pointer and the GPS directory.
    pub fn with_gps(order: ByteOrder) -> Self {
        let fx = Fixture::new(order);
        let mut ifd0 = fx.camera_entries();
        ifd0.insert(1, fx.pointer(tag::GPS_INFO_IFD_POINTER));
        Self {
            gps: Some(fx.gps_entries()),
            ..Self::new(order, ifd0)
        }
    }

    /// Everything: camera tags, Exif sub-IFD, GPS, IFD1 with a thumbnail.
    pub fn full(order: ByteOrder) -> Self {
        let fx = Fixture::new(order);
        let thumbnail: Vec<u8> = [0xFF, 0xD8]
            .into_iter()
            .chain((0..23).map(|i| i * 7))
            .chain([0xFF, 0xD9])
            .collect();
        let mut spec = Self::with_gps(order);
        spec.ifd0.push(fx.pointer(tag::EXIF_IFD_POINTER));
        spec.exif = Some(vec![
            fx.ascii(0x9003, "2016:02:07 10:21:33"),
            fx.rationals(0x829a, &[(1, 250)]),
            fx.bytes(0x9000, b"0230"),
        ]);
        spec.ifd1 = Some(vec![
            fx.short(0x0103, 6),
            fx.long(tag::JPEG_THUMBNAIL_OFFSET, 0),
            fx.long(tag::JPEG_THUMBNAIL_LENGTH, thumbnail.len() as u32),
        ]);
        spec.thumbnail = Some(thumbnail);
        spec
    }
}

struct WrittenDir {
    offset: usize,
    /// Position of each entry's value field, by tag.
    value_fields: Vec<(u16, usize)>,
    next_field: usize,
}

impl WrittenDir {
    fn value_field(&self, tag: u16) -> Option<usize> {
        self.value_fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, pos)| *pos)
    }
}

fn write_dir(buf: &mut Vec<u8>, order: ByteOrder, entries: &[RawEntry]) -> WrittenDir {
    let offset = buf.len();
    buf.extend_from_slice(&order.u16_bytes(entries.len() as u16));

    let mut value_fields = Vec::new();
    let mut deferred = Vec::new();
    for entry in entries {
        buf.extend_from_slice(&order.u16_bytes(entry.tag));
        buf.extend_from_slice(&order.u16_bytes(entry.type_code));
        buf.extend_from_slice(&order.u32_bytes(entry.count));
        let field = buf.len();
        value_fields.push((entry.tag, field));
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            buf.extend_from_slice(&inline);
        } else {
            buf.extend_from_slice(&[0; 4]);
            deferred.push((field, &entry.data));
        }
    }
    let next_field = buf.len();
    buf.extend_from_slice(&[0; 4]);

    for (field, data) in deferred {
        let at = buf.len() as u32;
        buf[field..field + 4].copy_from_slice(&order.u32_bytes(at));
        buf.extend_from_slice(data);
        if buf.len() % 2 == 1 {
            buf.push(0);
        }
    }

    WrittenDir {
        offset,
        value_fields,
        next_field,
    }
}

fn patch(buf: &mut [u8], order: ByteOrder, at: Option<usize>, value: usize) {
    if let Some(at) = at {
        buf[at..at + 4].copy_from_slice(&order.u32_bytes(value as u32));
    }
}

/// Serialize a [`TiffSpec`] into a TIFF block.
pub fn build_tiff(spec: &TiffSpec) -> Vec<u8> {
    let order = spec.order;
    let mut buf = Vec::new();
    buf.extend_from_slice(order.marker());
    buf.extend_from_slice(&order.u16_bytes(42));
    buf.extend_from_slice(&[0; 4]);

    let gps = spec.gps.as_ref().map(|e| write_dir(&mut buf, order, e));
    let exif = spec.exif.as_ref().map(|e| write_dir(&mut buf, order, e));
    let ifd1 = spec.ifd1.as_ref().map(|e| write_dir(&mut buf, order, e));
    let ifd0 = write_dir(&mut buf, order, &spec.ifd0);

    let thumbnail_offset = spec.thumbnail.as_ref().map(|thumb| {
        let at = buf.len();
        buf.extend_from_slice(thumb);
        at
    });

    buf[4..8].copy_from_slice(&order.u32_bytes(ifd0.offset as u32));
    if let Some(gps) = &gps {
        patch(&mut buf, order, ifd0.value_field(tag::GPS_INFO_IFD_POINTER), gps.offset);
    }
    if let Some(exif) = &exif {
        patch(&mut buf, order, ifd0.value_field(tag::EXIF_IFD_POINTER), exif.offset);
    }
    if let Some(ifd1) = &ifd1 {
        patch(&mut buf, order, Some(ifd0.next_field), ifd1.offset);
        if let Some(thumb) = thumbnail_offset {
            patch(&mut buf, order, ifd1.value_field(tag::JPEG_THUMBNAIL_OFFSET), thumb);
        }
    }
    buf
}

/// A length-prefixed marker segment.
pub fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut seg = vec![0xFF, marker];
    seg.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    seg.extend_from_slice(payload);
    seg
}

/// SOI, APP0 (JFIF), optional Exif APP1, DQT, SOS, scan data, EOI.
pub fn jpeg_with(tiff: Option<&[u8]>) -> Vec<u8> {
    let mut file = vec![0xFF, MARKER_SOI];
    file.extend(segment(
        MARKER_APP0,
        &[b'J', b'F', b'I', b'F', 0, 1, 1, 0, 0, 1, 0, 1, 0, 0],
    ));
    if let Some(tiff) = tiff {
        let mut payload = EXIF_HEADER.to_vec();
        payload.extend_from_slice(tiff);
        file.extend(segment(MARKER_APP1, &payload));
    }
    file.extend(segment(0xDB, &[0x00; 65]));
    file.extend(segment(MARKER_SOS, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]));
    file.extend_from_slice(SCAN_DATA);
    file.extend_from_slice(&[0xFF, MARKER_EOI]);
    file
}

pub fn jpeg_without_exif() -> Vec<u8> {
    jpeg_with(None)
}

/// Scenario photo: camera tags plus a 6-entry GPS directory.
pub fn jpeg_with_gps(order: ByteOrder) -> Vec<u8> {
    jpeg_with(Some(&build_tiff(&TiffSpec::with_gps(order))))
}
