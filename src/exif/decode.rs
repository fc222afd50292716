use crate::error::{Result, StripError};

use super::ifd::{ByteOrder, ExifDocument, Ifd, IfdEntry, ValueType};
use super::tag;

pub const TIFF_MAGIC: u16 = 42;
pub const TIFF_HEADER_LEN: usize = 8;
const IFD_ENTRY_LEN: usize = 12;

/// A directory as read from disk, with its raw sub-directory pointers.
struct RawIfd {
    ifd: Ifd,
    next: u32,
    pointers: Vec<(u16, u32)>,
}

impl RawIfd {
    fn pointer(&self, tag: u16) -> Option<u32> {
        self.pointers
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, offset)| *offset)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    order: ByteOrder,
    visited: Vec<usize>,
}

fn malformed(msg: impl Into<String>) -> StripError {
    StripError::MalformedIfd(msg.into())
}

impl<'a> Reader<'a> {
    fn bytes(&self, offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or_else(|| {
                malformed(format!(
                    "{what}: {len} bytes at offset {offset} run past the {}-byte payload",
                    self.data.len()
                ))
            })
    }

    fn read_ifd(&mut self, offset: u32, name: &str) -> Result<RawIfd> {
        let offset = offset as usize;
        if offset < TIFF_HEADER_LEN {
            return Err(malformed(format!(
                "{name} offset {offset} points into the TIFF header"
            )));
        }
        if self.visited.contains(&offset) {
            return Err(malformed(format!(
                "{name} at offset {offset} is referenced more than once"
            )));
        }
        self.visited.push(offset);

        let count = self.order.read_u16(self.bytes(offset, 2, name)?, 0) as usize;
        let table = self.bytes(offset + 2, count * IFD_ENTRY_LEN + 4, name)?;
        log::debug!("{name} at offset {offset}: {count} entries");

        let mut ifd = Ifd::new();
        let mut pointers = Vec::new();
        for record in table[..count * IFD_ENTRY_LEN].chunks_exact(IFD_ENTRY_LEN) {
            let tag = self.order.read_u16(record, 0);
            let code = self.order.read_u16(record, 2);
            let count = self.order.read_u32(record, 4);
            let value_type = ValueType::from_code(code).ok_or_else(|| {
                malformed(format!("{name}: tag 0x{tag:04x} has unknown type {code}"))
            })?;

            if tag::is_pointer(tag) {
                if count != 1 || !matches!(value_type, ValueType::Long | ValueType::Ifd) {
                    return Err(malformed(format!(
                        "{name}: pointer tag 0x{tag:04x} is not a single LONG"
                    )));
                }
                pointers.push((tag, self.order.read_u32(record, 8)));
                ifd.push(IfdEntry::new(tag, value_type, 1, vec![0; 4]))?;
                continue;
            }

            let size = (count as usize)
                .checked_mul(value_type.size())
                .ok_or_else(|| malformed(format!("{name}: tag 0x{tag:04x} count overflows")))?;
            let data = if size <= 4 {
                record[8..8 + size].to_vec()
            } else {
                let at = self.order.read_u32(record, 8) as usize;
                self.bytes(at, size, &format!("{name} tag 0x{tag:04x}"))?
                    .to_vec()
            };
            ifd.push(IfdEntry::new(tag, value_type, count, data))?;
        }

        let next = self.order.read_u32(table, count * IFD_ENTRY_LEN);
        Ok(RawIfd {
            ifd,
            next,
            pointers,
        })
    }

    /// Decode the sub-directory `parent` points to with `tag`, if any.
    fn follow(&mut self, parent: &RawIfd, tag: u16, name: &str) -> Result<Option<RawIfd>> {
        let Some(offset) = parent.pointer(tag) else {
            return Ok(None);
        };
        let sub = self.read_ifd(offset, name)?;
        if sub.next != 0 {
            log::debug!("{name} has a next-IFD offset {}, ignoring it", sub.next);
        }
        Ok(Some(sub))
    }

    /// Lift the JPEG thumbnail IFD1 points at out of the block.
    fn take_thumbnail(&self, ifd1: &mut Ifd) -> Result<Option<Vec<u8>>> {
        let Some(offset_entry) = ifd1.get(tag::JPEG_THUMBNAIL_OFFSET) else {
            return Ok(None);
        };
        let offset = self.single_u32(offset_entry)?;
        let length = ifd1
            .get(tag::JPEG_THUMBNAIL_LENGTH)
            .ok_or_else(|| malformed("IFD1 has a thumbnail offset but no thumbnail length"))
            .and_then(|e| self.single_u32(e))?;

        let thumbnail = self
            .bytes(offset as usize, length as usize, "IFD1 thumbnail")?
            .to_vec();
        if let Some(entry) = ifd1.get_mut(tag::JPEG_THUMBNAIL_OFFSET) {
            entry.data = vec![0; entry.data.len()];
        }
        Ok(Some(thumbnail))
    }

    fn single_u32(&self, entry: &IfdEntry) -> Result<u32> {
        match (entry.value_type, entry.count) {
            (ValueType::Short, 1) => Ok(self.order.read_u16(&entry.data, 0) as u32),
            (ValueType::Long, 1) => Ok(self.order.read_u32(&entry.data, 0)),
            _ => Err(malformed(format!(
                "tag 0x{:04x} should hold a single SHORT or LONG",
                entry.tag
            ))),
        }
    }
}

/// Parse the TIFF block of an Exif segment (the bytes after `Exif\0\0`).
///
/// Follows the Exif, GPS and Interop pointers of IFD0 (Interop is also
/// looked up in the Exif sub-IFD, where cameras put it) and the IFD0 → IFD1
/// link. Any offset outside `tiff` is a [`StripError::MalformedIfd`].
pub fn decode(tiff: &[u8]) -> Result<ExifDocument> {
    if tiff.len() < TIFF_HEADER_LEN {
        return Err(malformed(format!(
            "TIFF header needs {TIFF_HEADER_LEN} bytes, payload has {}",
            tiff.len()
        )));
    }

    let order = ByteOrder::from_marker(&tiff[0..2]).ok_or_else(|| {
        StripError::UnsupportedVariant(format!("invalid TIFF byte order {:02x?}", &tiff[0..2]))
    })?;
    let magic = order.read_u16(tiff, 2);
    if magic != TIFF_MAGIC {
        return Err(StripError::UnsupportedVariant(format!(
            "TIFF version {magic}, expected {TIFF_MAGIC}"
        )));
    }

    let mut reader = Reader {
        data: tiff,
        order,
        visited: Vec::new(),
    };

    let ifd0 = reader.read_ifd(order.read_u32(tiff, 4), "IFD0")?;
    let exif = reader.follow(&ifd0, tag::EXIF_IFD_POINTER, "Exif IFD")?;
    let gps = reader.follow(&ifd0, tag::GPS_INFO_IFD_POINTER, "GPS IFD")?;
    let interop = match reader.follow(&ifd0, tag::INTEROPERABILITY_IFD_POINTER, "Interop IFD")? {
        Some(interop) => Some(interop),
        None => match &exif {
            Some(exif) => {
                reader.follow(exif, tag::INTEROPERABILITY_IFD_POINTER, "Interop IFD")?
            }
            None => None,
        },
    };

    let mut doc = ExifDocument::new(order);
    if ifd0.next != 0 {
        let ifd1 = reader.read_ifd(ifd0.next, "IFD1")?;
        if ifd1.next != 0 {
            log::debug!("IFD1 links to a further directory at {}, ignoring it", ifd1.next);
        }
        let mut ifd1 = ifd1.ifd;
        doc.thumbnail = reader.take_thumbnail(&mut ifd1)?;
        doc.ifd1 = Some(ifd1);
    }

    doc.ifd0 = ifd0.ifd;
    doc.exif = exif.map(|raw| raw.ifd);
    doc.gps = gps.map(|raw| raw.ifd);
    doc.interop = interop.map(|raw| raw.ifd);
    Ok(doc)
}
