use crate::error::{Result, StripError};

use super::decode::{TIFF_HEADER_LEN, TIFF_MAGIC};
use super::ifd::{ExifDocument, Ifd, IfdEntry, ValueType};
use super::tag;

const IFD_ENTRY_LEN: usize = 12;
const NEXT_IFD_PTR_LEN: usize = 4;

/// The directories of a document, in the order they are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ifd0,
    Exif,
    Interop,
    Gps,
    Ifd1,
}

impl Slot {
    /// The directory an offset-valued tag points at.
    fn target_of(tag: u16) -> Option<Self> {
        match tag {
            tag::EXIF_IFD_POINTER => Some(Self::Exif),
            tag::GPS_INFO_IFD_POINTER => Some(Self::Gps),
            tag::INTEROPERABILITY_IFD_POINTER => Some(Self::Interop),
            _ => None,
        }
    }
}

/// Where the 4-byte value field of an entry gets its bytes from.
#[derive(Debug, Clone, Copy)]
enum Value {
    Inline,
    Offset(usize),
}

struct PlacedEntry<'a> {
    entry: &'a IfdEntry,
    value: Value,
    /// Offset of the out-of-line value block, if the entry has one.
    block: Option<usize>,
}

struct PlacedDir<'a> {
    slot: Slot,
    offset: usize,
    entries: Vec<PlacedEntry<'a>>,
}

/// Output of the layout pass: every directory, value block and the
/// thumbnail assigned a final offset.
struct Layout<'a> {
    dirs: Vec<PlacedDir<'a>>,
    thumbnail: Option<usize>,
    len: usize,
}

fn align(offset: usize) -> usize {
    offset + offset % 2
}

impl<'a> Layout<'a> {
    fn offset_of(&self, slot: Slot) -> Option<usize> {
        self.dirs.iter().find(|d| d.slot == slot).map(|d| d.offset)
    }

    fn plan(doc: &'a ExifDocument) -> Result<Self> {
        let slots: [(Slot, Option<&'a Ifd>); 5] = [
            (Slot::Ifd0, Some(&doc.ifd0)),
            (Slot::Exif, doc.exif.as_ref()),
            (Slot::Interop, doc.interop.as_ref()),
            (Slot::Gps, doc.gps.as_ref()),
            (Slot::Ifd1, doc.ifd1.as_ref()),
        ];
        let present = |slot: Slot| slots.iter().any(|(s, ifd)| *s == slot && ifd.is_some());

        // directory tables first, back to back
        let mut cursor = TIFF_HEADER_LEN;
        let mut tables: Vec<(Slot, usize, Vec<&'a IfdEntry>)> = Vec::new();
        for (slot, ifd) in slots {
            let Some(ifd) = ifd else { continue };
            // a pointer whose directory is gone is dropped, not left dangling
            let kept: Vec<&IfdEntry> = ifd
                .iter()
                .filter(|e| Slot::target_of(e.tag).is_none_or(|target| present(target)))
                .collect();
            if kept.len() > u16::MAX as usize {
                return Err(StripError::MalformedIfd(format!(
                    "{slot:?} has {} entries, more than a directory can hold",
                    kept.len()
                )));
            }
            let table_len = 2 + kept.len() * IFD_ENTRY_LEN + NEXT_IFD_PTR_LEN;
            tables.push((slot, cursor, kept));
            cursor += table_len;
        }

        // then out-of-line values in the same order, word aligned
        let mut dirs = Vec::with_capacity(tables.len());
        for (slot, offset, kept) in tables {
            let mut entries = Vec::with_capacity(kept.len());
            for entry in kept {
                let owned_by_layout = Slot::target_of(entry.tag).is_some()
                    || (slot == Slot::Ifd1
                        && entry.tag == tag::JPEG_THUMBNAIL_OFFSET
                        && doc.thumbnail.is_some());
                let block = if entry.fits_inline() || owned_by_layout {
                    None
                } else {
                    cursor = align(cursor);
                    let at = cursor;
                    cursor += entry.data.len();
                    Some(at)
                };
                entries.push(PlacedEntry {
                    entry,
                    value: block.map_or(Value::Inline, Value::Offset),
                    block,
                });
            }
            dirs.push(PlacedDir {
                slot,
                offset,
                entries,
            });
        }

        let thumbnail = doc.thumbnail.as_ref().map(|thumb| {
            cursor = align(cursor);
            let at = cursor;
            cursor += thumb.len();
            at
        });

        if u32::try_from(cursor).is_err() {
            return Err(StripError::MalformedIfd(format!(
                "encoded metadata block of {cursor} bytes is not addressable"
            )));
        }

        let mut layout = Layout {
            dirs,
            thumbnail,
            len: cursor,
        };
        layout.resolve_offsets();
        Ok(layout)
    }

    /// Point sub-directory pointers and the thumbnail offset at their new homes.
    fn resolve_offsets(&mut self) {
        let targets: Vec<(Slot, usize)> = self.dirs.iter().map(|d| (d.slot, d.offset)).collect();
        let thumbnail = self.thumbnail;
        for dir in &mut self.dirs {
            let slot = dir.slot;
            for placed in &mut dir.entries {
                let tag = placed.entry.tag;
                if let Some(target) = Slot::target_of(tag) {
                    if let Some((_, at)) = targets.iter().find(|(s, _)| *s == target) {
                        placed.value = Value::Offset(*at);
                    }
                } else if slot == Slot::Ifd1 && tag == tag::JPEG_THUMBNAIL_OFFSET {
                    if let Some(at) = thumbnail {
                        placed.value = Value::Offset(at);
                    }
                }
            }
        }
    }
}

/// Serialize a document into a TIFF block, recomputing every offset.
///
/// Layout is fixed: header, directory tables (IFD0, Exif, Interop, GPS,
/// IFD1), out-of-line values in the same order, then the thumbnail. Value
/// blocks start on even offsets and padding bytes are zero, so the output
/// depends only on the document.
pub fn encode(doc: &ExifDocument) -> Result<Vec<u8>> {
    let layout = Layout::plan(doc)?;
    let order = doc.byte_order;
    let mut out = vec![0u8; layout.len];

    let mut put = |at: usize, bytes: &[u8]| out[at..at + bytes.len()].copy_from_slice(bytes);

    put(0, &order.marker()[..]);
    put(2, &order.u16_bytes(TIFF_MAGIC));
    put(4, &order.u32_bytes(TIFF_HEADER_LEN as u32));

    let ifd1_offset = layout.offset_of(Slot::Ifd1).unwrap_or(0);
    for dir in &layout.dirs {
        let mut at = dir.offset;
        put(at, &order.u16_bytes(dir.entries.len() as u16));
        at += 2;

        for placed in &dir.entries {
            let entry = placed.entry;
            put(at, &order.u16_bytes(entry.tag));
            put(at + 2, &order.u16_bytes(entry.value_type.code()));
            put(at + 4, &order.u32_bytes(entry.count));
            match placed.value {
                Value::Inline => put(at + 8, &entry.data),
                // SHORT offsets are left-justified in the value field
                Value::Offset(offset) if entry.value_type == ValueType::Short => {
                    put(at + 8, &order.u16_bytes(offset as u16))
                }
                Value::Offset(offset) => put(at + 8, &order.u32_bytes(offset as u32)),
            }
            if let Some(block) = placed.block {
                put(block, &entry.data);
            }
            at += IFD_ENTRY_LEN;
        }

        let next = if dir.slot == Slot::Ifd0 { ifd1_offset } else { 0 };
        put(at, &order.u32_bytes(next as u32));
    }

    if let (Some(thumb), Some(at)) = (&doc.thumbnail, layout.thumbnail) {
        put(at, thumb);
    }

    log::debug!(
        "encoded {} directories into {} bytes",
        layout.dirs.len(),
        layout.len
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::decode::decode;
    use crate::exif::ifd::{ByteOrder, ValueType};
    use crate::exif::test_support::{TiffSpec, build_tiff};

    /// Walk every directory of an encoded block and collect each offset
    /// field: directory pointers, value offsets and next-IFD links.
    fn offset_fields(tiff: &[u8]) -> Vec<(usize, usize)> {
        let order = ByteOrder::from_marker(&tiff[0..2]).unwrap();
        let mut found = Vec::new();
        let mut queue = vec![order.read_u32(tiff, 4) as usize];
        while let Some(dir) = queue.pop() {
            let count = order.read_u16(tiff, dir) as usize;
            for i in 0..count {
                let at = dir + 2 + i * 12;
                let tag = order.read_u16(tiff, at);
                let vt = ValueType::from_code(order.read_u16(tiff, at + 2)).unwrap();
                let len = vt.size() * order.read_u32(tiff, at + 4) as usize;
                let value = order.read_u32(tiff, at + 8) as usize;
                if tag::is_pointer(tag) {
                    found.push((value, 2));
                    queue.push(value);
                } else if len > 4 {
                    found.push((value, len));
                }
            }
            let next = order.read_u32(tiff, dir + 2 + count * 12) as usize;
            if next != 0 {
                found.push((next, 2));
                queue.push(next);
            }
        }
        found
    }

    #[test]
    fn round_trip_reproduces_document() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let doc = decode(&build_tiff(&TiffSpec::full(order))).unwrap();
            let encoded = encode(&doc).unwrap();
            assert_eq!(decode(&encoded).unwrap(), doc);
        }
    }

    #[test]
    fn encoding_is_deterministic_and_stable() {
        let doc = decode(&build_tiff(&TiffSpec::full(ByteOrder::Little))).unwrap();
        let first = encode(&doc).unwrap();
        assert_eq!(encode(&doc).unwrap(), first);

        // re-encoding our own output is a fixed point
        let again = encode(&decode(&first).unwrap()).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn every_offset_resolves_inside_output() {
        let doc = decode(&build_tiff(&TiffSpec::full(ByteOrder::Big))).unwrap();
        let encoded = encode(&doc).unwrap();
        let fields = offset_fields(&encoded);
        assert!(!fields.is_empty());
        for (offset, len) in fields {
            assert!(offset >= 8, "offset {offset} inside header");
            assert!(offset + len <= encoded.len(), "offset {offset}+{len} out of bounds");
            assert_eq!(offset % 2, 0, "offset {offset} is not word aligned");
        }
    }

    #[test]
    fn lays_out_ifd0_first_and_links_ifd1() {
        let doc = decode(&build_tiff(&TiffSpec::full(ByteOrder::Little))).unwrap();
        let encoded = encode(&doc).unwrap();
        let order = ByteOrder::Little;

        assert_eq!(&encoded[0..4], b"II\x2a\x00");
        assert_eq!(order.read_u32(&encoded, 4), 8);

        let count = order.read_u16(&encoded, 8) as usize;
        assert_eq!(count, doc.ifd0.len());
        let next = order.read_u32(&encoded, 8 + 2 + count * 12) as usize;
        assert_ne!(next, 0);
        assert_eq!(order.read_u16(&encoded, next) as usize, doc.ifd1.as_ref().unwrap().len());
    }

    #[test]
    fn relocates_thumbnail() {
        let spec = TiffSpec::full(ByteOrder::Little);
        let doc = decode(&build_tiff(&spec)).unwrap();
        let encoded = encode(&doc).unwrap();
        let thumb = spec.thumbnail.unwrap();
        assert!(encoded.ends_with(&thumb));
        assert_eq!(decode(&encoded).unwrap().thumbnail, Some(thumb));
    }

    #[test]
    fn dangling_pointer_is_omitted() {
        let mut doc = decode(&build_tiff(&TiffSpec::with_gps(ByteOrder::Little))).unwrap();
        doc.gps = None;
        let encoded = encode(&doc).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert!(!decoded.ifd0.contains(tag::GPS_INFO_IFD_POINTER));
        assert_eq!(decoded.ifd0.len(), 3);
    }

    #[test]
    fn empty_document() {
        let doc = ExifDocument::new(ByteOrder::Big);
        let encoded = encode(&doc).unwrap();
        assert_eq!(encoded, b"MM\x00\x2a\x00\x00\x00\x08\x00\x00\x00\x00\x00\x00");
        assert_eq!(decode(&encoded).unwrap(), doc);
    }
}
