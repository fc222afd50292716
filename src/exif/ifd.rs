use crate::error::{Result, StripError};

/// Byte order declared by the `II`/`MM` marker of a TIFF header.
///
/// Governs every multi-byte field inside the metadata block, including the
/// raw value bytes kept in [`IfdEntry::data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn from_marker(marker: &[u8]) -> Option<Self> {
        match marker {
            b"II" => Some(Self::Little),
            b"MM" => Some(Self::Big),
            _ => None,
        }
    }

    pub fn marker(self) -> &'static [u8; 2] {
        match self {
            Self::Little => b"II",
            Self::Big => b"MM",
        }
    }

    /// Caller guarantees `offset + 2 <= data.len()`.
    pub fn read_u16(self, data: &[u8], offset: usize) -> u16 {
        let raw = [data[offset], data[offset + 1]];
        match self {
            Self::Little => u16::from_le_bytes(raw),
            Self::Big => u16::from_be_bytes(raw),
        }
    }

    /// Caller guarantees `offset + 4 <= data.len()`.
    pub fn read_u32(self, data: &[u8], offset: usize) -> u32 {
        let raw = [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ];
        match self {
            Self::Little => u32::from_le_bytes(raw),
            Self::Big => u32::from_be_bytes(raw),
        }
    }

    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }

    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }
}

/// TIFF field types, TIFF 6.0 plus the `IFD` type used by some writers for
/// sub-directory pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SignedByte,
    Undefined,
    SignedShort,
    SignedLong,
    SignedRational,
    Float,
    Double,
    Ifd,
}

impl ValueType {
    pub fn from_code(code: u16) -> Option<Self> {
        use ValueType::*;
        Some(match code {
            1 => Byte,
            2 => Ascii,
            3 => Short,
            4 => Long,
            5 => Rational,
            6 => SignedByte,
            7 => Undefined,
            8 => SignedShort,
            9 => SignedLong,
            10 => SignedRational,
            11 => Float,
            12 => Double,
            13 => Self::Ifd,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        use ValueType::*;
        match self {
            Byte => 1,
            Ascii => 2,
            Short => 3,
            Long => 4,
            Rational => 5,
            SignedByte => 6,
            Undefined => 7,
            SignedShort => 8,
            SignedLong => 9,
            SignedRational => 10,
            Float => 11,
            Double => 12,
            Self::Ifd => 13,
        }
    }

    /// Size in bytes of one element.
    pub fn size(self) -> usize {
        use ValueType::*;
        match self {
            Byte | Ascii | SignedByte | Undefined => 1,
            Short | SignedShort => 2,
            Long | SignedLong | Float | Self::Ifd => 4,
            Rational | SignedRational | Double => 8,
        }
    }
}

/// A single tag/value pair.
///
/// `data` holds exactly `count * value_type.size()` bytes in the document's
/// byte order, whether the value was stored inline or out of line. For
/// entries whose value is an offset into the metadata block (sub-directory
/// pointers, the thumbnail offset) the decoder stores zeros and the encoder
/// fills in the offset of the new layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub value_type: ValueType,
    pub count: u32,
    pub data: Vec<u8>,
}

impl IfdEntry {
    pub fn new(tag: u16, value_type: ValueType, count: u32, data: Vec<u8>) -> Self {
        Self {
            tag,
            value_type,
            count,
            data,
        }
    }

    /// Placeholder entry for an offset-valued tag.
    pub fn offset_placeholder(tag: u16) -> Self {
        Self::new(tag, ValueType::Long, 1, vec![0; 4])
    }

    pub fn fits_inline(&self) -> bool {
        self.data.len() <= 4
    }
}

/// Image File Directory: an ordered set of entries, unique by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ifd {
    entries: Vec<IfdEntry>,
}

impl Ifd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, rejecting a tag that is already present.
    pub fn push(&mut self, entry: IfdEntry) -> Result<()> {
        if self.contains(entry.tag) {
            return Err(StripError::MalformedIfd(format!(
                "duplicate tag 0x{:04x} in directory",
                entry.tag
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub fn get_mut(&mut self, tag: u16) -> Option<&mut IfdEntry> {
        self.entries.iter_mut().find(|e| e.tag == tag)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.get(tag).is_some()
    }

    pub fn remove(&mut self, tag: u16) -> Option<IfdEntry> {
        let pos = self.entries.iter().position(|e| e.tag == tag)?;
        Some(self.entries.remove(pos))
    }

    pub fn entries(&self) -> &[IfdEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &IfdEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<IfdEntry> for Ifd {
    /// Later duplicates are dropped; use [`Ifd::push`] to reject them instead.
    fn from_iter<I: IntoIterator<Item = IfdEntry>>(iter: I) -> Self {
        let mut ifd = Ifd::new();
        for entry in iter {
            if !ifd.contains(entry.tag) {
                ifd.entries.push(entry);
            }
        }
        ifd
    }
}

/// The whole parsed metadata tree of one Exif block.
///
/// `gps` is present exactly when `ifd0` carries the GPS pointer tag; the
/// same holds for `exif` and `interop` with their pointer tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExifDocument {
    pub byte_order: ByteOrder,
    pub ifd0: Ifd,
    pub exif: Option<Ifd>,
    pub gps: Option<Ifd>,
    pub interop: Option<Ifd>,
    pub ifd1: Option<Ifd>,
    /// JPEG thumbnail referenced from IFD1.
    pub thumbnail: Option<Vec<u8>>,
}

impl ExifDocument {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            ifd0: Ifd::new(),
            exif: None,
            gps: None,
            interop: None,
            ifd1: None,
            thumbnail: None,
        }
    }

    pub fn has_gps(&self) -> bool {
        self.gps.is_some()
    }
}
