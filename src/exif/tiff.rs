use anyhow::{Context, Result, bail};

// IFD0 tags
pub const TAG_DATE_TIME: u16 = 0x0132;
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;

// ExifIFD tags
pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const TAG_DATE_TIME_DIGITIZED: u16 = 0x9004;
pub const TAG_OFFSET_TIME_ORIGINAL: u16 = 0x9011;
pub const TAG_OFFSET_TIME_DIGITIZED: u16 = 0x9012;

// TIFF data formats
const FORMAT_ASCII: u16 = 2;
const FORMAT_LONG: u16 = 4;
const FORMAT_IFD: u16 = 13;

const ENTRY_SIZE: usize = 12;

/// Largest TIFF payload that fits one JPEG APP1 segment:
/// 65535 minus the 2 length bytes and the 6-byte `Exif\0\0` header.
pub const MAX_EXIF_PAYLOAD: usize = 65_527;

/// Byte order declared in the TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `II` (Intel)
    LittleEndian,
    /// `MM` (Motorola)
    BigEndian,
}

impl ByteOrder {
    fn read_u16(self, data: &[u8], offset: usize) -> Result<u16> {
        let bytes: [u8; 2] = data
            .get(offset..offset + 2)
            .and_then(|b| b.try_into().ok())
            .context("TIFF data truncated")?;
        Ok(match self {
            Self::LittleEndian => u16::from_le_bytes(bytes),
            Self::BigEndian => u16::from_be_bytes(bytes),
        })
    }

    fn read_u32(self, data: &[u8], offset: usize) -> Result<u32> {
        let bytes: [u8; 4] = data
            .get(offset..offset + 4)
            .and_then(|b| b.try_into().ok())
            .context("TIFF data truncated")?;
        Ok(match self {
            Self::LittleEndian => u32::from_le_bytes(bytes),
            Self::BigEndian => u32::from_be_bytes(bytes),
        })
    }

    pub fn encode_u16(self, val: u16) -> [u8; 2] {
        match self {
            Self::LittleEndian => val.to_le_bytes(),
            Self::BigEndian => val.to_be_bytes(),
        }
    }

    pub fn encode_u32(self, val: u32) -> [u8; 4] {
        match self {
            Self::LittleEndian => val.to_le_bytes(),
            Self::BigEndian => val.to_be_bytes(),
        }
    }

    /// The 4-byte TIFF header prefix for this byte order.
    pub fn header(self) -> &'static [u8; 4] {
        match self {
            Self::LittleEndian => b"II*\0",
            Self::BigEndian => b"MM\0*",
        }
    }
}

/// The two field groups this codec can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfdGroup {
    /// IFD0, the "0th" / primary image directory.
    Primary,
    /// The Exif sub-IFD referenced from IFD0 tag 0x8769.
    Exif,
}

/// A raw 12-byte IFD entry. `value` holds either the inline value
/// (when it fits in 4 bytes) or an offset into the TIFF data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IfdEntry {
    tag: u16,
    format: u16,
    count: u32,
    value: [u8; 4],
}

#[derive(Debug, Clone)]
struct Ifd {
    offset: usize,
    parsed_len: usize,
    entries: Vec<IfdEntry>,
    next: u32,
    dirty: bool,
}

impl Ifd {
    fn parse(data: &[u8], order: ByteOrder, offset: usize) -> Result<Self> {
        let count = order
            .read_u16(data, offset)
            .context("IFD offset out of bounds")? as usize;
        let start = offset + 2;
        let end = start + count * ENTRY_SIZE;
        if end + 4 > data.len() {
            bail!("IFD entries extend beyond TIFF data");
        }

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let eo = start + i * ENTRY_SIZE;
            let mut value = [0u8; 4];
            value.copy_from_slice(&data[eo + 8..eo + 12]);
            entries.push(IfdEntry {
                tag: order.read_u16(data, eo)?,
                format: order.read_u16(data, eo + 2)?,
                count: order.read_u32(data, eo + 4)?,
                value,
            });
        }
        let next = order.read_u32(data, end)?;

        Ok(Self {
            offset,
            parsed_len: count,
            entries,
            next,
            dirty: false,
        })
    }

    fn find(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Replace the entry with the same tag, or insert it in ascending tag order.
    fn upsert(&mut self, entry: IfdEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.tag == entry.tag) {
            *existing = entry;
        } else {
            let pos = self
                .entries
                .iter()
                .position(|e| e.tag > entry.tag)
                .unwrap_or(self.entries.len());
            self.entries.insert(pos, entry);
        }
        self.dirty = true;
    }

    fn byte_len(&self) -> usize {
        2 + self.entries.len() * ENTRY_SIZE + 4
    }

    fn write(&self, data: &mut [u8], order: ByteOrder, offset: usize) {
        data[offset..offset + 2].copy_from_slice(&order.encode_u16(self.entries.len() as u16));
        for (i, entry) in self.entries.iter().enumerate() {
            let eo = offset + 2 + i * ENTRY_SIZE;
            data[eo..eo + 2].copy_from_slice(&order.encode_u16(entry.tag));
            data[eo + 2..eo + 4].copy_from_slice(&order.encode_u16(entry.format));
            data[eo + 4..eo + 8].copy_from_slice(&order.encode_u32(entry.count));
            data[eo + 8..eo + 12].copy_from_slice(&entry.value);
        }
        let end = offset + 2 + self.entries.len() * ENTRY_SIZE;
        data[end..end + 4].copy_from_slice(&order.encode_u32(self.next));
    }
}

/// The TIFF structure carried inside a JPEG `Exif\0\0` APP1 segment.
///
/// Only IFD0 and the Exif sub-IFD are decoded. Everything else (IFD1 and its
/// thumbnail, GPS and interop directories, maker notes) stays as opaque bytes
/// at its original offset: values are only ever overwritten in place or
/// appended, never moved.
#[derive(Debug, Clone)]
pub struct TiffBlock {
    data: Vec<u8>,
    order: ByteOrder,
    ifd0: Ifd,
    exif: Option<Ifd>,
}

impl TiffBlock {
    /// Decode a TIFF block (the bytes following `Exif\0\0`).
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.len() < 8 {
            bail!("TIFF data too short");
        }

        let order = match &data[0..4] {
            b"II*\0" => ByteOrder::LittleEndian,
            b"MM\0*" => ByteOrder::BigEndian,
            _ => bail!("Invalid TIFF header"),
        };

        let ifd0_offset = order.read_u32(&data, 4)? as usize;
        let ifd0 = Ifd::parse(&data, order, ifd0_offset).context("Failed to parse IFD0")?;

        let exif = match ifd0.find(TAG_EXIF_IFD_POINTER) {
            Some(pointer) => {
                if pointer.format != FORMAT_LONG && pointer.format != FORMAT_IFD {
                    bail!("ExifIFD pointer has unexpected format {}", pointer.format);
                }
                let offset = order.read_u32(&pointer.value, 0)? as usize;
                Some(Ifd::parse(&data, order, offset).context("Failed to parse ExifIFD")?)
            }
            None => None,
        };

        log::debug!(
            "TIFF block: {:?}, {} IFD0 entries, {} ExifIFD entries",
            order,
            ifd0.entries.len(),
            exif.as_ref().map_or(0, |ifd| ifd.entries.len())
        );

        Ok(Self {
            data,
            order,
            ifd0,
            exif,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn has_exif_ifd(&self) -> bool {
        self.exif.is_some()
    }

    fn ifd(&self, group: IfdGroup) -> Option<&Ifd> {
        match group {
            IfdGroup::Primary => Some(&self.ifd0),
            IfdGroup::Exif => self.exif.as_ref(),
        }
    }

    fn ifd_mut(&mut self, group: IfdGroup) -> Result<&mut Ifd> {
        match group {
            IfdGroup::Primary => Ok(&mut self.ifd0),
            IfdGroup::Exif => self.exif.as_mut().context("EXIF block has no ExifIFD"),
        }
    }

    fn value_bytes<'a>(&'a self, entry: &'a IfdEntry) -> Result<&'a [u8]> {
        let len = entry.count as usize;
        if len <= 4 {
            return Ok(&entry.value[..len]);
        }
        let offset = self.order.read_u32(&entry.value, 0)? as usize;
        self.data
            .get(offset..offset + len)
            .with_context(|| format!("Value of tag 0x{:04X} out of bounds", entry.tag))
    }

    /// Read an ASCII field. Returns `None` when the tag (or its group) is absent.
    pub fn ascii(&self, group: IfdGroup, tag: u16) -> Result<Option<String>> {
        let Some(entry) = self.ifd(group).and_then(|ifd| ifd.find(tag)) else {
            return Ok(None);
        };
        if entry.format != FORMAT_ASCII {
            bail!("Tag 0x{tag:04X} is not an ASCII field (format {})", entry.format);
        }

        let bytes = self.value_bytes(entry)?;
        let text = std::str::from_utf8(bytes)
            .with_context(|| format!("Tag 0x{tag:04X} does not contain valid text"))?;
        Ok(Some(text.trim_end_matches('\0').to_string()))
    }

    /// Write an ASCII field, creating the tag if needed.
    pub fn set_ascii(&mut self, group: IfdGroup, tag: u16, text: &str) -> Result<()> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        let count = u32::try_from(bytes.len()).context("ASCII value too long")?;

        let order = self.order;
        let existing = self.ifd_mut(group)?.find(tag).copied();

        let mut value = [0u8; 4];
        if bytes.len() <= 4 {
            value[..bytes.len()].copy_from_slice(&bytes);
        } else {
            match existing {
                Some(entry) if entry.format == FORMAT_ASCII && entry.count == count => {
                    let offset = order.read_u32(&entry.value, 0)? as usize;
                    self.data
                        .get_mut(offset..offset + bytes.len())
                        .with_context(|| format!("Value of tag 0x{tag:04X} out of bounds"))?
                        .copy_from_slice(&bytes);
                    value = entry.value;
                }
                _ => {
                    let offset = self.append(&bytes)?;
                    value = order.encode_u32(offset);
                }
            }
        }

        self.ifd_mut(group)?.upsert(IfdEntry {
            tag,
            format: FORMAT_ASCII,
            count,
            value,
        });
        Ok(())
    }

    /// Append value data at the end of the block (word aligned).
    fn append(&mut self, bytes: &[u8]) -> Result<u32> {
        if self.data.len() % 2 == 1 {
            self.data.push(0);
        }
        let offset = u32::try_from(self.data.len()).context("TIFF data too large")?;
        self.data.extend_from_slice(bytes);
        Ok(offset)
    }

    /// Re-encode the block.
    ///
    /// An IFD whose entry count is unchanged is rewritten where it was. A
    /// grown IFD is rebuilt at the end of the block and the pointer to it
    /// (TIFF header for IFD0, tag 0x8769 for the ExifIFD) is updated.
    pub fn encode(mut self) -> Result<Vec<u8>> {
        let order = self.order;

        if let Some(exif) = self.exif.take() {
            if exif.dirty {
                let offset = reserve(&mut self.data, &exif);
                exif.write(&mut self.data, order, offset);
                if offset != exif.offset {
                    let pointer = self
                        .ifd0
                        .entries
                        .iter_mut()
                        .find(|e| e.tag == TAG_EXIF_IFD_POINTER)
                        .context("ExifIFD pointer missing from IFD0")?;
                    pointer.value = order.encode_u32(to_offset(offset)?);
                    self.ifd0.dirty = true;
                }
            }
        }

        if self.ifd0.dirty {
            let offset = reserve(&mut self.data, &self.ifd0);
            self.ifd0.write(&mut self.data, order, offset);
            if offset != self.ifd0.offset {
                self.data[4..8].copy_from_slice(&order.encode_u32(to_offset(offset)?));
            }
        }

        if self.data.len() > MAX_EXIF_PAYLOAD {
            bail!(
                "EXIF block of {} bytes does not fit in a JPEG APP1 segment",
                self.data.len()
            );
        }

        Ok(self.data)
    }
}

/// Pick where an IFD is written: its original location if the entry count is
/// unchanged, otherwise fresh space at the end of the data.
fn reserve(data: &mut Vec<u8>, ifd: &Ifd) -> usize {
    if ifd.entries.len() == ifd.parsed_len {
        return ifd.offset;
    }
    if data.len() % 2 == 1 {
        data.push(0);
    }
    let offset = data.len();
    data.resize(offset + ifd.byte_len(), 0);
    offset
}

fn to_offset(offset: usize) -> Result<u32> {
    u32::try_from(offset).context("TIFF offset exceeds 32 bits")
}
