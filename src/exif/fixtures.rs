//! Test fixtures: hand-built TIFF blocks and real JPEGs carrying them.

use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use super::tiff::{
    ByteOrder, TAG_DATE_TIME, TAG_DATE_TIME_DIGITIZED, TAG_DATE_TIME_ORIGINAL,
    TAG_EXIF_IFD_POINTER,
};

const FORMAT_ASCII: u16 = 2;
const FORMAT_LONG: u16 = 4;

/// `None` marks the ExifIFD pointer entry.
type RawEntry = (u16, Option<Vec<u8>>);

fn ascii(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn ifd_len(entries: usize) -> usize {
    2 + entries * 12 + 4
}

/// Build a TIFF block with ASCII entries in IFD0 and, if given, an ExifIFD.
pub(crate) fn tiff(
    order: ByteOrder,
    primary: &[(u16, &str)],
    exif: Option<&[(u16, &str)]>,
) -> Vec<u8> {
    let mut ifd0: Vec<RawEntry> = primary.iter().map(|&(t, v)| (t, Some(ascii(v)))).collect();
    if exif.is_some() {
        ifd0.push((TAG_EXIF_IFD_POINTER, None));
    }
    ifd0.sort_by_key(|(tag, _)| *tag);

    let mut exif_entries: Vec<RawEntry> = exif
        .unwrap_or(&[])
        .iter()
        .map(|&(t, v)| (t, Some(ascii(v))))
        .collect();
    exif_entries.sort_by_key(|(tag, _)| *tag);

    let ifd0_offset = 8;
    let exif_offset = ifd0_offset + ifd_len(ifd0.len());
    let mut data_offset = exif_offset;
    if exif.is_some() {
        data_offset += ifd_len(exif_entries.len());
    }

    let mut out = Vec::new();
    out.extend_from_slice(order.header());
    out.extend_from_slice(&order.encode_u32(ifd0_offset as u32));

    let mut blobs = Vec::new();
    write_ifd(&mut out, &mut blobs, &mut data_offset, order, &ifd0, exif_offset);
    if exif.is_some() {
        write_ifd(&mut out, &mut blobs, &mut data_offset, order, &exif_entries, 0);
    }
    out.extend_from_slice(&blobs);
    out
}

fn write_ifd(
    out: &mut Vec<u8>,
    blobs: &mut Vec<u8>,
    data_offset: &mut usize,
    order: ByteOrder,
    entries: &[RawEntry],
    exif_offset: usize,
) {
    out.extend_from_slice(&order.encode_u16(entries.len() as u16));
    for (tag, data) in entries {
        out.extend_from_slice(&order.encode_u16(*tag));
        match data {
            None => {
                out.extend_from_slice(&order.encode_u16(FORMAT_LONG));
                out.extend_from_slice(&order.encode_u32(1));
                out.extend_from_slice(&order.encode_u32(exif_offset as u32));
            }
            Some(bytes) => {
                out.extend_from_slice(&order.encode_u16(FORMAT_ASCII));
                out.extend_from_slice(&order.encode_u32(bytes.len() as u32));
                if bytes.len() <= 4 {
                    let mut inline = [0u8; 4];
                    inline[..bytes.len()].copy_from_slice(bytes);
                    out.extend_from_slice(&inline);
                } else {
                    out.extend_from_slice(&order.encode_u32(*data_offset as u32));
                    blobs.extend_from_slice(bytes);
                    *data_offset += bytes.len();
                    if bytes.len() % 2 == 1 {
                        blobs.push(0);
                        *data_offset += 1;
                    }
                }
            }
        }
    }
    out.extend_from_slice(&order.encode_u32(0));
}

/// A small baseline JPEG without any EXIF segment.
pub(crate) fn plain_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(16, 16, |x, y| {
        image::Rgb([(x * 16) as u8, (y * 16) as u8, 128])
    });
    let mut cursor = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Jpeg)
        .unwrap();
    cursor.into_inner()
}

/// A JPEG whose EXIF segment holds the given TIFF block.
pub(crate) fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(plain_jpeg())).unwrap();
    jpeg.set_exif(Some(Bytes::copy_from_slice(tiff)));
    jpeg.encoder().bytes().to_vec()
}

/// A JPEG as a camera writes it: all three date fields set to the same value.
pub(crate) fn camera_jpeg(order: ByteOrder, timestamp: &str) -> Vec<u8> {
    jpeg_with_exif(&tiff(
        order,
        &[(0x010F, "FixtureCam"), (TAG_DATE_TIME, timestamp)],
        Some(&[
            (TAG_DATE_TIME_ORIGINAL, timestamp),
            (TAG_DATE_TIME_DIGITIZED, timestamp),
        ]),
    ))
}
