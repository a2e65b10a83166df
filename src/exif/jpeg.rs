use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment};
use std::path::Path;

const APP1: u8 = 0xE1;
const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Read and parse a JPEG file, keeping every segment as-is.
pub fn read_jpeg(path: &Path) -> Result<Jpeg> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;
    Jpeg::from_bytes(Bytes::from(file_bytes)).map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))
}

/// Encode the JPEG and overwrite the file in place.
pub fn write_jpeg(path: &Path, jpeg: Jpeg) -> Result<()> {
    let output = jpeg.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write JPEG file")?;
    Ok(())
}

/// Find the position of the EXIF APP1 segment.
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// The TIFF block of the EXIF segment (everything after `Exif\0\0`).
pub fn exif_payload(jpeg: &Jpeg) -> Option<Bytes> {
    let pos = find_exif_segment_pos(jpeg)?;
    Some(jpeg.segments()[pos].contents().slice(EXIF_PREFIX.len()..))
}

/// Replace the EXIF segment with a new TIFF block, keeping its position.
/// Without an existing segment the new one goes right after APP0.
pub fn replace_exif_payload(jpeg: &mut Jpeg, payload: &[u8]) {
    let mut contents = Vec::with_capacity(EXIF_PREFIX.len() + payload.len());
    contents.extend_from_slice(EXIF_PREFIX);
    contents.extend_from_slice(payload);
    let segment = JpegSegment::new_with_contents(APP1, Bytes::from(contents));

    match find_exif_segment_pos(jpeg) {
        Some(pos) => jpeg.segments_mut()[pos] = segment,
        None => {
            let segments = jpeg.segments_mut();
            let pos = segments.len().min(1);
            segments.insert(pos, segment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::fixtures;
    use crate::exif::tiff::ByteOrder;
    use img_parts::ImageEXIF;
    use tempfile::TempDir;

    fn parse(bytes: Vec<u8>) -> Jpeg {
        Jpeg::from_bytes(Bytes::from(bytes)).unwrap()
    }

    #[test]
    fn payload_of_plain_jpeg_is_none() {
        assert!(exif_payload(&parse(fixtures::plain_jpeg())).is_none());
    }

    #[test]
    fn payload_strips_exif_prefix() {
        let tiff = fixtures::tiff(ByteOrder::LittleEndian, &[(0x010F, "FixtureCam")], None);
        let jpeg = parse(fixtures::jpeg_with_exif(&tiff));
        assert_eq!(exif_payload(&jpeg).unwrap().as_ref(), tiff.as_slice());
    }

    #[test]
    fn replace_keeps_segment_position() {
        let tiff = fixtures::tiff(ByteOrder::BigEndian, &[(0x010F, "FixtureCam")], None);
        let mut jpeg = parse(fixtures::jpeg_with_exif(&tiff));
        let before = find_exif_segment_pos(&jpeg).unwrap();
        let count = jpeg.segments().len();

        let replacement = fixtures::tiff(ByteOrder::BigEndian, &[(0x010F, "OtherCam")], None);
        replace_exif_payload(&mut jpeg, &replacement);

        assert_eq!(find_exif_segment_pos(&jpeg), Some(before));
        assert_eq!(jpeg.segments().len(), count);
        assert_eq!(jpeg.exif().unwrap().as_ref(), replacement.as_slice());
    }

    #[test]
    fn replace_inserts_when_missing() {
        let mut jpeg = parse(fixtures::plain_jpeg());
        let tiff = fixtures::tiff(ByteOrder::LittleEndian, &[(0x010F, "FixtureCam")], None);
        replace_exif_payload(&mut jpeg, &tiff);
        assert_eq!(exif_payload(&jpeg).unwrap().as_ref(), tiff.as_slice());
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let original = fixtures::camera_jpeg(ByteOrder::LittleEndian, "2024:01:15 10:00:00");
        std::fs::write(&path, &original).unwrap();

        let jpeg = read_jpeg(&path).unwrap();
        write_jpeg(&path, jpeg).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }

    #[test]
    fn read_rejects_non_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        assert!(read_jpeg(&path).is_err());
    }
}
