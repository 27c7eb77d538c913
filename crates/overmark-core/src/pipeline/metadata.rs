//! EXIF orientation lookup.

use exif::{In, Reader, Tag, Value};
use image::metadata::Orientation;
use std::io::Cursor;

/// Reads the EXIF fields the pipeline acts on.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Raw EXIF orientation (1–8) of an encoded image, if present.
    ///
    /// Lenient: missing or unreadable EXIF yields `None`.
    pub fn orientation_tag(bytes: &[u8]) -> Option<u32> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .ok()?;

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Short(v) => v.first().map(|&x| x as u32),
                Value::Long(v) => v.first().copied(),
                _ => None,
            })
    }

    /// The transform that makes the image upright, or `None` when it already is.
    pub fn orientation(bytes: &[u8]) -> Option<Orientation> {
        let tag = u8::try_from(Self::orientation_tag(bytes)?).ok()?;
        match Orientation::from_exif(tag)? {
            Orientation::NoTransforms => None,
            o => Some(o),
        }
    }
}
