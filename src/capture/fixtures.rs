//! In-memory EXIF images for tests.

use crate::structs::ImageAsset;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use std::io::Cursor;

pub fn rational(num: u32, denom: u32) -> Rational {
    Rational { num, denom }
}

pub fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

pub fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

/// Encodes a decimal degree as a degrees/minutes/seconds rational triple.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn dms(decimal: f64) -> Value {
    let abs = decimal.abs();
    let degrees = abs.trunc();
    let minutes = ((abs - degrees) * 60.0).trunc();
    let seconds = (abs - degrees - minutes / 60.0) * 3600.0;
    Value::Rational(vec![
        rational(degrees as u32, 1),
        rational(minutes as u32, 1),
        rational((seconds * 10_000.0).round() as u32, 10_000),
    ])
}

pub fn gps_fields(latitude: f64, longitude: f64) -> Vec<Field> {
    vec![
        field(Tag::GPSLatitudeRef, ascii(if latitude < 0.0 { "S" } else { "N" })),
        field(Tag::GPSLatitude, dms(latitude)),
        field(Tag::GPSLongitudeRef, ascii(if longitude < 0.0 { "W" } else { "E" })),
        field(Tag::GPSLongitude, dms(longitude)),
    ]
}

/// A TIFF container holding only the given EXIF fields.
pub fn exif_image(name: &str, fields: &[Field]) -> ImageAsset {
    let mut writer = Writer::new();
    for f in fields {
        writer.push_field(f);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).expect("EXIF fixture should encode");
    ImageAsset::new(name, "image/tiff", buf.into_inner())
}

/// A PNG signature followed by a truncated header: sniffs as an image but
/// carries no EXIF.
pub fn tiny_png(name: &str) -> ImageAsset {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
    bytes.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 2, 0, 0, 0]);
    ImageAsset::new(name, "image/png", bytes)
}
