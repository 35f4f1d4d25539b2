use crate::capture::dms::dms_slice_to_decimal;
use crate::capture::structs::{CaptureMetadata, Equipment, GpsLocation, TechnicalSettings};
use crate::capture::timestamp::{TimeTags, resolve_timestamp};
use crate::error::MetadataError;
use crate::structs::ImageAsset;
use exif::{Exif, In, Rational, Tag, Value};
use std::io::Cursor;
use tracing::debug;

/// Checks the magic bytes and returns the detected image MIME type.
pub fn sniff_image(asset: &ImageAsset) -> Result<&'static str, MetadataError> {
    if asset.bytes().is_empty() {
        return Err(MetadataError::EmptyAsset);
    }
    match infer::get(asset.bytes()) {
        None => Err(MetadataError::UnrecognizedFormat(asset.name().to_string())),
        Some(kind) if kind.matcher_type() != infer::MatcherType::Image => {
            Err(MetadataError::NotAnImage(kind.mime_type().to_string()))
        }
        Some(kind) => Ok(kind.mime_type()),
    }
}

/// Reads the embedded capture metadata of an image.
///
/// A readable image without EXIF yields a metadata object with every field
/// `None`. Only a payload that is not an image at all is an error.
pub fn extract_capture_metadata(asset: &ImageAsset) -> Result<CaptureMetadata, MetadataError> {
    let media_type = sniff_image(asset)?;

    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(asset.bytes())) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(asset = asset.name(), error = %e, "No readable EXIF block");
            return Ok(CaptureMetadata {
                media_type: Some(media_type.to_string()),
                ..CaptureMetadata::default()
            });
        }
    };

    let location = get_gps_location(&exif);
    let capture_timestamp = resolve_timestamp(
        get_time_tags(&exif),
        location.as_ref().map(GpsLocation::coordinates),
    );

    Ok(CaptureMetadata {
        media_type: Some(media_type.to_string()),
        location,
        capture_timestamp,
        equipment: get_equipment(&exif),
        technical_settings: get_technical_settings(&exif),
    })
}

fn get_rationals(exif: &Exif, tag: Tag) -> Option<Vec<f64>> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) => Some(values.iter().map(Rational::to_f64).collect()),
        _ => None,
    }
}

fn get_f64(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let value = match &field.value {
        Value::Rational(values) => values.first().map(Rational::to_f64),
        Value::SRational(values) => values.first().map(exif::SRational::to_f64),
        other => other.get_uint(0).map(f64::from),
    }?;
    value.is_finite().then_some(value)
}

fn get_u32(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

fn get_string(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(values) => values
            .first()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn get_gps_location(exif: &Exif) -> Option<GpsLocation> {
    let lat_ref = get_string(exif, Tag::GPSLatitudeRef).unwrap_or_else(|| "N".to_string());
    let lon_ref = get_string(exif, Tag::GPSLongitudeRef).unwrap_or_else(|| "E".to_string());
    let latitude = dms_slice_to_decimal(&get_rationals(exif, Tag::GPSLatitude)?, &lat_ref)?;
    let longitude = dms_slice_to_decimal(&get_rationals(exif, Tag::GPSLongitude)?, &lon_ref)?;

    let location = GpsLocation {
        latitude,
        longitude,
        altitude: get_f64(exif, Tag::GPSAltitude).map(|altitude| {
            // GPSAltitudeRef 1 means below sea level.
            if get_u32(exif, Tag::GPSAltitudeRef) == Some(1) {
                -altitude
            } else {
                altitude
            }
        }),
    };

    if !location.coordinates().is_valid() {
        debug!(latitude, longitude, "Discarding invalid GPS coordinates");
        return None;
    }
    Some(location)
}

fn get_time_tags(exif: &Exif) -> TimeTags {
    let naive_candidates = [
        ("DateTimeOriginal", Tag::DateTimeOriginal),
        ("DateTimeDigitized", Tag::DateTimeDigitized),
        ("DateTime", Tag::DateTime),
    ]
    .into_iter()
    .filter_map(|(name, tag)| get_string(exif, tag).map(|value| (name, value)))
    .collect();

    let gps_time = get_rationals(exif, Tag::GPSTimeStamp)
        .filter(|v| v.len() >= 3)
        .map(|v| [v[0], v[1], v[2]]);

    TimeTags {
        naive_candidates,
        offset: get_string(exif, Tag::OffsetTimeOriginal)
            .or_else(|| get_string(exif, Tag::OffsetTime)),
        gps_date: get_string(exif, Tag::GPSDateStamp),
        gps_time,
    }
}

fn get_equipment(exif: &Exif) -> Option<Equipment> {
    let equipment = Equipment {
        make: get_string(exif, Tag::Make),
        model: get_string(exif, Tag::Model),
        lens: get_string(exif, Tag::LensModel),
    };
    (equipment != Equipment::default()).then_some(equipment)
}

fn get_technical_settings(exif: &Exif) -> Option<TechnicalSettings> {
    let settings = TechnicalSettings {
        iso: get_u32(exif, Tag::PhotographicSensitivity),
        aperture: get_f64(exif, Tag::FNumber),
        shutter_speed: get_f64(exif, Tag::ExposureTime),
        focal_length: get_f64(exif, Tag::FocalLengthIn35mmFilm)
            .filter(|f| *f > 0.0)
            .or_else(|| get_f64(exif, Tag::FocalLength)),
    };
    (settings != TechnicalSettings::default()).then_some(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fixtures::{ascii, exif_image, field, gps_fields, rational, tiny_png};
    use crate::capture::structs::TimestampConfidence;

    #[test]
    fn test_full_metadata() {
        let mut fields = gps_fields(-23.561, -46.656);
        fields.extend([
            field(Tag::GPSAltitude, Value::Rational(vec![rational(760, 1)])),
            field(Tag::DateTimeOriginal, ascii("2024:03:10 14:30:00")),
            field(Tag::Make, ascii("Canon")),
            field(Tag::Model, ascii("Canon EOS R5")),
            field(Tag::PhotographicSensitivity, Value::Short(vec![100])),
            field(Tag::FNumber, Value::Rational(vec![rational(18, 10)])),
            field(Tag::ExposureTime, Value::Rational(vec![rational(1, 250)])),
            field(Tag::FocalLength, Value::Rational(vec![rational(24, 1)])),
        ]);
        let asset = exif_image("facade.tif", &fields);

        let metadata = extract_capture_metadata(&asset).unwrap();

        assert_eq!(metadata.media_type.as_deref(), Some("image/tiff"));
        let location = metadata.location.expect("GPS should be present");
        assert!((location.latitude + 23.561).abs() < 1e-4);
        assert!((location.longitude + 46.656).abs() < 1e-4);
        assert_eq!(location.altitude, Some(760.0));

        let ts = metadata.capture_timestamp.expect("timestamp should be present");
        assert_eq!(ts.timezone.as_deref(), Some("America/Sao_Paulo"));
        assert_eq!(ts.confidence, TimestampConfidence::High);

        let equipment = metadata.equipment.unwrap();
        assert_eq!(equipment.make.as_deref(), Some("Canon"));
        assert_eq!(equipment.model.as_deref(), Some("Canon EOS R5"));
        assert!(equipment.lens.is_none());

        let settings = metadata.technical_settings.unwrap();
        assert_eq!(settings.iso, Some(100));
        assert_eq!(settings.aperture, Some(1.8));
        assert_eq!(settings.shutter_speed, Some(0.004));
        assert_eq!(settings.focal_length, Some(24.0));
    }

    #[test]
    fn test_below_sea_level_altitude() {
        let mut fields = gps_fields(31.5, 35.5);
        fields.push(field(Tag::GPSAltitude, Value::Rational(vec![rational(400, 1)])));
        fields.push(field(Tag::GPSAltitudeRef, Value::Byte(vec![1])));
        let metadata = extract_capture_metadata(&exif_image("dead_sea.tif", &fields)).unwrap();
        assert_eq!(metadata.location.unwrap().altitude, Some(-400.0));
    }

    #[test]
    fn test_image_without_gps() {
        let fields = vec![field(Tag::Make, ascii("Apple"))];
        let metadata = extract_capture_metadata(&exif_image("kitchen.tif", &fields)).unwrap();
        assert!(metadata.location.is_none());
        assert!(metadata.capture_timestamp.is_none());
        assert_eq!(metadata.equipment.unwrap().make.as_deref(), Some("Apple"));
    }

    #[test]
    fn test_null_island_is_discarded() {
        let metadata = extract_capture_metadata(&exif_image("x.tif", &gps_fields(0.0, 0.0))).unwrap();
        assert!(metadata.location.is_none());
    }

    #[test]
    fn test_image_without_exif_is_empty_metadata() {
        let metadata = extract_capture_metadata(&tiny_png("living_room.png")).unwrap();
        assert!(metadata.is_empty());
        assert_eq!(metadata.media_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_non_image_is_an_error() {
        let text = ImageAsset::new("notes.txt", "text/plain", b"just some text".to_vec());
        assert!(matches!(
            extract_capture_metadata(&text),
            Err(MetadataError::UnrecognizedFormat(name)) if name == "notes.txt"
        ));

        let pdf = ImageAsset::new("report.pdf", "application/pdf", b"%PDF-1.7\n%....".to_vec());
        assert!(matches!(
            extract_capture_metadata(&pdf),
            Err(MetadataError::NotAnImage(mime)) if mime == "application/pdf"
        ));

        let empty = ImageAsset::new("empty.jpg", "image/jpeg", Vec::new());
        assert_eq!(
            extract_capture_metadata(&empty).unwrap_err(),
            MetadataError::EmptyAsset
        );
    }
}
