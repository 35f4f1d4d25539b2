//! Degrees/minutes/seconds to signed decimal degrees.

/// Converts one GPS axis to decimal degrees:
/// `degrees + minutes / 60 + seconds / 3600`, negated for `S` and `W`.
#[must_use]
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: &str) -> f64 {
    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    if is_negative_reference(reference) {
        -magnitude
    } else {
        magnitude
    }
}

fn is_negative_reference(reference: &str) -> bool {
    matches!(
        reference.trim().trim_end_matches('\0').to_ascii_uppercase().as_str(),
        "S" | "W"
    )
}

/// Converts an EXIF rational triple. Missing trailing components count as zero.
#[must_use]
pub fn dms_slice_to_decimal(components: &[f64], reference: &str) -> Option<f64> {
    let degrees = *components.first()?;
    let minutes = components.get(1).copied().unwrap_or(0.0);
    let seconds = components.get(2).copied().unwrap_or(0.0);
    let decimal = dms_to_decimal(degrees, minutes, seconds, reference);
    decimal.is_finite().then_some(decimal)
}
