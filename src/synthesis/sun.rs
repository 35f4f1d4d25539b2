use crate::geo::structs::Coordinates;
use crate::synthesis::structs::SunInfo;
use chrono::{DateTime, Utc};
use sunrise::{SolarDay, SolarEvent};

/// Sunrise and sunset on the capture date at the capture location. `None`
/// during polar day or night.
#[must_use]
pub fn sun_info(at: DateTime<Utc>, location: Coordinates) -> Option<SunInfo> {
    let coord = sunrise::Coordinates::new(location.latitude, location.longitude)?;
    let date = at.date_naive();
    let sunrise = SolarDay::new(coord, date).event_time(SolarEvent::Sunrise)?;
    let sunset = SolarDay::new(coord, date).event_time(SolarEvent::Sunset)?;

    Some(SunInfo {
        sunrise,
        sunset,
        is_daytime: at >= sunrise && at <= sunset,
    })
}
