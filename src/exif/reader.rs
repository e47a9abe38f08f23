use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use nom_exif::*;
use std::io::Cursor;

/// Capture-time tags, most specific first.
const CAPTURE_TIME_TAGS: &[ExifTag] = &[
    ExifTag::DateTimeOriginal,
    ExifTag::CreateDate,
    ExifTag::ModifyDate,
];

/// Layouts an EXIF date value may render as, depending on whether the
/// parser decoded it and whether an offset tag was present.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];
const OFFSET_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S %:z", "%Y:%m:%d %H:%M:%S%:z"];

/// Metadata recovered from the EXIF block of an image.
///
/// Both fields are independent: a block can carry GPS without a capture
/// time and vice versa.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedMetadata {
    pub captured_at: Option<DateTime<Utc>>,
    /// `(latitude, longitude)` in signed decimal degrees.
    pub gps: Option<(f64, f64)>,
}

/// Parse the EXIF block out of an in-memory image.
///
/// Returns `None` when the format is not recognised or carries no
/// parseable EXIF; callers treat that as "no embedded metadata".
pub fn read_embedded(bytes: &[u8]) -> Option<EmbeddedMetadata> {
    let mut parser = MediaParser::new();
    let ms = match MediaSource::seekable(Cursor::new(bytes)) {
        Ok(ms) => ms,
        Err(e) => {
            log::debug!("Unrecognised media format: {e}");
            return None;
        }
    };

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(e) => {
            log::debug!("No EXIF data found: {e}");
            return None;
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let captured_at = CAPTURE_TIME_TAGS
        .iter()
        .filter_map(|tag| exif.get(*tag))
        .find_map(|val| parse_exif_time(&val.to_string()));

    let gps = gps_info.and_then(|gps| {
        let lat = latlng_to_decimal(&gps.latitude, gps.latitude_ref);
        let lon = latlng_to_decimal(&gps.longitude, gps.longitude_ref);
        valid_coordinates(lat, lon)
    });

    Some(EmbeddedMetadata { captured_at, gps })
}

/// Parse a rendered EXIF date value into a UTC instant.
///
/// Values with an explicit offset are converted directly. Naive values are
/// camera-local wall-clock time and are interpreted in the local zone.
pub(crate) fn parse_exif_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim().trim_matches('"').trim_end_matches('\0').trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(t) = DateTime::parse_from_str(raw, layout) {
            return Some(t.with_timezone(&Utc));
        }
    }

    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .and_then(local_to_utc)
}

/// Interpret a wall-clock time in the local zone. Ambiguous times (DST
/// fall-back) take the earlier instant; times in a DST gap yield `None`.
pub(crate) fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    dms_to_decimal(degrees, minutes, seconds, reference)
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: char) -> f64 {
    let coord = degrees + minutes / 60.0 + seconds / 3600.0;

    if reference == 'S' || reference == 'W' {
        -coord
    } else {
        coord
    }
}

/// Zero denominators and garbage rationals show up as NaN/inf or
/// impossible degrees; drop the pair rather than emit them.
fn valid_coordinates(lat: f64, lon: f64) -> Option<(f64, f64)> {
    let ok = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);
    ok.then_some((lat, lon))
}
