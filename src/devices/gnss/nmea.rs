//! NMEA sentence parsing
//!
//! Pure decoding of the navigation sentences the mower consumes: GGA
//! (fix quality, satellites, position, altitude) and RMC (status,
//! position, speed, course). Line buffering is the caller's job; this
//! module only ever sees one candidate line at a time.
//!
//! Empty fields are normal (a receiver without a fix sends them) and
//! decode to `None`. A non-empty field that fails numeric parsing makes
//! the whole line untrustworthy: it is logged and discarded.

/// Knots to meters per second
const KNOTS_TO_MPS: f32 = 0.514_444;

/// Canonical decoded coordinate pair, signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionFix {
    /// Latitude in degrees (positive = North)
    pub latitude: f64,
    /// Longitude in degrees (positive = East)
    pub longitude: f64,
}

/// GGA sentence fields (fix data)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GgaData {
    /// Latitude in degrees, `None` when the field was empty
    pub latitude: Option<f64>,
    /// Longitude in degrees
    pub longitude: Option<f64>,
    /// Fix quality indicator (0 = no fix, 1 = GPS, 4 = RTK fixed, ...)
    pub fix_quality: Option<u8>,
    /// Number of satellites in use
    pub satellites: Option<u8>,
    /// Altitude above mean sea level in meters
    pub altitude_m: Option<f32>,
}

/// RMC sentence fields (recommended minimum navigation)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RmcData {
    /// Status field was `A` (active)
    pub valid: bool,
    /// Latitude in degrees
    pub latitude: Option<f64>,
    /// Longitude in degrees
    pub longitude: Option<f64>,
    /// Speed over ground in m/s (converted from knots)
    pub speed_mps: Option<f32>,
    /// Course over ground in degrees
    pub course_deg: Option<f32>,
}

/// One recognized navigation sentence
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavSentence {
    /// Fix data
    Gga(GgaData),
    /// Recommended minimum navigation data
    Rmc(RmcData),
}

impl NavSentence {
    /// Extract the decoded position, when both coordinates are present
    pub fn position_fix(&self) -> Option<PositionFix> {
        let (lat, lon) = match self {
            NavSentence::Gga(g) => (g.latitude, g.longitude),
            NavSentence::Rmc(r) => (r.latitude, r.longitude),
        };
        Some(PositionFix {
            latitude: lat?,
            longitude: lon?,
        })
    }
}

/// Parse one candidate line into a navigation sentence
///
/// Returns `None` for lines that do not start with `$`, sentence types
/// this system does not consume, lines with too few fields, and lines
/// with undecodable numeric fields (logged). Trailing `\r`/`\n` and an
/// optional `*XX` checksum segment are tolerated; the checksum is not
/// validated here.
pub fn parse(line: &str) -> Option<NavSentence> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.starts_with('$') {
        return None;
    }

    // Strip the checksum segment; field extraction does not depend on it.
    let body = match line.rfind('*') {
        Some(i) => &line[..i],
        None => line,
    };

    let mut fields: heapless::Vec<&str, 24> = heapless::Vec::new();
    for field in body.split(',') {
        if fields.push(field).is_err() {
            // More fields than any sentence we recognize carries.
            return None;
        }
    }

    // Talker-agnostic: $GPGGA, $GNGGA, ... all match by sentence type.
    let sentence_type = fields.first()?.get(3..)?;
    match sentence_type {
        "GGA" => parse_gga(&fields),
        "RMC" => parse_rmc(&fields),
        _ => None,
    }
}

/// Convert a degrees-minutes coordinate (`ddmm.mmmm`) to decimal degrees
///
/// Applied identically to latitude and longitude; `S` and `W` hemispheres
/// negate the result.
pub fn parse_coordinate(raw: f64, hemisphere: &str) -> f64 {
    let degrees = libm::floor(raw / 100.0);
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;

    match hemisphere {
        "S" | "W" => -decimal,
        _ => decimal,
    }
}

fn parse_gga(fields: &[&str]) -> Option<NavSentence> {
    // $xxGGA,time,lat,NS,lon,EW,quality,numSV,HDOP,alt,M,...
    if fields.len() < 10 {
        return None;
    }

    let latitude = coordinate_field(fields[2], fields[3])?;
    let longitude = coordinate_field(fields[4], fields[5])?;
    let fix_quality = numeric_field::<u8>(fields[6])?;
    let satellites = numeric_field::<u8>(fields[7])?;
    let altitude_m = numeric_field::<f32>(fields[9])?;

    Some(NavSentence::Gga(GgaData {
        latitude,
        longitude,
        fix_quality,
        satellites,
        altitude_m,
    }))
}

fn parse_rmc(fields: &[&str]) -> Option<NavSentence> {
    // $xxRMC,time,status,lat,NS,lon,EW,spd,cog,date,...
    if fields.len() < 9 {
        return None;
    }

    let valid = fields[2] == "A";
    let latitude = coordinate_field(fields[3], fields[4])?;
    let longitude = coordinate_field(fields[5], fields[6])?;
    let speed_mps = numeric_field::<f32>(fields[7])?.map(|knots| knots * KNOTS_TO_MPS);
    let course_deg = numeric_field::<f32>(fields[8])?;

    Some(NavSentence::Rmc(RmcData {
        valid,
        latitude,
        longitude,
        speed_mps,
        course_deg,
    }))
}

/// Decode one numeric field
///
/// Empty fields become `Some(None)`; an unparsable non-empty field is the
/// field-decode failure that rejects the whole line, so `None` is
/// returned for the caller's `?`.
fn numeric_field<T: core::str::FromStr>(field: &str) -> Option<Option<T>> {
    if field.is_empty() {
        return Some(None);
    }
    match field.parse::<T>() {
        Ok(value) => Some(Some(value)),
        Err(_) => {
            crate::log_warn!("nmea: field decode failure: {:?}", field);
            None
        }
    }
}

/// Decode one coordinate field pair (value + hemisphere)
fn coordinate_field(raw: &str, hemisphere: &str) -> Option<Option<f64>> {
    let raw = match numeric_field::<f64>(raw)? {
        Some(v) => v,
        None => return Some(None),
    };
    Some(Some(parse_coordinate(raw, hemisphere)))
}
