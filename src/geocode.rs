use std::{fmt, future::Future, str::FromStr, sync::LazyLock};

use anyhow::bail;
use regex::Regex;
use thiserror::Error;

// A latitude,longitude regex pattern. E.g. "37.5665,126.9780".
// (?:) denotes a non-capturing group. ()? denotes an optional group.
const LATLNGPAT: &str = r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$";

static LATLNG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LATLNGPAT).expect("valid lat,lng pattern"));

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within the latitude and longitude ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for Coordinate {
    type Err = anyhow::Error;

    /// Parse "lat,lng".
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let Some((_, [lat, lng])) =
            LATLNG.captures_iter(s).map(|c| c.extract()).next()
        else {
            bail!("Expected coordinates as LAT,LNG but got {s:?}");
        };
        let coord = Coordinate::new(lat.parse()?, lng.parse()?);
        if !coord.is_valid() {
            bail!("Coordinates {coord} are out of range");
        }
        Ok(coord)
    }
}

/// The outcome of a lookup that reached the service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup {
    Found(Coordinate),
    NoMatch,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeocodeError {
    /// Worth retrying later: timeouts, connection failures, rate limiting
    /// and server errors.
    #[error("transient geocoding failure: {0}")]
    Transient(String),
    /// Retrying the same request will fail again.
    #[error("geocoding failure: {0}")]
    Permanent(String),
}

impl GeocodeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Resolves a free-text address to its best matching position.
pub trait Geocoder {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Lookup, GeocodeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lat_lng() {
        let c: Coordinate = "37.5665,126.9780".parse().unwrap();
        assert_eq!(c, Coordinate::new(37.5665, 126.978));

        let c: Coordinate = " -33.9 , 151 ".parse().unwrap();
        assert_eq!(c, Coordinate::new(-33.9, 151.0));
    }

    #[test]
    fn rejects_malformed_or_out_of_range_coordinates() {
        assert!("37.5".parse::<Coordinate>().is_err());
        assert!("lat,lng".parse::<Coordinate>().is_err());
        assert!("37.5,126.9,1".parse::<Coordinate>().is_err());
        assert!("91,0".parse::<Coordinate>().is_err());
        assert!("0,-181".parse::<Coordinate>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let c = Coordinate::new(35.1796, 129.0756);
        assert_eq!(c.to_string().parse::<Coordinate>().unwrap(), c);
    }

    #[test]
    fn non_finite_coordinates_are_invalid() {
        assert!(Coordinate::new(37.5, 127.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 127.0).is_valid());
        assert!(!Coordinate::new(37.5, f64::INFINITY).is_valid());
        assert!(!Coordinate::new(-90.5, 0.0).is_valid());
    }

    #[test]
    fn classifies_errors() {
        assert!(GeocodeError::Transient("timeout".into()).is_transient());
        assert!(!GeocodeError::Permanent("bad json".into()).is_transient());
    }
}
