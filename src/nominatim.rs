//! Client for the search endpoint of an OpenStreetMap Nominatim server.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::geocode::{Coordinate, GeocodeError, Geocoder, Lookup};

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Nominatim refuses anonymous clients, so a user agent is required.
pub const DEFAULT_USER_AGENT: &str = "geocoder_application";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach the Nominatim server.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Comma separated ISO 3166-1 alpha-2 codes passed as `countrycodes`.
    pub country_codes: Option<String>,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            country_codes: None,
        }
    }
}

/// One entry of a `format=jsonv2` search response. Nominatim encodes the
/// coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Geocodes addresses through the search API of a Nominatim server.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: Client,
    endpoint: String,
    country_codes: Option<String>,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            country_codes: config.country_codes.clone(),
        })
    }

    async fn search(&self, address: &str) -> Result<String, GeocodeError> {
        let mut query =
            vec![("q", address), ("format", "jsonv2"), ("limit", "1")];
        if let Some(codes) = &self.country_codes {
            query.push(("countrycodes", codes.as_str()));
        }
        log::debug!("Looking up {address:?} at {}", self.endpoint);
        let response = self
            .http
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(from_status(status));
        }
        response.text().await.map_err(from_reqwest)
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Lookup, GeocodeError> {
        let body = self.search(address).await?;
        parse_response(&body)
    }
}

/// Take the best (first) match of a search response.
fn parse_response(body: &str) -> Result<Lookup, GeocodeError> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)
        .map_err(|e| GeocodeError::Permanent(format!("bad response: {e}")))?;
    let Some(place) = places.into_iter().next() else {
        return Ok(Lookup::NoMatch);
    };
    let coordinate =
        Coordinate::new(parse_degrees(&place.lat)?, parse_degrees(&place.lon)?);
    if !coordinate.is_valid() {
        return Err(GeocodeError::Permanent(format!(
            "coordinates {coordinate} are out of range"
        )));
    }
    if let Some(name) = &place.display_name {
        log::debug!("Best match is {name}");
    }
    Ok(Lookup::Found(coordinate))
}

fn parse_degrees(value: &str) -> Result<f64, GeocodeError> {
    value.trim().parse().map_err(|e| {
        GeocodeError::Permanent(format!("bad coordinate {value:?}: {e}"))
    })
}

fn from_reqwest(e: reqwest::Error) -> GeocodeError {
    if e.is_timeout() || e.is_connect() || e.is_body() {
        GeocodeError::Transient(e.to_string())
    } else {
        GeocodeError::Permanent(e.to_string())
    }
}

fn from_status(status: StatusCode) -> GeocodeError {
    let msg = format!("server responded with {status}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        GeocodeError::Transient(msg)
    } else {
        GeocodeError::Permanent(msg)
    }
}
