use std::time::Duration;

use tokio::time::sleep;

use crate::geocode::{Coordinate, GeocodeError, Geocoder, Lookup};

/// Nominatim's usage policy allows at most one request per second.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// Pacing, retry and progress settings of the geocoding loop.
#[derive(Debug, Clone)]
pub struct GeocodeOptions {
    /// Pause after every request, whatever its outcome.
    pub delay: Duration,
    /// How often a transient failure is retried. Zero disables retries.
    pub retries: u32,
    /// Log a progress line every this many addresses. Zero disables it.
    pub progress_every: usize,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            retries: 0,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// An address and the position it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub address: String,
    pub coordinate: Coordinate,
}

/// Counts of what happened to the input records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Addresses sent to the geocoder.
    pub processed: usize,
    pub found: usize,
    pub no_match: usize,
    pub failed: usize,
    /// Records dropped before geocoding because their address was invalid.
    pub skipped: usize,
    /// Requests made, retries included.
    pub requests: usize,
}

/// The geocoded places in input order, with the run's counts.
#[derive(Debug, Default)]
pub struct Report {
    pub places: Vec<GeocodedPlace>,
    pub summary: Summary,
}

impl Report {
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.places.iter().map(|p| p.coordinate).collect()
    }
}

/// Geocode each address in order, one request at a time.
///
/// Failed lookups are logged and skipped, so the result holds at most one
/// place per address.
pub async fn geocode_all<G: Geocoder>(
    geocoder: &G,
    addresses: &[String],
    options: &GeocodeOptions,
) -> Report {
    let mut report = Report::default();
    log::info!("Converting {} addresses to coordinates", addresses.len());
    for address in addresses {
        let result =
            lookup(geocoder, address, options, &mut report.summary).await;
        match result {
            Ok(Lookup::Found(coordinate)) => {
                report.summary.found += 1;
                report.places.push(GeocodedPlace {
                    address: address.clone(),
                    coordinate,
                });
            }
            Ok(Lookup::NoMatch) => {
                report.summary.no_match += 1;
                log::warn!("No coordinates found for {address:?}");
            }
            Err(e) => {
                report.summary.failed += 1;
                log::error!(
                    "Failed to geocode {address:?} with error {e}. Continuing."
                );
            }
        }
        report.summary.processed += 1;
        let processed = report.summary.processed;
        if options.progress_every > 0 && processed % options.progress_every == 0
        {
            log::info!("Processed {processed} addresses");
        }
    }
    report
}

async fn lookup<G: Geocoder>(
    geocoder: &G,
    address: &str,
    options: &GeocodeOptions,
    summary: &mut Summary,
) -> Result<Lookup, GeocodeError> {
    let mut attempt = 0;
    loop {
        let result = geocoder.geocode(address).await;
        summary.requests += 1;
        sleep(options.delay).await;
        match result {
            Err(e) if e.is_transient() && attempt < options.retries => {
                attempt += 1;
                log::warn!(
                    "Retrying {address:?} ({attempt}/{}) after error {e}",
                    options.retries
                );
            }
            result => return result,
        }
    }
}
