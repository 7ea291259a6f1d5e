use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;

pub mod address;
pub mod config;
pub mod export;
pub mod geocode;
pub mod heatmap;
pub mod input;
pub mod nominatim;
pub mod pipeline;

use crate::{
    config::{Config, DEFAULT_ENCODING, DEFAULT_INPUT, DEFAULT_OUTPUT},
    geocode::{Coordinate, Geocoder},
    heatmap::{MapOptions, DEFAULT_ZOOM, KOREA_CENTER},
    nominatim::{
        NominatimClient, NominatimConfig, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT,
    },
    pipeline::{GeocodeOptions, Summary, DEFAULT_PROGRESS_EVERY},
};

/// Look up coordinates for the province and city of every row in a CSV file
/// and draw them as a heatmap over South Korea.
///
/// Addresses are resolved one at a time through a Nominatim server. Mind the
/// server's usage policy before lowering the delay between requests.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Input filename
    ///
    /// A CSV file with a header row containing at least "province" and
    /// "city" columns. Other columns are ignored.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output filename, a standalone HTML page
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Also write the geocoded points to this GeoJSON file
    #[arg(long, value_name = "FILE")]
    geojson: Option<PathBuf>,

    /// Encoding of the input file. UTF-8 is tried if decoding fails.
    #[arg(long, value_name = "LABEL", default_value = DEFAULT_ENCODING)]
    encoding: String,

    /// Nominatim search endpoint
    #[arg(
        long,
        value_name = "URL",
        env = "GEOCODER_ENDPOINT",
        default_value = DEFAULT_ENDPOINT
    )]
    endpoint: String,

    /// User agent sent to the geocoding service
    #[arg(
        long,
        value_name = "NAME",
        env = "GEOCODER_USER_AGENT",
        default_value = DEFAULT_USER_AGENT
    )]
    user_agent: String,

    /// Only return matches within these countries, e.g. "kr"
    #[arg(long, value_name = "CODES")]
    country_codes: Option<String>,

    /// Timeout of a single geocoding request
    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "10",
        value_parser = parse_seconds
    )]
    timeout: Duration,

    /// Pause after every geocoding request
    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "1",
        value_parser = parse_seconds
    )]
    delay: Duration,

    /// Retry an address this many times after a transient failure
    #[arg(long, value_name = "N", default_value_t = 0)]
    retries: u32,

    /// Report progress every N addresses
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: usize,

    /// Initial map center
    #[arg(long, value_name = "LAT,LNG", default_value_t = KOREA_CENTER)]
    center: Coordinate,

    /// Initial map zoom level
    #[arg(
        long,
        value_name = "LEVEL",
        default_value_t = DEFAULT_ZOOM,
        value_parser = clap::value_parser!(u8).range(0..=19)
    )]
    zoom: u8,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        Ok(Config {
            encoding: input::resolve_encoding(&self.encoding)?,
            input: self.input,
            output: self.output,
            geojson: self.geojson,
            nominatim: NominatimConfig {
                endpoint: self.endpoint,
                user_agent: self.user_agent,
                timeout: self.timeout,
                country_codes: self.country_codes,
            },
            geocoding: GeocodeOptions {
                delay: self.delay,
                retries: self.retries,
                progress_every: self.progress_every,
            },
            map: MapOptions {
                center: self.center,
                zoom: self.zoom,
                ..MapOptions::default()
            },
        })
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}: {s:?}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

/// Run the command-line interface
pub async fn run() -> Result<()> {
    let config = Cli::parse().into_config()?;
    let geocoder = NominatimClient::new(&config.nominatim)
        .context("Failed to set up the geocoding client")?;
    execute(&config, &geocoder).await?;
    Ok(())
}

/// Geocode the input file with `geocoder` and write the heatmap.
pub async fn execute<G: Geocoder>(
    config: &Config,
    geocoder: &G,
) -> Result<Summary> {
    let records = input::load_records(&config.input, config.encoding)?;

    // check that we can write to the output files, without truncating, before
    // spending lots of time fetching coordinates
    check_writable(&config.output)?;
    if let Some(path) = &config.geojson {
        check_writable(path)?;
    }

    let addresses = address::short_addresses(&records);
    let mut report =
        pipeline::geocode_all(geocoder, &addresses, &config.geocoding).await;
    report.summary.skipped = records.len() - addresses.len();
    log::info!("Got {} valid coordinates", report.places.len());

    let page = heatmap::render(&config.map, &report.coordinates());
    heatmap::save(&config.output, &page)?;
    log::info!("Heatmap saved to {}", config.output.display());

    if let Some(path) = &config.geojson {
        export::save(path, &export::to_feature_collection(&report.places))?;
        log::info!("Points saved to {}", path.display());
    }

    let Summary {
        processed,
        found,
        no_match,
        failed,
        skipped,
        ..
    } = report.summary;
    log::info!(
        "{processed} addresses processed: {found} found, {no_match} without \
         match, {failed} failed, {skipped} records skipped"
    );
    Ok(report.summary)
}

fn check_writable(path: &Path) -> Result<()> {
    fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .with_context(|| format!("Cannot write to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use encoding_rs::{EUC_KR, UTF_8};

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let config = Cli::try_parse_from(["korea-heatmap"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.input, PathBuf::from("data4map.csv"));
        assert_eq!(config.output, PathBuf::from("korea_heatmap_nominatim.html"));
        assert_eq!(config.encoding, EUC_KR);
        assert_eq!(config.geojson, None);
        assert_eq!(config.nominatim.timeout, Duration::from_secs(10));
        assert_eq!(config.geocoding.delay, Duration::from_secs(1));
        assert_eq!(config.geocoding.retries, 0);
        assert_eq!(config.geocoding.progress_every, 10);
        assert_eq!(config.map.center, Coordinate::new(37.5665, 126.978));
        assert_eq!(config.map.zoom, 7);
    }

    #[test]
    fn options() {
        let config = Cli::try_parse_from([
            "korea-heatmap",
            "-i",
            "stores.csv",
            "-o",
            "stores.html",
            "--geojson",
            "stores.geojson",
            "--encoding",
            "utf-8",
            "--user-agent",
            "store-mapper",
            "--country-codes",
            "kr",
            "--timeout",
            "2.5",
            "--delay",
            "0",
            "--retries",
            "3",
            "--center",
            "35.18,129.07",
            "--zoom",
            "11",
        ])
        .unwrap()
        .into_config()
        .unwrap();
        assert_eq!(config.input, PathBuf::from("stores.csv"));
        assert_eq!(config.geojson, Some(PathBuf::from("stores.geojson")));
        assert_eq!(config.encoding, UTF_8);
        assert_eq!(config.nominatim.user_agent, "store-mapper");
        assert_eq!(config.nominatim.country_codes.as_deref(), Some("kr"));
        assert_eq!(config.nominatim.timeout, Duration::from_millis(2500));
        assert_eq!(config.geocoding.delay, Duration::ZERO);
        assert_eq!(config.geocoding.retries, 3);
        assert_eq!(config.map.center, Coordinate::new(35.18, 129.07));
        assert_eq!(config.map.zoom, 11);
    }

    #[test]
    fn rejects_bad_values() {
        for args in [
            ["--delay", "-1"],
            ["--timeout", "soon"],
            ["--center", "37.5"],
            ["--zoom", "20"],
        ] {
            let argv = ["korea-heatmap", args[0], args[1]];
            assert!(Cli::try_parse_from(argv).is_err(), "{args:?}");
        }

        let cli =
            Cli::try_parse_from(["korea-heatmap", "--encoding", "bogus"]);
        assert!(cli.unwrap().into_config().is_err());
    }
}
