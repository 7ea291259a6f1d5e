use std::path::PathBuf;

use encoding_rs::{Encoding, EUC_KR};

use crate::{
    heatmap::MapOptions, nominatim::NominatimConfig, pipeline::GeocodeOptions,
};

pub const DEFAULT_INPUT: &str = "data4map.csv";
pub const DEFAULT_OUTPUT: &str = "korea_heatmap_nominatim.html";
pub const DEFAULT_ENCODING: &str = "euc-kr";

/// Everything a run needs, resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    /// Tried first when decoding the input; UTF-8 is the fallback.
    pub encoding: &'static Encoding,
    pub output: PathBuf,
    pub geojson: Option<PathBuf>,
    pub nominatim: NominatimConfig,
    pub geocoding: GeocodeOptions,
    pub map: MapOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT.into(),
            encoding: EUC_KR,
            output: DEFAULT_OUTPUT.into(),
            geojson: None,
            nominatim: NominatimConfig::default(),
            geocoding: GeocodeOptions::default(),
            map: MapOptions::default(),
        }
    }
}
