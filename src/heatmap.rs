//! Renders coordinates as a Leaflet heatmap in a self-contained HTML page.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use serde_json::Value;

use crate::geocode::Coordinate;

const LEAFLET_CSS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const LEAFLET_HEAT_JS_URL: &str =
    "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";

const MAP_CSS: &str = "html,body{height:100%;margin:0;padding:0}\
                       #map{position:absolute;top:0;bottom:0;left:0;right:0}";

/// Seoul. At the default zoom the whole peninsula is in view.
pub const KOREA_CENTER: Coordinate = Coordinate::new(37.5665, 126.9780);

pub const DEFAULT_ZOOM: u8 = 7;

#[derive(Debug, Clone)]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl TileLayer {
    pub fn open_street_map() -> Self {
        Self {
            url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">\
                          OpenStreetMap</a> contributors"
                .into(),
            max_zoom: 19,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapOptions {
    pub title: String,
    pub center: Coordinate,
    pub zoom: u8,
    pub tiles: TileLayer,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            title: "Korea heatmap".into(),
            center: KOREA_CENTER,
            zoom: DEFAULT_ZOOM,
            tiles: TileLayer::open_street_map(),
        }
    }
}

/// Build the full HTML page. An empty `points` slice gives a map with an
/// empty heat layer.
pub fn render(options: &MapOptions, points: &[Coordinate]) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta
                    name="viewport"
                    content="width=device-width, initial-scale=1.0";
                title { (options.title) }
                link rel="stylesheet" href=(LEAFLET_CSS_URL) crossorigin="";
                style { (PreEscaped(MAP_CSS)) }
                script src=(LEAFLET_JS_URL) crossorigin="" {}
                script src=(LEAFLET_HEAT_JS_URL) crossorigin="" {}
            }
            body {
                div id="map" {}
                script { (PreEscaped(map_script(options, points))) }
            }
        }
    }
}

fn map_script(options: &MapOptions, points: &[Coordinate]) -> String {
    let center = Value::from(vec![options.center.lat, options.center.lng]);
    let tiles = serde_json::json!({
        "attribution": options.tiles.attribution,
        "maxZoom": options.tiles.max_zoom,
    });
    let heat = Value::from(
        points.iter().map(|c| vec![c.lat, c.lng]).collect::<Vec<_>>(),
    );
    let script = format!(
        "var map=L.map(\"map\").setView({center},{zoom});\
         L.tileLayer({url},{tiles}).addTo(map);\
         L.heatLayer({heat}).addTo(map);",
        zoom = options.zoom,
        url = Value::from(options.tiles.url.as_str()),
    );
    // a literal "</" would end the script element early
    script.replace("</", "<\\/")
}

/// Write the page to `path`, replacing any existing file.
pub fn save(path: &Path, page: &Markup) -> Result<()> {
    fs::write(path, page.0.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}
