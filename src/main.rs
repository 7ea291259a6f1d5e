//! Reads a CSV of Korean provinces and cities, geocodes each row with
//! Nominatim, and saves the results as a heatmap in an HTML file.

use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    korea_heatmap::run().await
}
