use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    geometry::normalize_degrees,
    model::{GeoPoint, WindObservation},
    provider::{round_tenths, truncate_body},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    wind: OwWind,
}

fn parse_current(body: &str) -> Result<WindObservation> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).context("Failed to parse OpenWeather current JSON")?;

    Ok(WindObservation {
        speed_mps: round_tenths(parsed.wind.speed),
        direction_deg: normalize_degrees(parsed.wind.deg),
        gust_mps: round_tenths(parsed.wind.gust.unwrap_or(0.0)),
        temperature_c: parsed.main.temp.round(),
        humidity_pct: parsed.main.humidity,
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_wind(&self, point: GeoPoint) -> Result<WindObservation> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        log::debug!("GET {url} for {point}");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_current(&body)
    }
}
