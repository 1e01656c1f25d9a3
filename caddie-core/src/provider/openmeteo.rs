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

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,wind_speed_10m,wind_direction_10m,wind_gusts_10m";

/// Keyless forecast API from open-meteo.com.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), http: Client::new() }
    }
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
    wind_gusts_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
}

fn parse_current(body: &str) -> Result<WindObservation> {
    let parsed: OmResponse =
        serde_json::from_str(body).context("Failed to parse Open-Meteo current JSON")?;
    let current = parsed.current;

    Ok(WindObservation {
        speed_mps: round_tenths(current.wind_speed_10m),
        direction_deg: normalize_degrees(current.wind_direction_10m),
        gust_mps: round_tenths(current.wind_gusts_10m.unwrap_or(0.0)),
        temperature_c: current.temperature_2m.round(),
        humidity_pct: current.relative_humidity_2m,
    })
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_wind(&self, point: GeoPoint) -> Result<WindObservation> {
        let url = format!("{}/v1/forecast", self.base_url);
        log::debug!("GET {url} for {point}");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", point.latitude.to_string()),
                ("longitude", point.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("temperature_unit", "celsius".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (current weather)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Open-Meteo response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_current(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_rounds_current_conditions() {
        let body = r#"{
            "latitude": 57.7,
            "longitude": 11.97,
            "current_units": { "wind_speed_10m": "m/s" },
            "current": {
                "time": "2025-06-01T10:00",
                "interval": 900,
                "temperature_2m": 17.6,
                "relative_humidity_2m": 64,
                "wind_speed_10m": 4.26,
                "wind_direction_10m": 360,
                "wind_gusts_10m": 9.04
            }
        }"#;

        let wind = parse_current(body).unwrap();
        assert_eq!(wind.speed_mps, 4.3);
        assert_eq!(wind.gust_mps, 9.0);
        assert_eq!(wind.temperature_c, 18.0);
        assert_eq!(wind.humidity_pct, 64.0);
        assert_eq!(wind.direction_deg, 0.0);
    }

    #[test]
    fn missing_gusts_default_to_zero() {
        let body = r#"{ "current": {
            "temperature_2m": 9.4,
            "relative_humidity_2m": 90,
            "wind_speed_10m": 2.0,
            "wind_direction_10m": 225,
            "wind_gusts_10m": null
        } }"#;

        let wind = parse_current(body).unwrap();
        assert_eq!(wind.gust_mps, 0.0);
        assert_eq!(wind.direction_deg, 225.0);
        assert!(!wind.is_gusty());
    }

    #[test]
    fn rejects_payload_without_current_block() {
        let err = parse_current(r#"{ "error": true, "reason": "bad latitude" }"#).unwrap_err();
        assert!(err.to_string().contains("Open-Meteo"));
    }

    #[test]
    fn base_url_is_trimmed() {
        let provider = OpenMeteoProvider::with_base_url("http://localhost:8080/");
        assert_eq!(provider.base_url, "http://localhost:8080");
    }
}
