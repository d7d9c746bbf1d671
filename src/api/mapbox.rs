use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use super::Geocoder;
use super::backoff::Backoff;
use crate::config::MapboxConfig;
use crate::domain::Coordinates;

const MAPBOX_GEOCODE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";
const USER_AGENT: &str = "geoaid/0.1.0";
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Mapbox forward-geocoding response. `features` holds best matches in
/// relevance order; with `limit=1` at most one is returned.
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    #[serde(default)]
    center: Option<serde_json::Value>,
}

/// A failed attempt that is worth retrying.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("request error: {0}")]
    Transport(reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("invalid JSON response: {0}")]
    Body(reqwest::Error),
}

enum AttemptOutcome {
    Found(Coordinates),
    NoMatch,
}

/// Blocking Mapbox geocoding client.
///
/// Holds one HTTP client for the whole run so sequential lookups reuse
/// the connection. Lookups never fail hard: transient errors are
/// retried with exponential backoff, everything else degrades to
/// "no match".
pub struct GeocodeClient {
    http: reqwest::blocking::Client,
    access_token: String,
    country: String,
    max_attempts: u32,
}

impl GeocodeClient {
    pub fn new(access_token: String, config: &MapboxConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            access_token,
            country: config.country.clone(),
            max_attempts: config.max_attempts,
        })
    }

    /// The address is percent-encoded into the URL path per the Mapbox
    /// places API.
    fn lookup_url(&self, address: &str) -> Option<Url> {
        let mut url = Url::parse(MAPBOX_GEOCODE_URL).ok()?;
        url.path_segments_mut()
            .ok()?
            .push(&format!("{address}.json"));
        Some(url)
    }

    /// One request against the geocoding endpoint. `Err` means the
    /// attempt may be retried; `Ok(NoMatch)` is terminal for this
    /// address.
    fn attempt(&self, url: Url, address: &str) -> Result<AttemptOutcome, AttemptError> {
        let response = self
            .http
            .get(url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("limit", "1"),
                ("autocomplete", "false"),
                ("country", self.country.as_str()),
            ])
            .send()
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AttemptError::Status(status));
        }

        if status != StatusCode::OK {
            let message = response
                .json::<serde_json::Value>()
                .ok()
                .and_then(|body| {
                    body.get("message")
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or_default();
            eprintln!("Geocode failed for '{address}' - HTTP {status}: {message}");
            return Ok(AttemptOutcome::NoMatch);
        }

        let body: GeocodeResponse = response.json().map_err(AttemptError::Body)?;
        let Some(first) = body.features.into_iter().next() else {
            return Ok(AttemptOutcome::NoMatch);
        };

        match first.center.as_ref().and_then(coordinates_from_center) {
            Some(coords) => Ok(AttemptOutcome::Found(coords)),
            None => Ok(AttemptOutcome::NoMatch),
        }
    }
}

impl Geocoder for GeocodeClient {
    fn resolve(&mut self, address: &str) -> Option<Coordinates> {
        let address = address.trim();
        if address.is_empty() {
            return None;
        }

        let url = self.lookup_url(address)?;

        let mut backoff = Backoff::new(INITIAL_BACKOFF);
        for attempt in 1..=self.max_attempts {
            match self.attempt(url.clone(), address) {
                Ok(AttemptOutcome::Found(coords)) => return Some(coords),
                Ok(AttemptOutcome::NoMatch) => return None,
                Err(err) => {
                    if attempt >= self.max_attempts {
                        eprintln!("Geocoding '{address}' failed after {attempt} attempts: {err}");
                        return None;
                    }
                    thread::sleep(backoff.next_delay());
                }
            }
        }

        None
    }
}

/// Mapbox encodes the best-match position as `center: [lon, lat]`.
/// Anything that is not a two-element numeric array counts as missing.
fn coordinates_from_center(center: &serde_json::Value) -> Option<Coordinates> {
    let pair = center.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let lon = pair[0].as_f64()?;
    let lat = pair[1].as_f64()?;
    Some(Coordinates { lat, lon })
}
