//! Address to coordinate lookups.
//!
//! [`Geocoder`] is the seam callers depend on. [`GoogleGeocoder`] talks to the
//! Google Geocoding API (or anything answering in the same JSON shape) and
//! [`CachingGeocoder`] memoizes any geocoder per exact address string.

use crate::errors::GeocodeError;
use crate::models::{ApiKey, Coordinates};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Resolve a free-text address. `None` means the address could not be found;
/// lookup failures never propagate as errors.
pub trait Geocoder {
    fn lookup(&self, address: &str) -> impl Future<Output = Option<Coordinates>> + Send;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Take the first result's `geometry.location` out of a geocoding response.
pub fn parse_response(body: &str) -> Result<Coordinates, GeocodeError> {
    let response: GeocodeResponse = serde_json::from_str(body)?;
    response
        .results
        .into_iter()
        .next()
        .map(|result| Coordinates::new(result.geometry.location.lat, result.geometry.location.lng))
        .ok_or(GeocodeError::NoResults)
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
    timeout: Duration,
}

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.expose())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.without_url()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::Request(e.without_url()))?;

        parse_response(&body)
    }
}

impl Geocoder for GoogleGeocoder {
    async fn lookup(&self, address: &str) -> Option<Coordinates> {
        match self.request(address).await {
            Ok(coordinates) => {
                debug!("Geocoded '{}' to ({}, {})", address, coordinates.lat, coordinates.lng);
                Some(coordinates)
            }
            Err(e) => {
                warn!("Error processing address '{}': {}", address, e);
                None
            }
        }
    }
}

/// Results of every address looked up during a run, including misses.
#[derive(Debug, Default)]
pub struct AddressGeocodeCache {
    entries: HashMap<String, Option<Coordinates>>,
}

impl AddressGeocodeCache {
    pub fn get(&self, address: &str) -> Option<Option<Coordinates>> {
        self.entries.get(address).copied()
    }

    pub fn insert(&mut self, address: String, result: Option<Coordinates>) {
        self.entries.insert(address, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct CachingGeocoder<G> {
    inner: G,
    cache: Mutex<AddressGeocodeCache>,
    external_calls: AtomicUsize,
}

impl<G: Geocoder> CachingGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: Mutex::new(AddressGeocodeCache::default()),
            external_calls: AtomicUsize::new(0),
        }
    }

    /// Lookups that reached the wrapped geocoder.
    pub fn external_calls(&self) -> usize {
        self.external_calls.load(Ordering::SeqCst)
    }

    pub fn cached_addresses(&self) -> usize {
        self.cache().len()
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn cache(&self) -> MutexGuard<'_, AddressGeocodeCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: Geocoder + Sync> Geocoder for CachingGeocoder<G> {
    async fn lookup(&self, address: &str) -> Option<Coordinates> {
        let cached = self.cache().get(address);
        if let Some(result) = cached {
            return result;
        }

        self.external_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.lookup(address).await;
        self.cache().insert(address.to_string(), result);
        result
    }
}
