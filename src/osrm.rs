//! OSRM HTTP adapter for road distance matrices.

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::traits::DistanceMatrixProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum OsrmError {
    #[error("OSRM request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, OsrmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn table_url(&self, locations: &[(f64, f64)]) -> String {
        let coords = locations
            .iter()
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?annotations=distance",
            self.config.base_url, self.config.profile, coords
        )
    }

    fn fetch_table(&self, locations: &[(f64, f64)]) -> Result<OsrmTableResponse, OsrmError> {
        let body = self
            .client
            .get(self.table_url(locations))
            .send()?
            .error_for_status()?
            .json::<OsrmTableResponse>()?;
        Ok(body)
    }
}

impl DistanceMatrixProvider for OsrmClient {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<Option<f64>>> {
        if locations.is_empty() {
            return Vec::new();
        }

        match self.fetch_table(locations) {
            Ok(body) => body
                .distances
                .unwrap_or_default()
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|meters| meters.map(|m| m / 1000.0))
                        .collect()
                })
                .collect(),
            Err(err) => {
                warn!(
                    "OSRM table lookup failed for {} locations: {}",
                    locations.len(),
                    err
                );
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    distances: Option<Vec<Vec<Option<f64>>>>,
}
