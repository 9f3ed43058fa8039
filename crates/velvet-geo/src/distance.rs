//! Distance provider contract and HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use velvet_core::config::GeoConfig;
use velvet_core::error::VelvetError;
use velvet_core::types::Coordinates;

use crate::fallback::{extract_coordinates, haversine_meters};

/// Errors from the distance collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("destination could not be resolved: {0}")]
    Unresolvable(String),
}

impl From<GeoError> for VelvetError {
    fn from(err: GeoError) -> Self {
        VelvetError::Distance(err.to_string())
    }
}

/// How a distance figure was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    /// The primary distance-matrix API.
    Api,
    /// Great-circle straight-line estimate.
    StraightLine,
}

/// A resolved distance from the user to a venue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistanceResult {
    pub meters: u32,
    /// Human-readable distance, e.g. "4.2 km".
    pub text: String,
    /// Human-readable travel time; absent for straight-line estimates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_text: Option<String>,
    pub method: DistanceMethod,
}

/// The geo distance collaborator.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Distance from `origin` to a venue reference (map link or address).
    async fn distance(
        &self,
        origin: Coordinates,
        destination_ref: &str,
    ) -> Result<DistanceResult, GeoError>;
}

/// Client for a distance-matrix style HTTP API with a straight-line
/// fallback for references that carry coordinates.
pub struct HttpDistanceProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    mode: String,
    allow_fallback: bool,
}

impl HttpDistanceProvider {
    pub fn new(config: &GeoConfig) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeoError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            mode: config.mode.clone(),
            allow_fallback: config.allow_fallback,
        })
    }

    async fn query_api(
        &self,
        origin: Coordinates,
        destination_ref: &str,
    ) -> Result<DistanceResult, GeoError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origins", format!("{},{}", origin.lat, origin.lng)),
                ("destinations", destination_ref.to_string()),
                ("mode", self.mode.clone()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| GeoError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Http(format!("HTTP {}", status.as_u16())));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|e| GeoError::MalformedResponse(e.to_string()))?;

        parse_matrix(body)
    }

    fn straight_line(
        &self,
        origin: Coordinates,
        destination_ref: &str,
    ) -> Result<DistanceResult, GeoError> {
        let dest = extract_coordinates(destination_ref)
            .ok_or_else(|| GeoError::Unresolvable(destination_ref.to_string()))?;
        let meters = haversine_meters(origin, dest).round() as u32;
        Ok(DistanceResult {
            meters,
            text: format_distance(meters),
            duration_text: None,
            method: DistanceMethod::StraightLine,
        })
    }
}

#[async_trait]
impl DistanceProvider for HttpDistanceProvider {
    async fn distance(
        &self,
        origin: Coordinates,
        destination_ref: &str,
    ) -> Result<DistanceResult, GeoError> {
        match self.query_api(origin, destination_ref).await {
            Ok(result) => Ok(result),
            Err(e) if self.allow_fallback => {
                tracing::debug!(error = %e, "Distance API failed, trying straight-line fallback");
                self.straight_line(origin, destination_ref)
            }
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Matrix response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<ValueText>,
    #[serde(default)]
    duration: Option<ValueText>,
}

#[derive(Debug, Deserialize)]
struct ValueText {
    value: u64,
    text: String,
}

fn parse_matrix(body: MatrixResponse) -> Result<DistanceResult, GeoError> {
    let element = body
        .rows
        .into_iter()
        .next()
        .and_then(|r| r.elements.into_iter().next())
        .ok_or_else(|| GeoError::MalformedResponse("no matrix elements".to_string()))?;

    if element.status != "OK" {
        return Err(GeoError::Unresolvable(element.status));
    }

    let distance = element
        .distance
        .ok_or_else(|| GeoError::MalformedResponse("element missing distance".to_string()))?;

    Ok(DistanceResult {
        meters: distance.value.min(u64::from(u32::MAX)) as u32,
        text: distance.text,
        duration_text: element.duration.map(|d| d.text),
        method: DistanceMethod::Api,
    })
}

/// Format meters the way the matrix API formats its `text` field.
fn format_distance(meters: u32) -> String {
    if meters < 1000 {
        format!("{} m", meters)
    } else {
        format!("{:.1} km", f64::from(meters) / 1000.0)
    }
}
