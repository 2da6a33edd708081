//! Request and response DTOs.
//!
//! Query-string fields are optional strings so that missing or malformed
//! values reach the core parsers, which produce the 400 messages.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use indoormap_infra::DatabaseStatus;

#[derive(Debug, Default, Deserialize)]
pub struct PathParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub directed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AstarParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub directed: Option<String>,
    pub heuristic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViaParams {
    pub points: Option<String>,
    pub directed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IsochroneParams {
    pub start: Option<String>,
    pub max_cost: Option<String>,
    pub directed: Option<String>,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `validation_error`.
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(value_type = String, example = "ok")]
    pub status: &'static str,
    #[schema(value_type = String, example = "ok")]
    pub database: &'static str,
    #[serde(flatten)]
    pub extensions: DatabaseStatus,
}

/// 503 body of the health check.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthFailure {
    #[schema(value_type = String, example = "unavailable")]
    pub status: &'static str,
    #[schema(value_type = String, example = "unreachable")]
    pub database: &'static str,
    #[serde(flatten)]
    pub error: ErrorBody,
}
