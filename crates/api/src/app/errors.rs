use axum::http::StatusCode;
use axum::response::IntoResponse;

use indoormap_core::MapError;
use indoormap_infra::{ServiceError, StoreError};

use crate::app::dto::ErrorBody;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        ServiceError::RoutingUnavailable(msg) => {
            tracing::error!(%msg, "routing unavailable");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "routing_unavailable", msg)
        }
        ServiceError::Schema(e) => {
            tracing::error!(error = %e, "schema mismatch");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "schema_error", e.to_string())
        }
        ServiceError::Store(StoreError::Unavailable(msg)) => {
            tracing::error!(%msg, "database unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "database_unavailable",
                "database unavailable",
            )
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "database error");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                "database query failed",
            )
        }
    }
}

pub fn map_error_to_response(err: MapError) -> axum::response::Response {
    service_error_to_response(err.into())
}

/// 400 for a request the extractors could not parse.
pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

pub fn error_body(code: &'static str, message: impl Into<String>) -> ErrorBody {
    ErrorBody {
        error: code.to_string(),
        message: message.into(),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (status, axum::Json(error_body(code, message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoormap_infra::schema::SchemaError;

    fn status(err: ServiceError) -> StatusCode {
        service_error_to_response(err).status()
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(status(ServiceError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ServiceError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(ServiceError::RoutingUnavailable("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(SchemaError::MissingTable("t".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(StoreError::Unavailable("down".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(StoreError::Decode("bad".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_ids_are_bad_requests() {
        assert_eq!(
            map_error_to_response(MapError::invalid_id("start: not a number")).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
