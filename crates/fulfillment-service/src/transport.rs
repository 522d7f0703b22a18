//! Invocation-shape normalization.
//!
//! Handlers are reached two ways: directly by the orchestration engine
//! with a structured JSON event, and through an HTTP gateway that wraps
//! the real payload in an envelope whose `body` field is a serialized
//! JSON string. Both shapes decode into the same canonical request
//! type, and the response is re-wrapped to match whichever shape came
//! in: wrapped callers get an HTTP-200 envelope carrying the effective
//! status code, direct callers get the plain payload under the real
//! status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use fulfillment_types::ErrorResponse;
use fulfillment_workflow::WorkflowError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while decoding an inbound payload. Always a caller
/// fault, mapped to 400.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("Malformed request body: {0}")]
	MalformedBody(String),
}

/// Which shape the inbound invocation used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
	Direct,
	Wrapped,
}

/// Decodes a payload of either shape into the canonical request type.
pub fn decode<T: DeserializeOwned>(payload: &Value) -> Result<(T, ResponseShape), TransportError> {
	if let Some(body) = payload.get("body").and_then(Value::as_str) {
		let request =
			serde_json::from_str(body).map_err(|e| TransportError::MalformedBody(e.to_string()))?;
		return Ok((request, ResponseShape::Wrapped));
	}

	let request = serde_json::from_value(payload.clone())
		.map_err(|e| TransportError::MalformedBody(e.to_string()))?;
	Ok((request, ResponseShape::Direct))
}

/// Encodes a payload in the shape the invocation arrived in.
pub fn respond<T: Serialize>(shape: ResponseShape, status: StatusCode, payload: &T) -> Response {
	match shape {
		ResponseShape::Direct => (status, Json(serde_json::to_value(payload).unwrap_or_default()))
			.into_response(),
		ResponseShape::Wrapped => {
			let body = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
			Json(serde_json::json!({
				"statusCode": status.as_u16(),
				"headers": { "Content-Type": "application/json" },
				"body": body,
			}))
			.into_response()
		}
	}
}

/// Encodes a workflow failure in the shape the invocation arrived in.
pub fn respond_error(shape: ResponseShape, error: &WorkflowError) -> Response {
	let status = status_for(error);
	respond(
		shape,
		status,
		&ErrorResponse {
			error: error.to_string(),
		},
	)
}

/// HTTP status classification of workflow failures.
pub fn status_for(error: &WorkflowError) -> StatusCode {
	match error {
		WorkflowError::MissingParameter(_) => StatusCode::BAD_REQUEST,
		WorkflowError::OrderNotFound => StatusCode::NOT_FOUND,
		WorkflowError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
		WorkflowError::NoCapacity(_) => StatusCode::SERVICE_UNAVAILABLE,
		WorkflowError::ExecutionConflict(_) => StatusCode::CONFLICT,
		WorkflowError::NoPendingConfirmation => StatusCode::CONFLICT,
		WorkflowError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

impl IntoResponse for TransportError {
	fn into_response(self) -> Response {
		(
			StatusCode::BAD_REQUEST,
			Json(ErrorResponse {
				error: self.to_string(),
			}),
		)
			.into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_types::StageRequest;

	#[test]
	fn test_decode_direct_event() {
		let payload = serde_json::json!({
			"location": "loc-1",
			"order_id": "p-1",
		});
		let (request, shape) = decode::<StageRequest>(&payload).unwrap();
		assert_eq!(shape, ResponseShape::Direct);
		assert_eq!(request.location, "loc-1");
		assert_eq!(request.order_id, "p-1");
	}

	#[test]
	fn test_decode_wrapped_envelope() {
		let payload = serde_json::json!({
			"body": "{\"location\": \"loc-1\", \"order_id\": \"p-1\"}",
			"headers": { "Content-Type": "application/json" },
		});
		let (request, shape) = decode::<StageRequest>(&payload).unwrap();
		assert_eq!(shape, ResponseShape::Wrapped);
		assert_eq!(request.order_id, "p-1");
	}

	#[test]
	fn test_decode_rejects_unparseable_body() {
		let payload = serde_json::json!({ "body": "not json" });
		let result = decode::<StageRequest>(&payload);
		assert!(matches!(result, Err(TransportError::MalformedBody(_))));
	}

	#[test]
	fn test_wrapped_error_carries_effective_status() {
		let response = respond_error(ResponseShape::Wrapped, &WorkflowError::OrderNotFound);
		// The envelope itself travels under 200.
		assert_eq!(response.status(), StatusCode::OK);
	}

	#[test]
	fn test_direct_error_uses_real_status() {
		let response = respond_error(ResponseShape::Direct, &WorkflowError::OrderNotFound);
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn test_status_classification() {
		assert_eq!(
			status_for(&WorkflowError::MissingParameter("x".into())),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			status_for(&WorkflowError::NoCapacity(fulfillment_types::StaffRole::Cook)),
			StatusCode::SERVICE_UNAVAILABLE
		);
		assert_eq!(
			status_for(&WorkflowError::Infrastructure("boom".into())),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}
}
