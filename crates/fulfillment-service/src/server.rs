//! HTTP server for the fulfillment workflow API.
//!
//! Every handler decodes through the transport adapter so the same
//! endpoint serves gateway-wrapped requests and direct engine events.

use crate::builder::FulfillmentStack;
use crate::transport::{self, ResponseShape};
use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use fulfillment_config::ApiConfig;
use fulfillment_types::{
	AwaitConfirmationRequest, ConfirmReceiptRequest, ErrorResponse, LaunchRequest,
	LiberateRequest, StageRequest,
};
use fulfillment_workflow::StageTransition;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub stack: FulfillmentStack,
}

/// Builds the API router over an assembled stack.
pub fn router(stack: FulfillmentStack) -> Router {
	Router::new()
		.route("/orders/launch", post(handle_launch))
		.route("/orders/await-confirmation", post(handle_await_confirmation))
		.route("/orders/confirm-receipt", post(handle_confirm_receipt))
		.route("/orders/finalize", post(handle_finalize))
		.route("/orders/{location}/{order_id}", get(handle_get_order))
		.route("/orders/{location}/{order_id}/liberate", post(handle_liberate))
		.route("/stages/{stage}", post(handle_stage))
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(AppState { stack })
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	stack: FulfillmentStack,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(stack);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Fulfillment API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /orders/launch requests.
async fn handle_launch(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
	let (request, shape): (LaunchRequest, _) = match transport::decode(&payload) {
		Ok(decoded) => decoded,
		Err(e) => return e.into_response(),
	};
	match state.stack.launcher.launch(&request).await {
		Ok(receipt) => transport::respond(shape, StatusCode::OK, &receipt),
		Err(e) => transport::respond_error(shape, &e),
	}
}

/// Handles POST /stages/{cook|pack|ship} requests.
async fn handle_stage(
	Path(stage): Path<String>,
	State(state): State<AppState>,
	Json(payload): Json<Value>,
) -> Response {
	let transition = match stage.as_str() {
		"cook" => StageTransition::cooking(),
		"pack" => StageTransition::packing(),
		"ship" => StageTransition::shipping(),
		other => {
			return (
				StatusCode::NOT_FOUND,
				Json(ErrorResponse {
					error: format!("Unknown stage: {}", other),
				}),
			)
				.into_response()
		}
	};

	let (request, shape): (StageRequest, _) = match transport::decode(&payload) {
		Ok(decoded) => decoded,
		Err(e) => return e.into_response(),
	};
	match state.stack.stages.advance_stage(transition, &request).await {
		Ok(summary) => transport::respond(shape, StatusCode::OK, &summary),
		Err(e) => transport::respond_error(shape, &e),
	}
}

/// Handles POST /orders/finalize requests.
async fn handle_finalize(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
	let (request, shape): (StageRequest, _) = match transport::decode(&payload) {
		Ok(decoded) => decoded,
		Err(e) => return e.into_response(),
	};
	match state.stack.finalize.confirm_delivery(&request).await {
		Ok(summary) => transport::respond(shape, StatusCode::OK, &summary),
		Err(e) => transport::respond_error(shape, &e),
	}
}

/// Handles POST /orders/await-confirmation requests, issued by the
/// orchestration engine when the workflow suspends.
async fn handle_await_confirmation(
	State(state): State<AppState>,
	Json(payload): Json<Value>,
) -> Response {
	let (request, shape): (AwaitConfirmationRequest, _) = match transport::decode(&payload) {
		Ok(decoded) => decoded,
		Err(e) => return e.into_response(),
	};
	match state.stack.callbacks.await_confirmation(&request).await {
		Ok(()) => transport::respond(
			shape,
			StatusCode::OK,
			&serde_json::json!({ "awaiting": true }),
		),
		Err(e) => transport::respond_error(shape, &e),
	}
}

/// Handles POST /orders/confirm-receipt requests.
async fn handle_confirm_receipt(
	State(state): State<AppState>,
	Json(payload): Json<Value>,
) -> Response {
	let (request, shape): (ConfirmReceiptRequest, _) = match transport::decode(&payload) {
		Ok(decoded) => decoded,
		Err(e) => return e.into_response(),
	};
	match state.stack.callbacks.confirm_receipt(&request).await {
		Ok(()) => transport::respond(
			shape,
			StatusCode::OK,
			&serde_json::json!({ "confirmed": true }),
		),
		Err(e) => transport::respond_error(shape, &e),
	}
}

/// Handles POST /orders/{location}/{order_id}/liberate requests.
async fn handle_liberate(
	Path((location, order_id)): Path<(String, String)>,
	State(state): State<AppState>,
	payload: Option<Json<LiberateRequest>>,
) -> Response {
	let mut request = payload.map(|Json(r)| r).unwrap_or(LiberateRequest {
		location: None,
		order_id: None,
		reason: None,
		reset: true,
	});
	request.location = Some(location);
	request.order_id = Some(order_id);

	match state.stack.recovery.liberate(&request).await {
		Ok(report) => (StatusCode::OK, Json(report)).into_response(),
		Err(e) => transport::respond_error(ResponseShape::Direct, &e),
	}
}

/// Handles GET /orders/{location}/{order_id} requests.
async fn handle_get_order(
	Path((location, order_id)): Path<(String, String)>,
	State(state): State<AppState>,
) -> Response {
	match state.stack.orders.get(&location, &order_id).await {
		Ok(order) => (StatusCode::OK, Json(order)).into_response(),
		Err(e) => transport::respond_error(ResponseShape::Direct, &e.into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::build_stack;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use fulfillment_config::Config;
	use fulfillment_types::{Order, Stage, StaffRole, Worker};
	use tower::ServiceExt;

	async fn test_router() -> (Router, FulfillmentStack) {
		let config: Config = r#"
			[storage]
			backend = "memory"
			[orchestration]
			backend = "memory"
			[notification]
			backend = "log"
		"#
		.parse()
		.unwrap();
		let stack = build_stack(&config).unwrap();
		(router(stack.clone()), stack)
	}

	async fn seed_cook(stack: &FulfillmentStack) {
		stack
			.workers
			.put(&Worker {
				location: "loc-1".into(),
				id: "w-cook".into(),
				first_name: "Ana".into(),
				last_name: "Reyes".into(),
				role: StaffRole::Cook,
				busy: false,
				rating: 4.5,
			})
			.await
			.unwrap();
	}

	fn post_json(uri: &str, body: Value) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri(uri)
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap()
	}

	async fn body_json(response: Response) -> Value {
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		serde_json::from_slice(&bytes).unwrap()
	}

	#[tokio::test]
	async fn test_launch_endpoint_returns_receipt() {
		let (app, _stack) = test_router().await;
		let response = app
			.oneshot(post_json(
				"/orders/launch",
				serde_json::json!({ "location": "loc-1", "order_id": "p-1" }),
			))
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		let body = body_json(response).await;
		assert!(body["execution_name"]
			.as_str()
			.unwrap()
			.starts_with("order-p-1-"));
		assert_eq!(body["superseded"], false);
	}

	#[tokio::test]
	async fn test_cook_stage_direct_event() {
		let (app, stack) = test_router().await;
		seed_cook(&stack).await;
		stack
			.orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 1))
			.await
			.unwrap();

		let response = app
			.oneshot(post_json(
				"/stages/cook",
				serde_json::json!({ "location": "loc-1", "order_id": "p-1" }),
			))
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		let body = body_json(response).await;
		assert_eq!(body["stage"], "cooking");
		assert_eq!(body["worker_id"], "w-cook");
	}

	#[tokio::test]
	async fn test_cook_stage_wrapped_envelope() {
		let (app, stack) = test_router().await;
		seed_cook(&stack).await;
		stack
			.orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 1))
			.await
			.unwrap();

		let inner = serde_json::json!({ "location": "loc-1", "order_id": "p-1" });
		let response = app
			.oneshot(post_json(
				"/stages/cook",
				serde_json::json!({ "body": inner.to_string() }),
			))
			.await
			.unwrap();

		// Envelope travels under 200; the real status is inside.
		assert_eq!(response.status(), StatusCode::OK);
		let envelope = body_json(response).await;
		assert_eq!(envelope["statusCode"], 200);
		let inner: Value = serde_json::from_str(envelope["body"].as_str().unwrap()).unwrap();
		assert_eq!(inner["stage"], "cooking");
	}

	#[tokio::test]
	async fn test_stage_without_capacity_is_503() {
		let (app, stack) = test_router().await;
		stack
			.orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 1))
			.await
			.unwrap();

		let response = app
			.oneshot(post_json(
				"/stages/cook",
				serde_json::json!({ "location": "loc-1", "order_id": "p-1" }),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
	}

	#[tokio::test]
	async fn test_unknown_stage_is_404() {
		let (app, _stack) = test_router().await;
		let response = app
			.oneshot(post_json(
				"/stages/fold",
				serde_json::json!({ "location": "loc-1", "order_id": "p-1" }),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_get_order_roundtrip_and_missing() {
		let (app, stack) = test_router().await;
		stack
			.orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 2))
			.await
			.unwrap();

		let found = app
			.clone()
			.oneshot(
				Request::builder()
					.uri("/orders/loc-1/p-1")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(found.status(), StatusCode::OK);
		let body = body_json(found).await;
		assert_eq!(body["stage"], "processing");
		assert_eq!(body["item_count"], 2);

		let missing = app
			.oneshot(
				Request::builder()
					.uri("/orders/loc-1/p-404")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();
		assert_eq!(missing.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_confirm_receipt_without_token_is_409() {
		let (app, stack) = test_router().await;
		stack
			.orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 1))
			.await
			.unwrap();

		let response = app
			.oneshot(post_json(
				"/orders/confirm-receipt",
				serde_json::json!({ "location": "loc-1", "order_id": "p-1" }),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::CONFLICT);
	}

	#[tokio::test]
	async fn test_liberate_endpoint_reports_release() {
		let (app, stack) = test_router().await;
		stack
			.orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 1))
			.await
			.unwrap();

		let response = app
			.oneshot(post_json(
				"/orders/loc-1/p-1/liberate",
				serde_json::json!({ "reason": "operator request" }),
			))
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::OK);
		let body = body_json(response).await;
		assert_eq!(body["released"], 0);
		assert_eq!(body["reset"], true);
	}

	#[tokio::test]
	async fn test_malformed_wrapped_body_is_400() {
		let (app, _stack) = test_router().await;
		let response = app
			.oneshot(post_json(
				"/orders/launch",
				serde_json::json!({ "body": "not json" }),
			))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}
}
