//! HTTP server for the permit engine API.
//!
//! This module provides a minimal HTTP server exposing the engine's single
//! mutating entry point and its read-only queries.

use alloy_primitives::{Address, U256};
use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use permit_config::ApiConfig;
use permit_core::{PermitEngine, PermitError};
use permit_types::{address_hex, PermitSignature};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the engine for processing requests.
	pub engine: Arc<PermitEngine>,
}

/// Body of a POST /api/permit request.
#[derive(Debug, Deserialize)]
pub struct PermitRequest {
	pub owner: Address,
	pub spender: Address,
	pub value: U256,
	pub deadline: U256,
	pub signature: PermitSignature,
}

/// Body of a successful POST /api/permit response.
#[derive(Debug, Serialize)]
pub struct PermitResponse {
	pub status: &'static str,
	pub owner: Address,
	pub spender: Address,
	pub value: U256,
}

/// API error with an HTTP status and a JSON body.
pub struct ApiError {
	status: StatusCode,
	kind: &'static str,
	message: String,
}

impl ApiError {
	fn bad_request(message: impl Into<String>) -> Self {
		Self {
			status: StatusCode::BAD_REQUEST,
			kind: "bad_request",
			message: message.into(),
		}
	}
}

impl From<PermitError> for ApiError {
	fn from(err: PermitError) -> Self {
		let (status, kind) = match &err {
			PermitError::Expired { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "expired"),
			PermitError::InvalidSignatureEncoding(_) => {
				(StatusCode::UNPROCESSABLE_ENTITY, "invalid_signature_encoding")
			}
			PermitError::SignerMismatch { .. } => {
				(StatusCode::UNPROCESSABLE_ENTITY, "signer_mismatch")
			}
			PermitError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
		};
		Self {
			status,
			kind,
			message: err.to_string(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = Json(json!({
			"error": self.kind,
			"message": self.message,
		}));
		(self.status, body).into_response()
	}
}

/// Starts the HTTP server for the API.
///
/// This function creates and configures the HTTP server with routing,
/// middleware, and error handling for the endpoints.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<PermitEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { engine };

	// Build the router with /api base path
	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/permit", post(handle_permit))
				.route("/nonce/{owner}", get(handle_nonce))
				.route("/allowance/{owner}/{spender}", get(handle_allowance))
				.route("/domain", get(handle_domain)),
		)
		.layer(CorsLayer::permissive())
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Permit API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/permit requests.
///
/// Submits a signed authorization intent; on success the allowance is
/// recorded and the owner's nonce has advanced.
async fn handle_permit(
	State(state): State<AppState>,
	Json(request): Json<PermitRequest>,
) -> Result<Json<PermitResponse>, ApiError> {
	state
		.engine
		.permit(
			request.owner,
			request.spender,
			request.value,
			request.deadline,
			request.signature,
		)
		.await?;

	Ok(Json(PermitResponse {
		status: "applied",
		owner: request.owner,
		spender: request.spender,
		value: request.value,
	}))
}

/// Handles GET /api/nonce/{owner} requests.
async fn handle_nonce(
	Path(owner): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let owner = parse_address(&owner)?;
	let nonce = state.engine.nonce_of(&owner).await?;
	Ok(Json(json!({
		"owner": address_hex(&owner),
		"nonce": nonce,
	})))
}

/// Handles GET /api/allowance/{owner}/{spender} requests.
async fn handle_allowance(
	Path((owner, spender)): Path<(String, String)>,
	State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let owner = parse_address(&owner)?;
	let spender = parse_address(&spender)?;
	let value = state.engine.allowance(&owner, &spender).await?;
	Ok(Json(json!({
		"owner": address_hex(&owner),
		"spender": address_hex(&spender),
		"value": value,
	})))
}

/// Handles GET /api/domain requests.
///
/// Returns the domain binding and the cached separator so clients can
/// construct signatures against the right deployment.
async fn handle_domain(State(state): State<AppState>) -> Json<serde_json::Value> {
	let domain = state.engine.domain();
	Json(json!({
		"name": domain.name(),
		"version": domain.version(),
		"chain_id": domain.chain_id(),
		"verifying_contract": address_hex(domain.verifying_contract()),
		"separator": state.engine.domain_separator().to_string(),
	}))
}

fn parse_address(input: &str) -> Result<Address, ApiError> {
	input
		.parse::<Address>()
		.map_err(|e| ApiError::bad_request(format!("Invalid address '{}': {}", input, e)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_permit_request_deserializes() {
		let body = r#"{
			"owner": "0x1111111111111111111111111111111111111111",
			"spender": "0x2222222222222222222222222222222222222222",
			"value": "0x64",
			"deadline": "0xee6b2800",
			"signature": {
				"v": 27,
				"r": "0x0101010101010101010101010101010101010101010101010101010101010101",
				"s": "0x0202020202020202020202020202020202020202020202020202020202020202"
			}
		}"#;
		let request: PermitRequest = serde_json::from_str(body).unwrap();
		assert_eq!(request.owner, Address::repeat_byte(0x11));
		assert_eq!(request.value, U256::from(100u64));
		assert_eq!(request.signature.v, 27);
	}

	#[test]
	fn test_error_mapping() {
		let err = ApiError::from(PermitError::Expired {
			deadline: U256::ZERO,
		});
		assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(err.kind, "expired");

		let err = ApiError::from(PermitError::Storage("disk full".into()));
		assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(err.kind, "storage");

		let err = ApiError::from(PermitError::SignerMismatch {
			recovered: Address::ZERO,
			owner: Address::repeat_byte(0x01),
		});
		assert_eq!(err.kind, "signer_mismatch");
	}

	#[test]
	fn test_parse_address_rejects_garbage() {
		assert!(parse_address("0x1111111111111111111111111111111111111111").is_ok());
		assert!(parse_address("garbage").is_err());
	}
}
