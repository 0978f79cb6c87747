// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use actix_web::{HttpRequest, HttpResponse, Responder, http::StatusCode, web};
use graft_matching::EngineError;
use graft_sdk::types::{
	AcceptReceipt, DonationFields, DonationFilter, DonationList, DonationReceipt, ErrorBody,
	FulfillReceipt, MatchList, RecordId, RequestFields, RequestFilter, RequestList,
	RequestReceipt, SUBMISSION_KEY_REUSED, SubmissionKey,
};
use graft_settlement::{Caller, SettlementError, ValidationError};
use thiserror::Error;

use crate::{
	admission,
	admission::AdmissionError,
	auth::{AuthContext, AuthError},
	dispatcher::DispatcherError,
	request_context::RequestContext,
	server::GatewayState,
};

/// Error types for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
	#[error("Authentication error: {0}")]
	Auth(#[from] AuthError),
	#[error("Admission error: {0}")]
	Admission(#[from] AdmissionError),
	#[error(transparent)]
	Dispatch(#[from] DispatcherError),
	#[error("Invalid request body: {0}")]
	BadPayload(String),
}

impl GatewayError {
	/// HTTP status and error code for the JSON body
	pub fn classify(&self) -> (StatusCode, &'static str) {
		match self {
			GatewayError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
			GatewayError::Admission(AdmissionError::RateLimitExceeded) => {
				(StatusCode::TOO_MANY_REQUESTS, "rate_limited")
			}
			GatewayError::Admission(AdmissionError::InvalidSubmissionKey(_)) => {
				(StatusCode::BAD_REQUEST, "validation_error")
			}
			GatewayError::Admission(AdmissionError::InvalidQuota(_)) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
			}
			GatewayError::BadPayload(_) => (StatusCode::BAD_REQUEST, "validation_error"),
			GatewayError::Dispatch(DispatcherError::Timeout(_)) => {
				(StatusCode::GATEWAY_TIMEOUT, "timeout")
			}
			GatewayError::Dispatch(DispatcherError::Engine(e)) => classify_engine(e),
		}
	}
}

fn classify_engine(error: &EngineError) -> (StatusCode, &'static str) {
	match error {
		EngineError::Settlement(e) => match e {
			SettlementError::Validation(ValidationError::SubmissionKeyReused) => {
				(StatusCode::BAD_REQUEST, SUBMISSION_KEY_REUSED)
			}
			SettlementError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
			SettlementError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthorized"),
			SettlementError::SelfSettlement { .. } => (StatusCode::FORBIDDEN, "forbidden"),
			SettlementError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			SettlementError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
		},
		EngineError::SettlementNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
		EngineError::NotParticipant(_) => (StatusCode::FORBIDDEN, "forbidden"),
		EngineError::Overloaded | EngineError::Shutdown => {
			(StatusCode::SERVICE_UNAVAILABLE, "overloaded")
		}
		EngineError::Storage(_)
		| EngineError::State(_)
		| EngineError::Inconsistent(_)
		| EngineError::Spawn(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
	}
}

impl actix_web::ResponseError for GatewayError {
	fn status_code(&self) -> StatusCode {
		self.classify().0
	}

	fn error_response(&self) -> HttpResponse {
		let (status, code) = self.classify();

		// Internal details stay in the log
		let message = if status.is_server_error() && status != StatusCode::GATEWAY_TIMEOUT {
			tracing::error!(target: "server", error = %self, "Request failed");
			match status {
				StatusCode::SERVICE_UNAVAILABLE => "Service is busy, please retry".to_string(),
				_ => "Internal server error".to_string(),
			}
		} else {
			self.to_string()
		};

		HttpResponse::build(status).json(ErrorBody {
			error: code.to_string(),
			message,
		})
	}
}

/// Authenticate the caller and charge their rate limit
fn admit(state: &GatewayState, req: &HttpRequest) -> Result<Caller, GatewayError> {
	let auth_ctx = AuthContext::from_http(req.headers());
	let caller = state.auth_provider.authenticate(&auth_ctx).map_err(|e| {
		let request_id = RequestContext::from_http(req).map(|ctx| ctx.request_id);
		tracing::warn!(target: "gateway::request", ?request_id, error = %e, "Authentication failed");
		e
	})?;
	state.admission.check_rate_limit(&caller.user_id)?;
	Ok(caller)
}

/// Like [`admit`], for writes: also reads the `Idempotency-Key` header
fn admit_write(
	state: &GatewayState,
	req: &HttpRequest,
) -> Result<(Caller, Option<SubmissionKey>), GatewayError> {
	let caller = admit(state, req)?;
	let key = admission::submission_key(req.headers())?;
	Ok((caller, key))
}

/// Health check endpoint
pub async fn health() -> impl Responder {
	HttpResponse::Ok().json(serde_json::json!({
		"status": "ok",
		"service": "graft-gateway"
	}))
}

pub async fn list_donations(
	state: web::Data<GatewayState>,
	filter: web::Query<DonationFilter>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	admit(&state, &req)?;
	let donations = state.dispatcher.list_donations(filter.into_inner()).await?;
	Ok(HttpResponse::Ok().json(DonationList { donations }))
}

pub async fn list_requests(
	state: web::Data<GatewayState>,
	filter: web::Query<RequestFilter>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	admit(&state, &req)?;
	let requests = state.dispatcher.list_requests(filter.into_inner()).await?;
	Ok(HttpResponse::Ok().json(RequestList { requests }))
}

/// Pending requests the posted donation could fulfill. Writes nothing.
pub async fn check_donation_matches(
	state: web::Data<GatewayState>,
	fields: web::Json<DonationFields>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let caller = admit(&state, &req)?;
	let matches = state
		.dispatcher
		.check_donation_matches(caller.user_id, fields.into_inner())
		.await?;
	Ok(HttpResponse::Ok().json(MatchList { matches }))
}

/// Pending donations the posted request could accept. Writes nothing.
pub async fn check_request_matches(
	state: web::Data<GatewayState>,
	fields: web::Json<RequestFields>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let caller = admit(&state, &req)?;
	let matches = state
		.dispatcher
		.check_request_matches(caller.user_id, fields.into_inner())
		.await?;
	Ok(HttpResponse::Ok().json(MatchList { matches }))
}

pub async fn create_donation(
	state: web::Data<GatewayState>,
	fields: web::Json<DonationFields>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let (caller, key) = admit_write(&state, &req)?;
	let donation = state
		.dispatcher
		.create_donation(caller, fields.into_inner(), key)
		.await?;

	tracing::info!(target: "server", donation_id = donation.id, "Donation created");
	Ok(HttpResponse::Created().json(DonationReceipt {
		message: "Donation created successfully".to_string(),
		donation,
	}))
}

pub async fn create_request(
	state: web::Data<GatewayState>,
	fields: web::Json<RequestFields>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let (caller, key) = admit_write(&state, &req)?;
	let request = state
		.dispatcher
		.create_request(caller, fields.into_inner(), key)
		.await?;

	tracing::info!(target: "server", request_id = request.id, "Request created");
	Ok(HttpResponse::Created().json(RequestReceipt {
		message: "Request created successfully".to_string(),
		request,
	}))
}

/// Fulfill a pending request with the donation described in the body
///
/// No donation record is created; the ledger stores a settlement instead.
pub async fn fulfill_request(
	state: web::Data<GatewayState>,
	path: web::Path<RecordId>,
	fields: web::Json<DonationFields>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let (caller, key) = admit_write(&state, &req)?;
	let request_id = path.into_inner();
	let (request, settlement) = state
		.dispatcher
		.fulfill_request(caller, request_id, fields.into_inner(), key)
		.await?;

	tracing::info!(
		target: "server",
		request_id,
		settlement_id = %settlement.id,
		"Request fulfilled"
	);
	Ok(HttpResponse::Ok().json(FulfillReceipt {
		message: "Request fulfilled successfully".to_string(),
		request,
		settlement,
	}))
}

pub async fn accept_donation(
	state: web::Data<GatewayState>,
	path: web::Path<RecordId>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let (caller, key) = admit_write(&state, &req)?;
	let donation_id = path.into_inner();
	let (donation, settlement) = state
		.dispatcher
		.accept_donation(caller, donation_id, key)
		.await?;

	tracing::info!(
		target: "server",
		donation_id,
		settlement_id = %settlement.id,
		"Donation accepted"
	);
	Ok(HttpResponse::Ok().json(AcceptReceipt {
		message: "Donation accepted successfully".to_string(),
		donation,
		settlement,
	}))
}

pub async fn my_activity(
	state: web::Data<GatewayState>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let caller = admit(&state, &req)?;
	let activity = state.dispatcher.activity(caller.user_id).await?;
	Ok(HttpResponse::Ok().json(activity))
}

pub async fn match_detail(
	state: web::Data<GatewayState>,
	path: web::Path<String>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let caller = admit(&state, &req)?;
	let detail = state
		.dispatcher
		.match_detail(caller.user_id, path.into_inner())
		.await?;
	Ok(HttpResponse::Ok().json(detail))
}
