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

use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
	api::LedgerApi,
	types::{
		AcceptReceipt, Activity, Donation, DonationFields, DonationFilter, DonationList,
		DonationReceipt, ErrorBody, FulfillReceipt, IDEMPOTENCY_KEY_HEADER, MatchDetail, MatchList,
		RecordId, Request, RequestFields, RequestFilter, RequestList, RequestReceipt,
		SUBMISSION_KEY_REUSED, SubmissionKey,
	},
};

/// Error types for client operations
///
/// HTTP failures are classified back into the service error taxonomy so
/// callers can decide between editing, retrying and refreshing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Authentication error: {0}")]
	Authentication(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	/// The submission key was already spent on a different write
	#[error("Submission key reused: {0}")]
	KeyReused(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Server error: {0}")]
	Server(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl ClientError {
	/// Classify a non-success HTTP status
	pub fn from_status(status: StatusCode, message: String) -> Self {
		match status {
			StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
				ClientError::Validation(message)
			}
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Authentication(message),
			StatusCode::NOT_FOUND => ClientError::NotFound(message),
			StatusCode::CONFLICT => ClientError::Conflict(message),
			_ => ClientError::Server(format!("{}: {}", status, message)),
		}
	}

	/// Classifies a gateway error response, falling back to the raw text
	pub fn from_body(status: StatusCode, text: String) -> Self {
		match serde_json::from_str::<ErrorBody>(&text) {
			Ok(body) if body.error == SUBMISSION_KEY_REUSED => ClientError::KeyReused(body.message),
			Ok(body) => ClientError::from_status(status, body.message),
			Err(_) => ClientError::from_status(status, text),
		}
	}

	/// Failure that may succeed if sent again unchanged
	pub fn is_retryable(&self) -> bool {
		matches!(self, ClientError::Network(_) | ClientError::Server(_))
	}

	/// The chosen counterpart is gone or already settled
	pub fn is_stale_target(&self) -> bool {
		matches!(self, ClientError::Conflict(_) | ClientError::NotFound(_))
	}
}

/// Client for the Graft record store API
///
/// This is an async client interface using reqwest for HTTP communication.
/// Every call carries the bearer token set with [`Client::with_token`].
pub struct Client {
	base_url: String,
	client: ReqwestClient,
	token: Option<String>,
}

impl Client {
	/// Create a new client with the given base URL
	pub fn new(base_url: impl Into<String>) -> Self {
		Self::with_config(base_url, Duration::from_secs(30))
	}

	/// Create a new client with custom configuration
	pub fn with_config(base_url: impl Into<String>, timeout: Duration) -> Self {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.expect("Failed to create HTTP client");

		Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client,
			token: None,
		}
	}

	/// Attach the bearer token issued at sign-in
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	fn url(&self, path: &str) -> String {
		format!("{}/api{}", self.base_url, path)
	}

	fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
		match &self.token {
			Some(token) => builder.bearer_auth(token),
			None => builder,
		}
	}

	async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
		let response = self
			.authorized(builder)
			.send()
			.await
			.map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

		decode(response).await
	}

	/// Check gateway health
	pub async fn health_check(&self) -> Result<bool, ClientError> {
		let url = format!("{}/health", self.base_url);

		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

		Ok(response.status().is_success())
	}
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
	let status = response.status();
	if !status.is_success() {
		let error_text = response
			.text()
			.await
			.unwrap_or_else(|_| format!("HTTP {}", status));
		return Err(ClientError::from_body(status, error_text));
	}

	response
		.json()
		.await
		.map_err(|e| ClientError::Serialization(format!("Failed to parse response: {}", e)))
}

impl LedgerApi for Client {
	async fn list_donations(&self, filter: &DonationFilter) -> Result<Vec<Donation>, ClientError> {
		let list: DonationList = self
			.send(self.client.get(self.url("/donations")).query(filter))
			.await?;
		Ok(list.donations)
	}

	async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, ClientError> {
		let list: RequestList = self
			.send(self.client.get(self.url("/requests")).query(filter))
			.await?;
		Ok(list.requests)
	}

	async fn check_donation_matches(
		&self,
		fields: &DonationFields,
	) -> Result<Vec<Request>, ClientError> {
		let list: MatchList<Request> = self
			.send(
				self.client
					.post(self.url("/donations/check-matches"))
					.json(fields),
			)
			.await?;
		Ok(list.matches)
	}

	async fn check_request_matches(
		&self,
		fields: &RequestFields,
	) -> Result<Vec<Donation>, ClientError> {
		let list: MatchList<Donation> = self
			.send(
				self.client
					.post(self.url("/requests/check-matches"))
					.json(fields),
			)
			.await?;
		Ok(list.matches)
	}

	async fn create_donation(
		&self,
		fields: &DonationFields,
		key: &SubmissionKey,
	) -> Result<Donation, ClientError> {
		let receipt: DonationReceipt = self
			.send(
				self.client
					.post(self.url("/donations"))
					.header(IDEMPOTENCY_KEY_HEADER, key.as_str())
					.json(fields),
			)
			.await?;
		Ok(receipt.donation)
	}

	async fn create_request(
		&self,
		fields: &RequestFields,
		key: &SubmissionKey,
	) -> Result<Request, ClientError> {
		let receipt: RequestReceipt = self
			.send(
				self.client
					.post(self.url("/requests"))
					.header(IDEMPOTENCY_KEY_HEADER, key.as_str())
					.json(fields),
			)
			.await?;
		Ok(receipt.request)
	}

	async fn fulfill_request(
		&self,
		request_id: RecordId,
		fields: &DonationFields,
		key: &SubmissionKey,
	) -> Result<FulfillReceipt, ClientError> {
		self.send(
			self.client
				.put(self.url(&format!("/requests/{}/fulfill", request_id)))
				.header(IDEMPOTENCY_KEY_HEADER, key.as_str())
				.json(fields),
		)
		.await
	}

	async fn accept_donation(
		&self,
		donation_id: RecordId,
		key: &SubmissionKey,
	) -> Result<AcceptReceipt, ClientError> {
		self.send(
			self.client
				.put(self.url(&format!("/donations/{}/accept", donation_id)))
				.header(IDEMPOTENCY_KEY_HEADER, key.as_str()),
		)
		.await
	}

	async fn my_activity(&self) -> Result<Activity, ClientError> {
		self.send(self.client.get(self.url("/my-activity"))).await
	}

	async fn match_detail(&self, settlement_id: &str) -> Result<MatchDetail, ClientError> {
		self.send(
			self.client
				.get(self.url(&format!("/settlements/{}", settlement_id))),
		)
		.await
	}
}
