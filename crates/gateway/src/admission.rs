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

//! Admission control for the gateway
//!
//! Runs before a command reaches the ledger:
//! - Rate limiting per authenticated user
//! - Validation of the `Idempotency-Key` header on writes
//!
//! Everything that depends on ledger state (status, ownership, organ match)
//! is decided by the ledger itself, never here.

use std::{num::NonZeroU32, sync::Arc};

use actix_web::http::header::HeaderMap;
use dashmap::DashMap;
use governor::{Quota, RateLimiter};
use graft_sdk::types::{IDEMPOTENCY_KEY_HEADER, SubmissionKey};
use thiserror::Error;

/// Error types for admission control
#[derive(Debug, Error)]
pub enum AdmissionError {
	#[error("Rate limit exceeded")]
	RateLimitExceeded,
	#[error("Invalid Idempotency-Key header: {0}")]
	InvalidSubmissionKey(String),
	#[error("Invalid rate limit configuration: {0}")]
	InvalidQuota(&'static str),
}

type UserRateLimiter = Arc<
	RateLimiter<
		governor::state::direct::NotKeyed,
		governor::state::InMemoryState,
		governor::clock::DefaultClock,
	>,
>;

/// Admission controller
///
/// Keeps one token bucket per user id. Buckets are created on first use.
pub struct AdmissionController {
	rate_limiters: DashMap<String, UserRateLimiter>,
	quota: Quota,
}

impl AdmissionController {
	pub fn new(requests_per_second: u32, burst: u32) -> Result<Self, AdmissionError> {
		let rps = NonZeroU32::new(requests_per_second)
			.ok_or(AdmissionError::InvalidQuota("GATEWAY_RATE_LIMIT_RPS must be > 0"))?;
		let burst = NonZeroU32::new(burst)
			.ok_or(AdmissionError::InvalidQuota("GATEWAY_RATE_LIMIT_BURST must be > 0"))?;

		Ok(Self {
			rate_limiters: DashMap::new(),
			quota: Quota::per_second(rps).allow_burst(burst),
		})
	}

	/// Check the rate limit for `user_id`
	pub fn check_rate_limit(&self, user_id: &str) -> Result<(), AdmissionError> {
		let limiter = self
			.rate_limiters
			.entry(user_id.to_string())
			.or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)))
			.clone();

		limiter.check().map_err(|_| {
			tracing::warn!(target: "gateway::admission", user_id, "Rate limit exceeded");
			AdmissionError::RateLimitExceeded
		})
	}
}

/// Submission key from the `Idempotency-Key` header, if one was sent
///
/// A missing header is allowed; a present but malformed one is rejected.
pub fn submission_key(headers: &HeaderMap) -> Result<Option<SubmissionKey>, AdmissionError> {
	let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
		return Ok(None);
	};

	let raw = value
		.to_str()
		.map_err(|_| AdmissionError::InvalidSubmissionKey("not visible ASCII".to_string()))?;

	raw.trim()
		.parse::<SubmissionKey>()
		.map(Some)
		.map_err(|e| AdmissionError::InvalidSubmissionKey(e.to_string()))
}

#[cfg(test)]
mod tests {
	use actix_web::http::header::HeaderValue;

	use super::*;

	#[test]
	fn test_rate_limit_per_user() {
		let controller = AdmissionController::new(1, 2).unwrap();

		assert!(controller.check_rate_limit("alice").is_ok());
		assert!(controller.check_rate_limit("alice").is_ok());
		assert!(matches!(
			controller.check_rate_limit("alice"),
			Err(AdmissionError::RateLimitExceeded)
		));

		// Other users have their own bucket
		assert!(controller.check_rate_limit("bob").is_ok());
		assert_eq!(controller.rate_limiters.len(), 2);
	}

	#[test]
	fn test_zero_quota_rejected() {
		assert!(matches!(
			AdmissionController::new(0, 10),
			Err(AdmissionError::InvalidQuota(_))
		));
	}

	#[test]
	fn test_submission_key_header() {
		let mut headers = HeaderMap::new();
		assert!(submission_key(&headers).unwrap().is_none());

		headers.insert(
			actix_web::http::header::HeaderName::from_static("idempotency-key"),
			HeaderValue::from_static("abc-123"),
		);
		assert_eq!(
			submission_key(&headers).unwrap().map(|k| k.to_string()),
			Some("abc-123".to_string())
		);

		headers.insert(
			actix_web::http::header::HeaderName::from_static("idempotency-key"),
			HeaderValue::from_static("bad key!"),
		);
		assert!(matches!(
			submission_key(&headers),
			Err(AdmissionError::InvalidSubmissionKey(_))
		));
	}
}
