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

//! Bearer-token authentication for the gateway
//!
//! The gateway does not issue credentials. It only verifies the HS256 token
//! in the `Authorization` header and turns its claims into a [`Caller`]:
//! the user id (`sub`) plus the profile used to fill in contact details
//! when the caller accepts a donation.
//!
//! Authentication materials are read from request metadata only, never
//! from the JSON body.

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use graft_sdk::types::{BloodGroup, UserProfile};
use graft_settlement::Caller;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for authentication operations
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("Missing bearer token")]
	MissingToken,
	#[error("Malformed Authorization header")]
	MalformedHeader,
	#[error("Token has expired")]
	TokenExpired,
	#[error("Invalid token: {0}")]
	InvalidToken(String),
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	/// Subject (user ID)
	pub sub: String,
	pub full_name: String,
	pub email: String,
	#[serde(default)]
	pub phone: String,
	#[serde(default)]
	pub city: String,
	#[serde(default)]
	pub blood_group: Option<BloodGroup>,
	/// Expiration time (Unix timestamp)
	pub exp: i64,
}

impl Claims {
	pub fn into_caller(self) -> Caller {
		Caller::new(
			self.sub,
			UserProfile {
				full_name: self.full_name,
				email: self.email,
				phone: self.phone,
				city: self.city,
				blood_group: self.blood_group,
			},
		)
	}
}

/// Authentication context - protocol-agnostic container for auth materials
pub struct AuthContext<'a> {
	pub http_headers: Option<&'a HeaderMap>,
}

impl<'a> AuthContext<'a> {
	pub fn from_http(headers: &'a HeaderMap) -> Self {
		Self {
			http_headers: Some(headers),
		}
	}

	/// Token from `Authorization: Bearer <token>`
	pub fn bearer_token(&self) -> Result<&'a str, AuthError> {
		let value = self
			.http_headers
			.and_then(|headers| headers.get(AUTHORIZATION))
			.ok_or(AuthError::MissingToken)?;
		let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;

		let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
		if !scheme.eq_ignore_ascii_case("bearer") {
			return Err(AuthError::MalformedHeader);
		}
		let token = token.trim();
		if token.is_empty() {
			return Err(AuthError::MissingToken);
		}
		Ok(token)
	}
}

/// Authentication provider trait
///
/// Turns request metadata into the authenticated caller. The gateway ships
/// [`BearerTokenProvider`]; other schemes can be plugged in without touching
/// the handlers.
pub trait AuthProvider: Send + Sync {
	fn authenticate(&self, ctx: &AuthContext) -> Result<Caller, AuthError>;
}

/// HS256 bearer-token provider
pub struct BearerTokenProvider {
	decoding_key: DecodingKey,
	validation: Validation,
}

impl BearerTokenProvider {
	pub fn new(secret: &str) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 30;
		validation.set_required_spec_claims(&["exp", "sub"]);

		Self {
			decoding_key: DecodingKey::from_secret(secret.as_bytes()),
			validation,
		}
	}
}

impl AuthProvider for BearerTokenProvider {
	fn authenticate(&self, ctx: &AuthContext) -> Result<Caller, AuthError> {
		let token = ctx.bearer_token()?;

		let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
			match e.kind() {
				ErrorKind::ExpiredSignature => AuthError::TokenExpired,
				_ => AuthError::InvalidToken(e.to_string()),
			}
		})?;

		if data.claims.sub.trim().is_empty() {
			return Err(AuthError::InvalidToken("empty subject".to_string()));
		}

		Ok(data.claims.into_caller())
	}
}


#[cfg(test)]
mod tests {
	use actix_web::http::header::HeaderValue;
	use chrono::{Duration, Utc};

	use super::*;
	use test_tokens::*;

	fn headers(value: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
		headers
	}

	#[test]
	fn test_valid_token() {
		let provider = BearerTokenProvider::new(SECRET);
		let headers = headers(&format!("Bearer {}", token_for("alice")));

		let caller = provider
			.authenticate(&AuthContext::from_http(&headers))
			.unwrap();
		assert_eq!(caller.user_id, "alice");
		assert_eq!(caller.profile.email, "alice@example.org");
	}

	#[test]
	fn test_missing_and_malformed_header() {
		let provider = BearerTokenProvider::new(SECRET);

		let empty = HeaderMap::new();
		assert!(matches!(
			provider.authenticate(&AuthContext::from_http(&empty)),
			Err(AuthError::MissingToken)
		));

		let basic = headers("Basic dXNlcjpwYXNz");
		assert!(matches!(
			provider.authenticate(&AuthContext::from_http(&basic)),
			Err(AuthError::MalformedHeader)
		));
	}

	#[test]
	fn test_wrong_secret_rejected() {
		let provider = BearerTokenProvider::new("another-secret");
		let headers = headers(&format!("Bearer {}", token_for("alice")));
		assert!(matches!(
			provider.authenticate(&AuthContext::from_http(&headers)),
			Err(AuthError::InvalidToken(_))
		));
	}

	#[test]
	fn test_expired_token_rejected() {
		let provider = BearerTokenProvider::new(SECRET);
		let mut expired = claims("alice");
		expired.exp = (Utc::now() - Duration::hours(2)).timestamp();
		let headers = headers(&format!("Bearer {}", sign(&expired)));

		assert!(matches!(
			provider.authenticate(&AuthContext::from_http(&headers)),
			Err(AuthError::TokenExpired)
		));
	}
}
