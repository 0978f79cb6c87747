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

//! Per-request identification
//!
//! Every request gets a `request_id`, taken from the `X-Request-Id` header
//! when the client sent a usable one and generated otherwise. It is stored in
//! the request extensions, attached to the request span and echoed back on
//! the response so client reports can be matched to gateway logs.

use actix_web::{
	HttpMessage, HttpRequest,
	dev::{ServiceRequest, ServiceResponse},
	http::header::{HeaderName, HeaderValue},
};
use tracing::warn;
use uuid::Uuid;

/// HTTP header name for request ID
pub const HEADER_REQUEST_ID: &str = "X-Request-Id";

const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Clone, Debug)]
pub struct RequestContext {
	pub request_id: String,
}

impl RequestContext {
	/// Ensure a RequestContext exists for the given request, creating one if needed
	pub fn ensure(req: &mut ServiceRequest) -> Self {
		if let Some(ctx) = req.extensions().get::<RequestContext>() {
			return ctx.clone();
		}

		let request_id = match extract_header(req, HEADER_REQUEST_ID) {
			Some(id) if is_valid_request_id(&id) => id,
			Some(_) => {
				warn!(target: "gateway::request", "Invalid X-Request-Id, generating a new one");
				Uuid::new_v4().to_string()
			}
			None => Uuid::new_v4().to_string(),
		};

		let ctx = RequestContext { request_id };
		req.extensions_mut().insert(ctx.clone());
		ctx
	}

	/// Extract RequestContext from an HTTP request if it exists
	pub fn from_http(req: &HttpRequest) -> Option<Self> {
		req.extensions().get::<RequestContext>().cloned()
	}

	/// Echo the request ID on the response unless a handler already set one
	pub fn write_response_headers<B>(&self, res: &mut ServiceResponse<B>) {
		let headers = res.headers_mut();
		if headers.get(HEADER_REQUEST_ID).is_none()
			&& let Ok(value) = HeaderValue::from_str(&self.request_id)
		{
			headers.insert(HeaderName::from_static("x-request-id"), value);
		}
	}
}

fn is_valid_request_id(id: &str) -> bool {
	!id.is_empty()
		&& id.len() <= MAX_REQUEST_ID_LEN
		&& id
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn extract_header(req: &ServiceRequest, name: &str) -> Option<String> {
	req.headers()
		.get(name)
		.and_then(|v| v.to_str().ok())
		.map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
	use actix_web::test::TestRequest;

	use super::*;

	#[test]
	fn test_reuses_client_request_id() {
		let mut req = TestRequest::default()
			.insert_header((HEADER_REQUEST_ID, "abc-123"))
			.to_srv_request();

		let ctx = RequestContext::ensure(&mut req);
		assert_eq!(ctx.request_id, "abc-123");

		// Second call returns the stored context
		let again = RequestContext::ensure(&mut req);
		assert_eq!(again.request_id, "abc-123");
	}

	#[test]
	fn test_replaces_invalid_request_id() {
		let mut req = TestRequest::default()
			.insert_header((HEADER_REQUEST_ID, "bad id with spaces"))
			.to_srv_request();

		let ctx = RequestContext::ensure(&mut req);
		assert_ne!(ctx.request_id, "bad id with spaces");
		assert!(Uuid::parse_str(&ctx.request_id).is_ok());
	}
}
