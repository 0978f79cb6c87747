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

use std::{future::Future, time::Duration};

use graft_matching::{EngineError, LedgerHandle};
use graft_sdk::types::{
	Activity, Donation, DonationFields, DonationFilter, MatchDetail, RecordId, Request,
	RequestFields, RequestFilter, Settlement, SubmissionKey,
};
use graft_settlement::Caller;
use thiserror::Error;

/// Error types for dispatching operations
#[derive(Debug, Error)]
pub enum DispatcherError {
	#[error(transparent)]
	Engine(#[from] EngineError),
	#[error("Ledger did not answer within {0:?}")]
	Timeout(Duration),
}

/// Forwards gateway calls to the ledger loop
///
/// Every call is bounded by the configured timeout. A write that times out
/// may still be applied; clients resend with the same submission key to
/// learn its outcome.
#[derive(Clone)]
pub struct LedgerDispatcher {
	handle: LedgerHandle,
	timeout: Duration,
}

impl LedgerDispatcher {
	pub fn new(handle: LedgerHandle, timeout: Duration) -> Self {
		tracing::info!(
			target: "server::dispatcher",
			"LedgerDispatcher initialized with {:?} timeout",
			timeout
		);
		Self { handle, timeout }
	}

	async fn bounded<T>(
		&self,
		op: &'static str,
		call: impl Future<Output = Result<T, EngineError>>,
	) -> Result<T, DispatcherError> {
		match tokio::time::timeout(self.timeout, call).await {
			Ok(result) => result.map_err(DispatcherError::from),
			Err(_) => {
				tracing::warn!(target: "server::dispatcher", op, "Ledger call timed out");
				Err(DispatcherError::Timeout(self.timeout))
			}
		}
	}

	pub async fn list_donations(
		&self,
		filter: DonationFilter,
	) -> Result<Vec<Donation>, DispatcherError> {
		self.bounded("list_donations", self.handle.list_donations(filter))
			.await
	}

	pub async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<Request>, DispatcherError> {
		self.bounded("list_requests", self.handle.list_requests(filter))
			.await
	}

	pub async fn check_donation_matches(
		&self,
		caller_id: String,
		fields: DonationFields,
	) -> Result<Vec<Request>, DispatcherError> {
		self.bounded(
			"check_donation_matches",
			self.handle.check_donation_matches(caller_id, fields),
		)
		.await
	}

	pub async fn check_request_matches(
		&self,
		caller_id: String,
		fields: RequestFields,
	) -> Result<Vec<Donation>, DispatcherError> {
		self.bounded(
			"check_request_matches",
			self.handle.check_request_matches(caller_id, fields),
		)
		.await
	}

	pub async fn create_donation(
		&self,
		caller: Caller,
		fields: DonationFields,
		key: Option<SubmissionKey>,
	) -> Result<Donation, DispatcherError> {
		self.bounded(
			"create_donation",
			self.handle.create_donation(caller, fields, key),
		)
		.await
	}

	pub async fn create_request(
		&self,
		caller: Caller,
		fields: RequestFields,
		key: Option<SubmissionKey>,
	) -> Result<Request, DispatcherError> {
		self.bounded("create_request", self.handle.create_request(caller, fields, key))
			.await
	}

	pub async fn fulfill_request(
		&self,
		caller: Caller,
		request_id: RecordId,
		fields: DonationFields,
		key: Option<SubmissionKey>,
	) -> Result<(Request, Settlement), DispatcherError> {
		self.bounded(
			"fulfill_request",
			self.handle.fulfill_request(caller, request_id, fields, key),
		)
		.await
	}

	pub async fn accept_donation(
		&self,
		caller: Caller,
		donation_id: RecordId,
		key: Option<SubmissionKey>,
	) -> Result<(Donation, Settlement), DispatcherError> {
		self.bounded(
			"accept_donation",
			self.handle.accept_donation(caller, donation_id, key),
		)
		.await
	}

	pub async fn activity(&self, user_id: String) -> Result<Activity, DispatcherError> {
		self.bounded("activity", self.handle.activity(user_id)).await
	}

	pub async fn match_detail(
		&self,
		user_id: String,
		settlement_id: String,
	) -> Result<MatchDetail, DispatcherError> {
		self.bounded(
			"match_detail",
			self.handle.match_detail(user_id, settlement_id),
		)
		.await
	}
}

#[cfg(test)]
mod tests {
	use graft_matching::{IngressQueue, LedgerCommand};

	use super::*;

	#[tokio::test]
	async fn test_unanswered_call_times_out() {
		// Nobody drains the receiver, so the reply never arrives
		let (sender, _receiver) = IngressQueue::new(4).split();
		let dispatcher = LedgerDispatcher::new(LedgerHandle::new(sender), Duration::from_millis(20));

		let err = dispatcher
			.list_donations(DonationFilter::default())
			.await
			.unwrap_err();
		assert!(matches!(err, DispatcherError::Timeout(_)));
	}

	#[tokio::test]
	async fn test_engine_errors_pass_through() {
		let (sender, receiver) = IngressQueue::new(1).split();
		sender.try_enqueue(LedgerCommand::Shutdown).unwrap();
		let dispatcher = LedgerDispatcher::new(LedgerHandle::new(sender), Duration::from_secs(1));

		let err = dispatcher
			.activity("user-1".to_string())
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			DispatcherError::Engine(EngineError::Overloaded)
		));
		drop(receiver);
	}
}
