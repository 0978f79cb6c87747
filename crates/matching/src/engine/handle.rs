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

use graft_sdk::types::{
	Activity, Donation, DonationFields, DonationFilter, MatchDetail, RecordId, Request,
	RequestFields, RequestFilter, Settlement, SubmissionKey,
};
use graft_settlement::Caller;
use tokio::sync::oneshot;

use super::{EngineError, LedgerCommand, Reply};
use crate::queue::{QueueError, QueueSender};

/// Cloneable async front to the ledger loop
///
/// Each call enqueues one command and awaits its reply. A full queue fails
/// fast with [`EngineError::Overloaded`].
#[derive(Clone)]
pub struct LedgerHandle {
	sender: QueueSender,
}

impl LedgerHandle {
	pub fn new(sender: QueueSender) -> Self {
		Self { sender }
	}

	async fn call<T>(
		&self,
		build: impl FnOnce(Reply<T>) -> LedgerCommand,
	) -> Result<T, EngineError> {
		let (respond_to, response) = oneshot::channel();
		self.sender
			.try_enqueue(build(respond_to))
			.map_err(|e| match e {
				QueueError::Full => EngineError::Overloaded,
				QueueError::Empty | QueueError::Disconnected => EngineError::Shutdown,
			})?;
		response.await.map_err(|_| EngineError::Shutdown)?
	}

	pub async fn list_donations(&self, filter: DonationFilter) -> Result<Vec<Donation>, EngineError> {
		self.call(|respond_to| LedgerCommand::ListDonations { filter, respond_to })
			.await
	}

	pub async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<Request>, EngineError> {
		self.call(|respond_to| LedgerCommand::ListRequests { filter, respond_to })
			.await
	}

	pub async fn check_donation_matches(
		&self,
		caller_id: String,
		fields: DonationFields,
	) -> Result<Vec<Request>, EngineError> {
		self.call(|respond_to| LedgerCommand::CheckDonationMatches {
			caller_id,
			fields,
			respond_to,
		})
		.await
	}

	pub async fn check_request_matches(
		&self,
		caller_id: String,
		fields: RequestFields,
	) -> Result<Vec<Donation>, EngineError> {
		self.call(|respond_to| LedgerCommand::CheckRequestMatches {
			caller_id,
			fields,
			respond_to,
		})
		.await
	}

	pub async fn create_donation(
		&self,
		caller: Caller,
		fields: DonationFields,
		key: Option<SubmissionKey>,
	) -> Result<Donation, EngineError> {
		self.call(|respond_to| LedgerCommand::CreateDonation {
			caller,
			fields,
			key,
			respond_to,
		})
		.await
	}

	pub async fn create_request(
		&self,
		caller: Caller,
		fields: RequestFields,
		key: Option<SubmissionKey>,
	) -> Result<Request, EngineError> {
		self.call(|respond_to| LedgerCommand::CreateRequest {
			caller,
			fields,
			key,
			respond_to,
		})
		.await
	}

	pub async fn fulfill_request(
		&self,
		caller: Caller,
		request_id: RecordId,
		fields: DonationFields,
		key: Option<SubmissionKey>,
	) -> Result<(Request, Settlement), EngineError> {
		self.call(|respond_to| LedgerCommand::FulfillRequest {
			caller,
			request_id,
			fields,
			key,
			respond_to,
		})
		.await
	}

	pub async fn accept_donation(
		&self,
		caller: Caller,
		donation_id: RecordId,
		key: Option<SubmissionKey>,
	) -> Result<(Donation, Settlement), EngineError> {
		self.call(|respond_to| LedgerCommand::AcceptDonation {
			caller,
			donation_id,
			key,
			respond_to,
		})
		.await
	}

	pub async fn activity(&self, user_id: String) -> Result<Activity, EngineError> {
		self.call(|respond_to| LedgerCommand::Activity {
			user_id,
			respond_to,
		})
		.await
	}

	pub async fn match_detail(
		&self,
		user_id: String,
		settlement_id: String,
	) -> Result<MatchDetail, EngineError> {
		self.call(|respond_to| LedgerCommand::MatchDetail {
			user_id,
			settlement_id,
			respond_to,
		})
		.await
	}

	/// Ask the loop to stop after the commands already queued
	pub fn request_shutdown(&self) -> Result<(), EngineError> {
		self.sender
			.try_enqueue(LedgerCommand::Shutdown)
			.map_err(|_| EngineError::Shutdown)
	}
}
