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

use super::EngineError;

/// Reply channel carried by every command
pub type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Commands processed by the ledger loop
///
/// These messages allow request handlers to interact with the ledger
/// without blocking the loop or requiring shared mutable state. The loop
/// handles them strictly one at a time, in arrival order.
#[derive(Debug)]
pub enum LedgerCommand {
	ListDonations {
		filter: DonationFilter,
		respond_to: Reply<Vec<Donation>>,
	},

	ListRequests {
		filter: RequestFilter,
		respond_to: Reply<Vec<Request>>,
	},

	/// Find pending requests a prospective donation could fulfill
	///
	/// Read-only; nothing is written.
	CheckDonationMatches {
		caller_id: String,
		fields: DonationFields,
		respond_to: Reply<Vec<Request>>,
	},

	/// Find pending donations a prospective request could accept
	CheckRequestMatches {
		caller_id: String,
		fields: RequestFields,
		respond_to: Reply<Vec<Donation>>,
	},

	CreateDonation {
		caller: Caller,
		fields: DonationFields,
		key: Option<SubmissionKey>,
		respond_to: Reply<Donation>,
	},

	CreateRequest {
		caller: Caller,
		fields: RequestFields,
		key: Option<SubmissionKey>,
		respond_to: Reply<Request>,
	},

	FulfillRequest {
		caller: Caller,
		request_id: RecordId,
		fields: DonationFields,
		key: Option<SubmissionKey>,
		respond_to: Reply<(Request, Settlement)>,
	},

	AcceptDonation {
		caller: Caller,
		donation_id: RecordId,
		key: Option<SubmissionKey>,
		respond_to: Reply<(Donation, Settlement)>,
	},

	Activity {
		user_id: String,
		respond_to: Reply<Activity>,
	},

	MatchDetail {
		user_id: String,
		settlement_id: String,
		respond_to: Reply<MatchDetail>,
	},

	/// Request the loop to shut down gracefully
	Shutdown,
}

impl LedgerCommand {
	pub fn name(&self) -> &'static str {
		match self {
			LedgerCommand::ListDonations { .. } => "list_donations",
			LedgerCommand::ListRequests { .. } => "list_requests",
			LedgerCommand::CheckDonationMatches { .. } => "check_donation_matches",
			LedgerCommand::CheckRequestMatches { .. } => "check_request_matches",
			LedgerCommand::CreateDonation { .. } => "create_donation",
			LedgerCommand::CreateRequest { .. } => "create_request",
			LedgerCommand::FulfillRequest { .. } => "fulfill_request",
			LedgerCommand::AcceptDonation { .. } => "accept_donation",
			LedgerCommand::Activity { .. } => "activity",
			LedgerCommand::MatchDetail { .. } => "match_detail",
			LedgerCommand::Shutdown => "shutdown",
		}
	}
}
