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

use std::future::Future;

use crate::{
	client::ClientError,
	types::{
		AcceptReceipt, Activity, Donation, DonationFields, DonationFilter, FulfillReceipt,
		MatchDetail, RecordId, Request, RequestFields, RequestFilter, SubmissionKey,
	},
};

/// Operations exposed by the record store
///
/// [`crate::Client`] implements this over HTTP. The intake coordinator only
/// depends on this trait, so it can be driven against any backend.
pub trait LedgerApi: Send + Sync {
	/// Pending donations, optionally filtered
	fn list_donations(
		&self,
		filter: &DonationFilter,
	) -> impl Future<Output = Result<Vec<Donation>, ClientError>> + Send;

	/// Pending requests, optionally filtered
	fn list_requests(
		&self,
		filter: &RequestFilter,
	) -> impl Future<Output = Result<Vec<Request>, ClientError>> + Send;

	/// Pending requests a prospective donation could fulfill
	fn check_donation_matches(
		&self,
		fields: &DonationFields,
	) -> impl Future<Output = Result<Vec<Request>, ClientError>> + Send;

	/// Pending donations a prospective request could accept
	fn check_request_matches(
		&self,
		fields: &RequestFields,
	) -> impl Future<Output = Result<Vec<Donation>, ClientError>> + Send;

	fn create_donation(
		&self,
		fields: &DonationFields,
		key: &SubmissionKey,
	) -> impl Future<Output = Result<Donation, ClientError>> + Send;

	fn create_request(
		&self,
		fields: &RequestFields,
		key: &SubmissionKey,
	) -> impl Future<Output = Result<Request, ClientError>> + Send;

	/// Bind a donation to an existing pending request
	fn fulfill_request(
		&self,
		request_id: RecordId,
		fields: &DonationFields,
		key: &SubmissionKey,
	) -> impl Future<Output = Result<FulfillReceipt, ClientError>> + Send;

	/// Bind the caller as recipient of an existing pending donation
	fn accept_donation(
		&self,
		donation_id: RecordId,
		key: &SubmissionKey,
	) -> impl Future<Output = Result<AcceptReceipt, ClientError>> + Send;

	fn my_activity(&self) -> impl Future<Output = Result<Activity, ClientError>> + Send;

	/// Counterpart contact details for a settlement the caller took part in
	fn match_detail(
		&self,
		settlement_id: &str,
	) -> impl Future<Output = Result<MatchDetail, ClientError>> + Send;
}
