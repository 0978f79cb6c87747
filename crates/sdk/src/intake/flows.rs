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

use std::sync::Arc;

use super::IntakeFlow;
use crate::{
	api::LedgerApi,
	client::ClientError,
	form::{DonationForm, FormError, RequestForm},
	types::{
		Donation, DonationFields, RecordId, Request, RequestFields, Settlement, SubmissionKey,
	},
};

async fn settlement_on<A: LedgerApi>(
	api: &A,
	target: RecordId,
) -> Result<Option<Settlement>, ClientError> {
	let activity = api.my_activity().await?;
	Ok(activity
		.settlements
		.into_iter()
		.find(|s| s.target_id() == Some(target)))
}

/// Request a donation form was opened to fulfill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillTarget {
	pub request_id: RecordId,
	/// The donation's organ is locked to this value
	pub organ: String,
}

impl FulfillTarget {
	pub fn for_request(request: &Request) -> Self {
		Self {
			request_id: request.id,
			organ: request.organ_needed.clone(),
		}
	}
}

/// Donation intake: candidates are requests, settling fulfills one
pub struct DonationFlow<A> {
	api: Arc<A>,
	viewer_id: String,
	target: Option<FulfillTarget>,
}

impl<A: LedgerApi> DonationFlow<A> {
	pub fn new(api: Arc<A>, viewer_id: impl Into<String>) -> Self {
		Self {
			api,
			viewer_id: viewer_id.into(),
			target: None,
		}
	}

	/// Donation form opened from a specific request
	pub fn fulfilling(api: Arc<A>, viewer_id: impl Into<String>, target: FulfillTarget) -> Self {
		Self {
			api,
			viewer_id: viewer_id.into(),
			target: Some(target),
		}
	}

	pub fn target(&self) -> Option<&FulfillTarget> {
		self.target.as_ref()
	}
}

impl<A: LedgerApi> IntakeFlow for DonationFlow<A> {
	type Form = DonationForm;
	type Payload = DonationFields;
	type Candidate = Request;
	type Created = Donation;

	fn kind(&self) -> &'static str {
		"donation"
	}

	fn parse(&self, form: &DonationForm) -> Result<DonationFields, FormError> {
		let fields = form.parse()?;
		if let Some(target) = &self.target
			&& !fields.organ.eq_ignore_ascii_case(&target.organ)
		{
			return Err(FormError::Locked {
				field: "organ",
				expected: target.organ.clone(),
			});
		}
		Ok(fields)
	}

	fn preselected_target(&self) -> Option<RecordId> {
		self.target.as_ref().map(|t| t.request_id)
	}

	async fn check_matches(&self, payload: &DonationFields) -> Result<Vec<Request>, ClientError> {
		self.api.check_donation_matches(payload).await
	}

	async fn create(
		&self,
		payload: &DonationFields,
		key: &SubmissionKey,
	) -> Result<Donation, ClientError> {
		self.api.create_donation(payload, key).await
	}

	async fn settle(
		&self,
		target: RecordId,
		payload: &DonationFields,
		key: &SubmissionKey,
	) -> Result<Settlement, ClientError> {
		let receipt = self.api.fulfill_request(target, payload, key).await?;
		Ok(receipt.settlement)
	}

	async fn find_settlement(&self, target: RecordId) -> Result<Option<Settlement>, ClientError> {
		settlement_on(self.api.as_ref(), target).await
	}

	fn candidate_id(&self, candidate: &Request) -> RecordId {
		candidate.id
	}

	fn is_own(&self, candidate: &Request) -> bool {
		candidate.owner_user_id == self.viewer_id
	}
}

/// Request intake: candidates are donations, settling accepts one
pub struct RequestFlow<A> {
	api: Arc<A>,
	viewer_id: String,
}

impl<A: LedgerApi> RequestFlow<A> {
	pub fn new(api: Arc<A>, viewer_id: impl Into<String>) -> Self {
		Self {
			api,
			viewer_id: viewer_id.into(),
		}
	}
}

impl<A: LedgerApi> IntakeFlow for RequestFlow<A> {
	type Form = RequestForm;
	type Payload = RequestFields;
	type Candidate = Donation;
	type Created = Request;

	fn kind(&self) -> &'static str {
		"request"
	}

	fn parse(&self, form: &RequestForm) -> Result<RequestFields, FormError> {
		form.parse()
	}

	async fn check_matches(&self, payload: &RequestFields) -> Result<Vec<Donation>, ClientError> {
		self.api.check_request_matches(payload).await
	}

	async fn create(
		&self,
		payload: &RequestFields,
		key: &SubmissionKey,
	) -> Result<Request, ClientError> {
		self.api.create_request(payload, key).await
	}

	async fn settle(
		&self,
		target: RecordId,
		_payload: &RequestFields,
		key: &SubmissionKey,
	) -> Result<Settlement, ClientError> {
		let receipt = self.api.accept_donation(target, key).await?;
		Ok(receipt.settlement)
	}

	async fn find_settlement(&self, target: RecordId) -> Result<Option<Settlement>, ClientError> {
		settlement_on(self.api.as_ref(), target).await
	}

	fn candidate_id(&self, candidate: &Donation) -> RecordId {
		candidate.id
	}

	fn is_own(&self, candidate: &Donation) -> bool {
		candidate.owner_user_id == self.viewer_id
	}
}
