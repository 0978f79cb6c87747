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

//! Settlement rules
//!
//! Every write to the ledger is planned here. The functions only read the
//! ledger through [`LedgerView`] and return the records to store; the caller
//! persists and applies the result in a single step, so a rejected commit
//! leaves the ledger untouched.
//!
//! Checks run in a fixed order: input validation, target lookup, ownership,
//! then status.

use std::fmt;

use chrono::{DateTime, Utc};
use graft_sdk::types::{
	Donation, DonationFields, DonationStatus, Party, RecordId, Request, RequestFields,
	RequestStatus, UserProfile,
};
use thiserror::Error;

use crate::{
	transaction::{SettlementTransaction, build_acceptance, build_fulfillment},
	validator::{
		ValidationError, validate_contact_profile, validate_donation, validate_organ_match,
		validate_request,
	},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
	Donation,
	Request,
}

impl fmt::Display for RecordKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RecordKind::Donation => f.write_str("donation"),
			RecordKind::Request => f.write_str("request"),
		}
	}
}

/// Error types for settlement operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
	#[error("Validation error: {0}")]
	Validation(#[from] ValidationError),
	#[error("Authentication required")]
	Unauthenticated,
	#[error("Cannot settle your own {kind} {id}")]
	SelfSettlement { kind: RecordKind, id: RecordId },
	#[error("{kind} {id} not found")]
	NotFound { kind: RecordKind, id: RecordId },
	#[error("{kind} {id} is already {status}")]
	Conflict {
		kind: RecordKind,
		id: RecordId,
		status: &'static str,
	},
}

/// Authenticated user on whose behalf a write is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
	pub user_id: String,
	pub profile: UserProfile,
}

impl Caller {
	pub fn new(user_id: impl Into<String>, profile: UserProfile) -> Self {
		Self {
			user_id: user_id.into(),
			profile,
		}
	}

	fn ensure_authenticated(&self) -> Result<(), SettlementError> {
		if self.user_id.trim().is_empty() {
			return Err(SettlementError::Unauthenticated);
		}
		Ok(())
	}

	/// Caller as the recipient of an accepted donation
	pub fn recipient_party(&self) -> Party {
		Party {
			user_id: self.user_id.clone(),
			name: self.profile.full_name.clone(),
			email: Some(self.profile.email.clone()),
			phone: self.profile.phone.clone(),
			city: self.profile.city.clone(),
		}
	}

	/// Caller as the donor fulfilling a request with `fields`
	pub fn donor_party(&self, fields: &DonationFields) -> Party {
		Party {
			user_id: self.user_id.clone(),
			name: fields.donor_name.trim().to_string(),
			email: Some(self.profile.email.clone()),
			phone: fields.contact.trim().to_string(),
			city: fields.city.trim().to_string(),
		}
	}
}

/// Read access to stored records
pub trait LedgerView {
	fn donation(&self, id: RecordId) -> Option<&Donation>;
	fn request(&self, id: RecordId) -> Option<&Request>;
}

/// Plan a new pending donation with the given id
pub fn create_donation(
	caller: &Caller,
	id: RecordId,
	fields: &DonationFields,
	now: DateTime<Utc>,
) -> Result<Donation, SettlementError> {
	caller.ensure_authenticated()?;
	validate_donation(fields)?;

	Ok(Donation {
		id,
		donor_name: fields.donor_name.trim().to_string(),
		age: fields.age,
		blood_group: fields.blood_group,
		organ: fields.organ.trim().to_string(),
		contact: fields.contact.trim().to_string(),
		city: fields.city.trim().to_string(),
		availability_date: fields.availability_date,
		status: DonationStatus::Pending,
		owner_user_id: caller.user_id.clone(),
		created_at: now,
		settlement_id: None,
	})
}

/// Plan a new pending request with the given id
pub fn create_request(
	caller: &Caller,
	id: RecordId,
	fields: &RequestFields,
	now: DateTime<Utc>,
) -> Result<Request, SettlementError> {
	caller.ensure_authenticated()?;
	validate_request(fields)?;

	Ok(Request {
		id,
		requester_name: fields.requester_name.trim().to_string(),
		age: fields.age,
		blood_group: fields.blood_group,
		organ_needed: fields.organ_needed.trim().to_string(),
		contact: fields.contact.trim().to_string(),
		city: fields.city.trim().to_string(),
		status: RequestStatus::Pending,
		owner_user_id: caller.user_id.clone(),
		created_at: now,
		settlement_id: None,
	})
}

/// Plan fulfilling `request_id` with a donation described by `fields`
///
/// No new donation record is created; the donor details are kept on the
/// settlement.
pub fn fulfill_request<V: LedgerView + ?Sized>(
	ledger: &V,
	caller: &Caller,
	request_id: RecordId,
	fields: &DonationFields,
	now: DateTime<Utc>,
) -> Result<SettlementTransaction, SettlementError> {
	caller.ensure_authenticated()?;
	validate_donation(fields)?;

	let request = ledger.request(request_id).ok_or(SettlementError::NotFound {
		kind: RecordKind::Request,
		id: request_id,
	})?;

	if request.owner_user_id == caller.user_id {
		return Err(SettlementError::SelfSettlement {
			kind: RecordKind::Request,
			id: request_id,
		});
	}

	if !request.is_pending() {
		return Err(SettlementError::Conflict {
			kind: RecordKind::Request,
			id: request_id,
			status: "matched",
		});
	}

	validate_organ_match(&request.organ_needed, &fields.organ)?;

	Ok(build_fulfillment(
		request,
		fields,
		caller.donor_party(fields),
		now,
	))
}

/// Plan accepting `donation_id` on behalf of the caller
pub fn accept_donation<V: LedgerView + ?Sized>(
	ledger: &V,
	caller: &Caller,
	donation_id: RecordId,
	now: DateTime<Utc>,
) -> Result<SettlementTransaction, SettlementError> {
	caller.ensure_authenticated()?;
	validate_contact_profile(&caller.profile)?;

	let donation = ledger.donation(donation_id).ok_or(SettlementError::NotFound {
		kind: RecordKind::Donation,
		id: donation_id,
	})?;

	if donation.owner_user_id == caller.user_id {
		return Err(SettlementError::SelfSettlement {
			kind: RecordKind::Donation,
			id: donation_id,
		});
	}

	if !donation.is_pending() {
		return Err(SettlementError::Conflict {
			kind: RecordKind::Donation,
			id: donation_id,
			status: "accepted",
		});
	}

	Ok(build_acceptance(donation, caller.recipient_party(), now))
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use chrono::NaiveDate;
	use graft_sdk::types::{BloodGroup, SettlementKind};

	use super::*;

	#[derive(Default)]
	struct Records {
		donations: BTreeMap<RecordId, Donation>,
		requests: BTreeMap<RecordId, Request>,
	}

	impl LedgerView for Records {
		fn donation(&self, id: RecordId) -> Option<&Donation> {
			self.donations.get(&id)
		}

		fn request(&self, id: RecordId) -> Option<&Request> {
			self.requests.get(&id)
		}
	}

	fn caller(user_id: &str) -> Caller {
		Caller::new(
			user_id,
			UserProfile {
				full_name: format!("{} name", user_id),
				email: format!("{}@example.com", user_id),
				phone: "555-0100".to_string(),
				city: "Pune".to_string(),
				blood_group: None,
			},
		)
	}

	fn donation_fields() -> DonationFields {
		DonationFields {
			donor_name: "Asha".to_string(),
			age: 30,
			blood_group: BloodGroup::ONegative,
			organ: "Kidney".to_string(),
			contact: "555-0101".to_string(),
			city: "Pune".to_string(),
			availability_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
		}
	}

	fn request_fields() -> RequestFields {
		RequestFields {
			requester_name: "Ravi".to_string(),
			age: 50,
			blood_group: BloodGroup::APositive,
			organ_needed: "Kidney".to_string(),
			contact: "555-0199".to_string(),
			city: "Pune".to_string(),
		}
	}

	fn seeded() -> Records {
		let mut records = Records::default();
		let request = create_request(&caller("recipient"), 1, &request_fields(), Utc::now()).unwrap();
		let donation =
			create_donation(&caller("donor"), 2, &donation_fields(), Utc::now()).unwrap();
		records.requests.insert(1, request);
		records.donations.insert(2, donation);
		records
	}

	#[test]
	fn test_create_is_pending_and_owned() {
		let request = create_request(&caller("u1"), 5, &request_fields(), Utc::now()).unwrap();
		assert_eq!(request.status, RequestStatus::Pending);
		assert_eq!(request.owner_user_id, "u1");
		assert!(request.settlement_id.is_none());
	}

	#[test]
	fn test_create_requires_authentication() {
		let anonymous = Caller::new(" ", caller("x").profile);
		assert_eq!(
			create_donation(&anonymous, 1, &donation_fields(), Utc::now()),
			Err(SettlementError::Unauthenticated)
		);
	}

	#[test]
	fn test_fulfill_moves_request_to_matched() {
		let records = seeded();
		let tx = fulfill_request(&records, &caller("donor"), 1, &donation_fields(), Utc::now())
			.unwrap();

		match &tx {
			SettlementTransaction::Fulfill {
				request,
				settlement,
			} => {
				assert_eq!(request.status, RequestStatus::Matched);
				assert_eq!(request.settlement_id.as_deref(), Some(settlement.id.as_str()));
				assert_eq!(settlement.kind, SettlementKind::Fulfill);
				assert_eq!(settlement.donor.user_id, "donor");
				assert_eq!(settlement.recipient.user_id, "recipient");
				assert_eq!(settlement.donor.phone, "555-0101");
			}
			other => panic!("unexpected transaction {:?}", other),
		}
		assert_eq!(tx.target_id(), 1);
		// planning does not touch the ledger
		assert!(records.requests[&1].is_pending());
	}

	#[test]
	fn test_fulfill_own_request_rejected() {
		let records = seeded();
		let err = fulfill_request(&records, &caller("recipient"), 1, &donation_fields(), Utc::now())
			.unwrap_err();
		assert!(matches!(err, SettlementError::SelfSettlement { .. }));
	}

	#[test]
	fn test_fulfill_missing_request() {
		let records = seeded();
		let err = fulfill_request(&records, &caller("donor"), 99, &donation_fields(), Utc::now())
			.unwrap_err();
		assert_eq!(
			err,
			SettlementError::NotFound {
				kind: RecordKind::Request,
				id: 99
			}
		);
	}

	#[test]
	fn test_fulfill_matched_request_conflicts() {
		let mut records = seeded();
		records.requests.get_mut(&1).unwrap().status = RequestStatus::Matched;
		let err = fulfill_request(&records, &caller("donor"), 1, &donation_fields(), Utc::now())
			.unwrap_err();
		assert!(matches!(err, SettlementError::Conflict { id: 1, .. }));
	}

	#[test]
	fn test_fulfill_with_wrong_organ_rejected() {
		let records = seeded();
		let mut fields = donation_fields();
		fields.organ = "Liver".to_string();
		let err = fulfill_request(&records, &caller("donor"), 1, &fields, Utc::now()).unwrap_err();
		assert!(matches!(
			err,
			SettlementError::Validation(ValidationError::OrganMismatch { .. })
		));
	}

	#[test]
	fn test_accept_uses_caller_profile() {
		let records = seeded();
		let tx = accept_donation(&records, &caller("recipient"), 2, Utc::now()).unwrap();
		match tx {
			SettlementTransaction::Accept {
				donation,
				settlement,
			} => {
				assert_eq!(donation.status, DonationStatus::Accepted);
				assert_eq!(settlement.recipient.name, "recipient name");
				assert_eq!(
					settlement.recipient.email.as_deref(),
					Some("recipient@example.com")
				);
				assert_eq!(settlement.donor.user_id, "donor");
			}
			other => panic!("unexpected transaction {:?}", other),
		}
	}

	#[test]
	fn test_accept_own_donation_rejected() {
		let records = seeded();
		let err = accept_donation(&records, &caller("donor"), 2, Utc::now()).unwrap_err();
		assert!(matches!(
			err,
			SettlementError::SelfSettlement {
				kind: RecordKind::Donation,
				..
			}
		));
	}

	#[test]
	fn test_accept_already_accepted_conflicts() {
		let mut records = seeded();
		records.donations.get_mut(&2).unwrap().status = DonationStatus::Accepted;
		let err = accept_donation(&records, &caller("recipient"), 2, Utc::now()).unwrap_err();
		assert!(matches!(err, SettlementError::Conflict { status: "accepted", .. }));
	}
}
