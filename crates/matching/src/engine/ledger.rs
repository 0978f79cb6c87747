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

use chrono::Utc;
use graft_sdk::types::{
	Activity, Donation, DonationFields, DonationFilter, MatchDetail, RecordId, Request,
	RequestFields, RequestFilter, Settlement, SubmissionKey,
};
use graft_settlement::{Caller, LedgerView, SettlementTransaction, ValidationError};
use tracing::{debug, info};

use super::{EngineError, state::LedgerState};
use crate::{
	event::{EventStorage, LedgerEvent},
	journal::{JournalEntry, WriteOp},
	matcher,
};

/// Synchronous ledger: state plus the event log it is rebuilt from
///
/// Every write is planned against the current state, appended to storage,
/// then applied. A failed append leaves the state untouched. The engine
/// loop owns one `Ledger` and is the only writer, which makes every
/// check-then-write sequence atomic.
pub struct Ledger {
	state: LedgerState,
	storage: Box<dyn EventStorage>,
}

enum Replay {
	Fresh,
	Existing(JournalEntry),
}

impl Ledger {
	/// Empty ledger backed by `storage`
	///
	/// Use [`crate::RecoveryCoordinator`] when `storage` may already hold events.
	pub fn new(storage: Box<dyn EventStorage>) -> Self {
		Self::from_parts(LedgerState::default(), storage)
	}

	pub fn from_parts(state: LedgerState, storage: Box<dyn EventStorage>) -> Self {
		Self { state, storage }
	}

	pub fn state(&self) -> &LedgerState {
		&self.state
	}

	fn commit(&mut self, event: LedgerEvent) -> Result<(), EngineError> {
		self.storage.append(&event)?;
		self.state.apply(&event)?;
		debug!(
			target: "ledger::engine",
			seq = event.sequence(),
			event = event.name(),
			"Event committed"
		);
		Ok(())
	}

	/// Resolve a submission key against the journal
	fn replay(
		&self,
		caller: &Caller,
		key: Option<&SubmissionKey>,
		op: WriteOp,
	) -> Result<Replay, EngineError> {
		let Some(key) = key else {
			return Ok(Replay::Fresh);
		};
		match self.state.journal_lookup(&caller.user_id, key) {
			None => Ok(Replay::Fresh),
			Some(entry) if entry.op == op => {
				info!(
					target: "ledger::engine",
					user_id = %caller.user_id,
					key = %key,
					op = op.as_str(),
					record_id = entry.record_id,
					"Replaying earlier submission"
				);
				Ok(Replay::Existing(entry))
			}
			Some(_) => Err(EngineError::Settlement(
				ValidationError::SubmissionKeyReused.into(),
			)),
		}
	}

	fn stored_donation(&self, id: RecordId) -> Result<Donation, EngineError> {
		self.state
			.donation(id)
			.cloned()
			.ok_or_else(|| EngineError::Inconsistent(format!("journal points at missing donation {}", id)))
	}

	fn stored_request(&self, id: RecordId) -> Result<Request, EngineError> {
		self.state
			.request(id)
			.cloned()
			.ok_or_else(|| EngineError::Inconsistent(format!("journal points at missing request {}", id)))
	}

	fn settlement_of(&self, settlement_id: Option<&String>) -> Result<Settlement, EngineError> {
		settlement_id
			.and_then(|id| self.state.settlement(id))
			.cloned()
			.ok_or_else(|| EngineError::Inconsistent("settled record has no settlement".to_string()))
	}

	pub fn list_donations(&self, filter: &DonationFilter) -> Vec<Donation> {
		matcher::list_donations(filter, self.state.donations())
	}

	pub fn list_requests(&self, filter: &RequestFilter) -> Vec<Request> {
		matcher::list_requests(filter, self.state.requests())
	}

	pub fn check_donation_matches(&self, caller_id: &str, fields: &DonationFields) -> Vec<Request> {
		matcher::requests_for_donation(fields, caller_id, self.state.requests())
	}

	pub fn check_request_matches(&self, caller_id: &str, fields: &RequestFields) -> Vec<Donation> {
		matcher::donations_for_request(fields, caller_id, self.state.donations())
	}

	pub fn create_donation(
		&mut self,
		caller: &Caller,
		fields: &DonationFields,
		key: Option<&SubmissionKey>,
	) -> Result<Donation, EngineError> {
		if let Replay::Existing(entry) = self.replay(caller, key, WriteOp::CreateDonation)? {
			return self.stored_donation(entry.record_id);
		}

		let id = self.state.next_donation_id();
		let donation = graft_settlement::create_donation(caller, id, fields, Utc::now())?;
		self.commit(LedgerEvent::DonationCreated {
			seq: self.state.next_sequence(),
			donation: donation.clone(),
			submission: key.cloned(),
		})?;

		info!(
			target: "ledger::engine",
			donation_id = id,
			user_id = %caller.user_id,
			"Donation created"
		);
		Ok(donation)
	}

	pub fn create_request(
		&mut self,
		caller: &Caller,
		fields: &RequestFields,
		key: Option<&SubmissionKey>,
	) -> Result<Request, EngineError> {
		if let Replay::Existing(entry) = self.replay(caller, key, WriteOp::CreateRequest)? {
			return self.stored_request(entry.record_id);
		}

		let id = self.state.next_request_id();
		let request = graft_settlement::create_request(caller, id, fields, Utc::now())?;
		self.commit(LedgerEvent::RequestCreated {
			seq: self.state.next_sequence(),
			request: request.clone(),
			submission: key.cloned(),
		})?;

		info!(
			target: "ledger::engine",
			request_id = id,
			user_id = %caller.user_id,
			"Request created"
		);
		Ok(request)
	}

	/// Fulfill a pending request; the first fulfill wins
	pub fn fulfill_request(
		&mut self,
		caller: &Caller,
		request_id: RecordId,
		fields: &DonationFields,
		key: Option<&SubmissionKey>,
	) -> Result<(Request, Settlement), EngineError> {
		if let Replay::Existing(entry) = self.replay(caller, key, WriteOp::FulfillRequest)? {
			let request = self.stored_request(entry.record_id)?;
			let settlement = self.settlement_of(request.settlement_id.as_ref())?;
			return Ok((request, settlement));
		}

		let transaction =
			graft_settlement::fulfill_request(&self.state, caller, request_id, fields, Utc::now())?;
		let SettlementTransaction::Fulfill {
			request,
			settlement,
		} = transaction
		else {
			return Err(EngineError::Inconsistent("fulfill planned a non-fulfill".to_string()));
		};

		self.commit(LedgerEvent::RequestFulfilled {
			seq: self.state.next_sequence(),
			request_id,
			settlement: settlement.clone(),
			submission: key.cloned(),
		})?;

		info!(
			target: "ledger::engine",
			request_id,
			settlement_id = %settlement.id,
			donor = %caller.user_id,
			"Request fulfilled"
		);
		Ok((request, settlement))
	}

	/// Accept a pending donation; the first accept wins
	pub fn accept_donation(
		&mut self,
		caller: &Caller,
		donation_id: RecordId,
		key: Option<&SubmissionKey>,
	) -> Result<(Donation, Settlement), EngineError> {
		if let Replay::Existing(entry) = self.replay(caller, key, WriteOp::AcceptDonation)? {
			let donation = self.stored_donation(entry.record_id)?;
			let settlement = self.settlement_of(donation.settlement_id.as_ref())?;
			return Ok((donation, settlement));
		}

		let transaction =
			graft_settlement::accept_donation(&self.state, caller, donation_id, Utc::now())?;
		let SettlementTransaction::Accept {
			donation,
			settlement,
		} = transaction
		else {
			return Err(EngineError::Inconsistent("accept planned a non-accept".to_string()));
		};

		self.commit(LedgerEvent::DonationAccepted {
			seq: self.state.next_sequence(),
			donation_id,
			settlement: settlement.clone(),
			submission: key.cloned(),
		})?;

		info!(
			target: "ledger::engine",
			donation_id,
			settlement_id = %settlement.id,
			recipient = %caller.user_id,
			"Donation accepted"
		);
		Ok((donation, settlement))
	}

	pub fn activity(&self, user_id: &str) -> Activity {
		matcher::activity(
			user_id,
			self.state.donations(),
			self.state.requests(),
			self.state.settlements(),
		)
	}

	pub fn match_detail(&self, user_id: &str, settlement_id: &str) -> Result<MatchDetail, EngineError> {
		let settlement = self
			.state
			.settlement(settlement_id)
			.ok_or_else(|| EngineError::SettlementNotFound(settlement_id.to_string()))?;
		matcher::match_detail(settlement, user_id)
			.ok_or_else(|| EngineError::NotParticipant(settlement_id.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;
	use graft_sdk::types::{BloodGroup, DonationStatus, RequestStatus, UserProfile};
	use graft_settlement::SettlementError;

	use super::*;
	use crate::event::MemoryEventStorage;

	fn caller(user_id: &str) -> Caller {
		Caller::new(
			user_id,
			UserProfile {
				full_name: format!("{} name", user_id),
				email: format!("{}@example.org", user_id),
				phone: "555-0199".to_string(),
				city: "Pune".to_string(),
				blood_group: None,
			},
		)
	}

	fn donation_fields(organ: &str) -> DonationFields {
		DonationFields {
			donor_name: "Ravi".to_string(),
			age: 35,
			blood_group: BloodGroup::ONegative,
			organ: organ.to_string(),
			contact: "555-0101".to_string(),
			city: "Pune".to_string(),
			availability_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
		}
	}

	fn request_fields() -> RequestFields {
		RequestFields {
			requester_name: "Asha".to_string(),
			age: 61,
			blood_group: BloodGroup::APositive,
			organ_needed: "Kidney".to_string(),
			contact: "555-0102".to_string(),
			city: "Pune".to_string(),
		}
	}

	fn key(s: &str) -> SubmissionKey {
		s.parse().unwrap()
	}

	#[test]
	fn test_fulfill_then_conflict() {
		let storage = MemoryEventStorage::new();
		let mut ledger = Ledger::new(Box::new(storage.clone()));

		let request = ledger
			.create_request(&caller("recipient"), &request_fields(), None)
			.unwrap();
		assert_eq!(request.id, 1);

		let matches = ledger.check_donation_matches("donor", &donation_fields("Kidney"));
		assert_eq!(matches.len(), 1);

		let (matched, settlement) = ledger
			.fulfill_request(&caller("donor"), request.id, &donation_fields("Kidney"), None)
			.unwrap();
		assert_eq!(matched.status, RequestStatus::Matched);
		assert_eq!(settlement.recipient.user_id, "recipient");
		assert!(ledger.list_requests(&RequestFilter::default()).is_empty());
		// No donation record is created by a fulfill
		assert!(ledger.state().donations().next().is_none());

		let second = ledger.fulfill_request(
			&caller("other"),
			request.id,
			&donation_fields("Kidney"),
			None,
		);
		assert!(matches!(
			second,
			Err(EngineError::Settlement(SettlementError::Conflict { .. }))
		));
		assert_eq!(storage.event_count(), 2);
	}

	#[test]
	fn test_rejected_write_leaves_log_untouched() {
		let storage = MemoryEventStorage::new();
		let mut ledger = Ledger::new(Box::new(storage.clone()));
		let request = ledger
			.create_request(&caller("recipient"), &request_fields(), None)
			.unwrap();

		let own = ledger.fulfill_request(
			&caller("recipient"),
			request.id,
			&donation_fields("Kidney"),
			None,
		);
		assert!(matches!(
			own,
			Err(EngineError::Settlement(SettlementError::SelfSettlement { .. }))
		));

		let wrong_organ =
			ledger.fulfill_request(&caller("donor"), request.id, &donation_fields("Liver"), None);
		assert!(matches!(
			wrong_organ,
			Err(EngineError::Settlement(SettlementError::Validation(_)))
		));

		assert_eq!(storage.event_count(), 1);
		assert!(ledger.state().request(request.id).unwrap().is_pending());
	}

	#[test]
	fn test_submission_key_replays_result() {
		let storage = MemoryEventStorage::new();
		let mut ledger = Ledger::new(Box::new(storage.clone()));

		let first = ledger
			.create_donation(&caller("donor"), &donation_fields("Kidney"), Some(&key("k1")))
			.unwrap();
		let again = ledger
			.create_donation(&caller("donor"), &donation_fields("Kidney"), Some(&key("k1")))
			.unwrap();
		assert_eq!(first, again);
		assert_eq!(storage.event_count(), 1);

		let (accepted, settlement) = ledger
			.accept_donation(&caller("recipient"), first.id, Some(&key("k2")))
			.unwrap();
		assert_eq!(accepted.status, DonationStatus::Accepted);

		let (replayed, replayed_settlement) = ledger
			.accept_donation(&caller("recipient"), first.id, Some(&key("k2")))
			.unwrap();
		assert_eq!(replayed.id, accepted.id);
		assert_eq!(replayed_settlement.id, settlement.id);
		assert_eq!(storage.event_count(), 2);
	}

	#[test]
	fn test_submission_key_reused_for_other_op() {
		let mut ledger = Ledger::new(Box::new(MemoryEventStorage::new()));
		ledger
			.create_donation(&caller("donor"), &donation_fields("Kidney"), Some(&key("k1")))
			.unwrap();

		let result = ledger.create_request(&caller("donor"), &request_fields(), Some(&key("k1")));
		assert!(matches!(
			result,
			Err(EngineError::Settlement(SettlementError::Validation(
				ValidationError::SubmissionKeyReused
			)))
		));
	}

	#[test]
	fn test_match_detail_access() {
		let mut ledger = Ledger::new(Box::new(MemoryEventStorage::new()));
		let donation = ledger
			.create_donation(&caller("donor"), &donation_fields("Kidney"), None)
			.unwrap();
		let (_, settlement) = ledger
			.accept_donation(&caller("recipient"), donation.id, None)
			.unwrap();

		let detail = ledger.match_detail("recipient", &settlement.id).unwrap();
		assert_eq!(detail.counterpart.user_id, "donor");
		assert!(matches!(
			ledger.match_detail("stranger", &settlement.id),
			Err(EngineError::NotParticipant(_))
		));
		assert!(matches!(
			ledger.match_detail("recipient", "missing"),
			Err(EngineError::SettlementNotFound(_))
		));

		let activity = ledger.activity("recipient");
		assert!(activity.donations.is_empty());
		assert_eq!(activity.settlements.len(), 1);
	}
}
