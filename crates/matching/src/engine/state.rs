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

use std::collections::BTreeMap;

use graft_sdk::types::{
	Donation, DonationStatus, RecordId, Request, RequestStatus, Settlement, SubmissionKey,
};
use graft_settlement::LedgerView;
use thiserror::Error;

use crate::{
	event::{LedgerEvent, SequenceNumber},
	journal::{JournalEntry, MemorySubmissionJournal, SubmissionJournal},
};

/// Error raised when an event cannot be applied to the current state
#[derive(Debug, Error)]
pub enum ApplyError {
	#[error("Event seq {seq} out of order, expected {expected}")]
	OutOfOrder {
		seq: SequenceNumber,
		expected: SequenceNumber,
	},
	#[error("Event seq {seq} references missing record {id}")]
	MissingRecord { seq: SequenceNumber, id: RecordId },
}

/// Ledger engine state
///
/// Holds every donation, request and settlement plus the submission
/// journal. It is only mutated through [`LedgerState::apply`], so the same
/// event sequence always rebuilds the same state.
pub struct LedgerState {
	pub(crate) donations: BTreeMap<RecordId, Donation>,
	pub(crate) requests: BTreeMap<RecordId, Request>,
	pub(crate) settlements: BTreeMap<String, Settlement>,
	journal: Box<dyn SubmissionJournal>,
	next_donation_id: RecordId,
	next_request_id: RecordId,
	/// Next event sequence number to assign
	next_sequence: SequenceNumber,
}

impl Default for LedgerState {
	fn default() -> Self {
		Self::new(Box::new(MemorySubmissionJournal::new()))
	}
}

impl LedgerState {
	pub fn new(journal: Box<dyn SubmissionJournal>) -> Self {
		Self {
			donations: BTreeMap::new(),
			requests: BTreeMap::new(),
			settlements: BTreeMap::new(),
			journal,
			next_donation_id: 1,
			next_request_id: 1,
			next_sequence: 1,
		}
	}

	pub fn next_sequence(&self) -> SequenceNumber {
		self.next_sequence
	}

	pub fn next_donation_id(&self) -> RecordId {
		self.next_donation_id
	}

	pub fn next_request_id(&self) -> RecordId {
		self.next_request_id
	}

	pub fn settlement(&self, id: &str) -> Option<&Settlement> {
		self.settlements.get(id)
	}

	pub fn donations(&self) -> impl Iterator<Item = &Donation> {
		self.donations.values()
	}

	pub fn requests(&self) -> impl Iterator<Item = &Request> {
		self.requests.values()
	}

	pub fn settlements(&self) -> impl Iterator<Item = &Settlement> {
		self.settlements.values()
	}

	pub fn journal_lookup(&self, owner: &str, key: &SubmissionKey) -> Option<JournalEntry> {
		self.journal.lookup(owner, key)
	}

	/// Apply one committed event
	///
	/// Events must arrive in sequence order with no gaps.
	pub fn apply(&mut self, event: &LedgerEvent) -> Result<(), ApplyError> {
		let seq = event.sequence();
		if seq != self.next_sequence {
			return Err(ApplyError::OutOfOrder {
				seq,
				expected: self.next_sequence,
			});
		}

		match event {
			LedgerEvent::DonationCreated { donation, .. } => {
				self.next_donation_id = self.next_donation_id.max(donation.id + 1);
				self.donations.insert(donation.id, donation.clone());
			}
			LedgerEvent::RequestCreated { request, .. } => {
				self.next_request_id = self.next_request_id.max(request.id + 1);
				self.requests.insert(request.id, request.clone());
			}
			LedgerEvent::RequestFulfilled {
				request_id,
				settlement,
				..
			} => {
				let request = self
					.requests
					.get_mut(request_id)
					.ok_or(ApplyError::MissingRecord {
						seq,
						id: *request_id,
					})?;
				request.status = RequestStatus::Matched;
				request.settlement_id = Some(settlement.id.clone());
				self.settlements
					.insert(settlement.id.clone(), settlement.clone());
			}
			LedgerEvent::DonationAccepted {
				donation_id,
				settlement,
				..
			} => {
				let donation =
					self.donations
						.get_mut(donation_id)
						.ok_or(ApplyError::MissingRecord {
							seq,
							id: *donation_id,
						})?;
				donation.status = DonationStatus::Accepted;
				donation.settlement_id = Some(settlement.id.clone());
				self.settlements
					.insert(settlement.id.clone(), settlement.clone());
			}
		}

		if let Some((owner, key, entry)) = event.journal_entry() {
			// Duplicates cannot be produced by the engine; a replayed log that
			// carries one keeps the first entry.
			let _ = self.journal.record(owner, key, entry);
		}

		self.next_sequence = seq + 1;
		Ok(())
	}
}

impl LedgerView for LedgerState {
	fn donation(&self, id: RecordId) -> Option<&Donation> {
		self.donations.get(&id)
	}

	fn request(&self, id: RecordId) -> Option<&Request> {
		self.requests.get(&id)
	}
}
