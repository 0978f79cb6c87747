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

mod storage;

use graft_sdk::types::{Donation, RecordId, Request, Settlement, SubmissionKey};
use serde::{Deserialize, Serialize};

pub use storage::{EventStorage, FileEventStorage, MemoryEventStorage, StorageError};

use crate::journal::{JournalEntry, WriteOp};

/// Sequence number for event ordering
///
/// Events are assigned monotonically increasing sequence numbers, starting
/// at 1, so replay applies them in exactly the order they were committed.
pub type SequenceNumber = u64;

/// Events produced by the ledger engine
///
/// These events are the single source of truth for all state changes in the
/// ledger. Records, settlements and the submission journal can be fully
/// reconstructed by replaying events from the beginning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
	DonationCreated {
		seq: SequenceNumber,
		donation: Donation,
		#[serde(default)]
		submission: Option<SubmissionKey>,
	},

	RequestCreated {
		seq: SequenceNumber,
		request: Request,
		#[serde(default)]
		submission: Option<SubmissionKey>,
	},

	/// A pending request was matched by a donor
	RequestFulfilled {
		seq: SequenceNumber,
		request_id: RecordId,
		settlement: Settlement,
		#[serde(default)]
		submission: Option<SubmissionKey>,
	},

	/// A pending donation was accepted by a recipient
	DonationAccepted {
		seq: SequenceNumber,
		donation_id: RecordId,
		settlement: Settlement,
		#[serde(default)]
		submission: Option<SubmissionKey>,
	},
}

impl LedgerEvent {
	/// Get the sequence number of this event
	pub fn sequence(&self) -> SequenceNumber {
		match self {
			LedgerEvent::DonationCreated { seq, .. } => *seq,
			LedgerEvent::RequestCreated { seq, .. } => *seq,
			LedgerEvent::RequestFulfilled { seq, .. } => *seq,
			LedgerEvent::DonationAccepted { seq, .. } => *seq,
		}
	}

	/// Journal entry to record for this event, if it carried a submission key
	///
	/// Returns the submitting user alongside the key and entry.
	pub fn journal_entry(&self) -> Option<(&str, &SubmissionKey, JournalEntry)> {
		match self {
			LedgerEvent::DonationCreated {
				donation,
				submission: Some(key),
				..
			} => Some((
				donation.owner_user_id.as_str(),
				key,
				JournalEntry::new(WriteOp::CreateDonation, donation.id),
			)),
			LedgerEvent::RequestCreated {
				request,
				submission: Some(key),
				..
			} => Some((
				request.owner_user_id.as_str(),
				key,
				JournalEntry::new(WriteOp::CreateRequest, request.id),
			)),
			LedgerEvent::RequestFulfilled {
				request_id,
				settlement,
				submission: Some(key),
				..
			} => Some((
				settlement.donor.user_id.as_str(),
				key,
				JournalEntry::new(WriteOp::FulfillRequest, *request_id),
			)),
			LedgerEvent::DonationAccepted {
				donation_id,
				settlement,
				submission: Some(key),
				..
			} => Some((
				settlement.recipient.user_id.as_str(),
				key,
				JournalEntry::new(WriteOp::AcceptDonation, *donation_id),
			)),
			_ => None,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			LedgerEvent::DonationCreated { .. } => "donation_created",
			LedgerEvent::RequestCreated { .. } => "request_created",
			LedgerEvent::RequestFulfilled { .. } => "request_fulfilled",
			LedgerEvent::DonationAccepted { .. } => "donation_accepted",
		}
	}
}
