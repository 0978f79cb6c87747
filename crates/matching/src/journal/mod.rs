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

mod memory;

use graft_sdk::types::{RecordId, SubmissionKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemorySubmissionJournal;

/// Kind of write a submission key was spent on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
	CreateDonation,
	CreateRequest,
	FulfillRequest,
	AcceptDonation,
}

impl WriteOp {
	pub fn as_str(&self) -> &'static str {
		match self {
			WriteOp::CreateDonation => "create_donation",
			WriteOp::CreateRequest => "create_request",
			WriteOp::FulfillRequest => "fulfill_request",
			WriteOp::AcceptDonation => "accept_donation",
		}
	}
}

/// Outcome a submission key resolved to
///
/// `record_id` is the created record for creates, or the settled target for
/// fulfill and accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
	pub op: WriteOp,
	pub record_id: RecordId,
}

impl JournalEntry {
	pub fn new(op: WriteOp, record_id: RecordId) -> Self {
		Self { op, record_id }
	}
}

/// Error types for Submission Journal operations
#[derive(Debug, Error)]
pub enum JournalError {
	#[error("Submission key already recorded: {0}")]
	DuplicateKey(String),
	#[error("Journal storage error: {0}")]
	StorageError(String),
}

/// Submission Journal trait - the idempotency anchor for the ledger engine
///
/// Maps `(user, submission key)` to the write that key produced. A resent
/// submission is answered from the journal instead of writing twice.
///
/// Key semantic constraints:
/// - Entries are append-only; a key is never re-pointed at another write
/// - Keys are scoped per user, two users may reuse the same key
/// - Entries are rebuilt from the event log on recovery
pub trait SubmissionJournal: Send {
	/// Record the write a key produced
	///
	/// Returns error if the key was already recorded for this user.
	fn record(
		&mut self,
		owner: &str,
		key: &SubmissionKey,
		entry: JournalEntry,
	) -> Result<(), JournalError>;

	/// Look up the write a key produced, if any
	fn lookup(&self, owner: &str, key: &SubmissionKey) -> Option<JournalEntry>;

	/// Get the count of recorded keys
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
