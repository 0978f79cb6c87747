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

use std::collections::HashMap;

use graft_sdk::types::SubmissionKey;

use super::{JournalEntry, JournalError, SubmissionJournal};

/// In-memory implementation of Submission Journal
///
/// Not durable on its own. The ledger rebuilds it from the event log on
/// startup, so durability follows the configured event storage.
#[derive(Default)]
pub struct MemorySubmissionJournal {
	entries: HashMap<(String, SubmissionKey), JournalEntry>,
}

impl MemorySubmissionJournal {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SubmissionJournal for MemorySubmissionJournal {
	fn record(
		&mut self,
		owner: &str,
		key: &SubmissionKey,
		entry: JournalEntry,
	) -> Result<(), JournalError> {
		let slot = (owner.to_string(), key.clone());
		if self.entries.contains_key(&slot) {
			return Err(JournalError::DuplicateKey(key.to_string()));
		}

		self.entries.insert(slot, entry);
		Ok(())
	}

	fn lookup(&self, owner: &str, key: &SubmissionKey) -> Option<JournalEntry> {
		self.entries
			.get(&(owner.to_string(), key.clone()))
			.copied()
	}

	fn len(&self) -> usize {
		self.entries.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::journal::WriteOp;

	fn key(s: &str) -> SubmissionKey {
		s.parse().unwrap()
	}

	#[test]
	fn test_record_and_lookup() {
		let mut journal = MemorySubmissionJournal::new();
		let entry = JournalEntry::new(WriteOp::CreateDonation, 7);

		assert!(journal.lookup("u1", &key("k1")).is_none());

		journal.record("u1", &key("k1"), entry).unwrap();
		assert_eq!(journal.lookup("u1", &key("k1")), Some(entry));
		assert_eq!(journal.len(), 1);
	}

	#[test]
	fn test_duplicate_key_rejected() {
		let mut journal = MemorySubmissionJournal::new();
		journal
			.record("u1", &key("k1"), JournalEntry::new(WriteOp::CreateRequest, 1))
			.unwrap();

		let result = journal.record("u1", &key("k1"), JournalEntry::new(WriteOp::CreateRequest, 2));
		assert!(matches!(result, Err(JournalError::DuplicateKey(_))));
		assert_eq!(
			journal.lookup("u1", &key("k1")).map(|e| e.record_id),
			Some(1)
		);
	}

	#[test]
	fn test_keys_scoped_per_user() {
		let mut journal = MemorySubmissionJournal::new();
		journal
			.record("u1", &key("shared"), JournalEntry::new(WriteOp::FulfillRequest, 3))
			.unwrap();
		journal
			.record("u2", &key("shared"), JournalEntry::new(WriteOp::AcceptDonation, 4))
			.unwrap();

		assert_eq!(journal.len(), 2);
		assert_eq!(
			journal.lookup("u2", &key("shared")).map(|e| e.op),
			Some(WriteOp::AcceptDonation)
		);
	}
}
