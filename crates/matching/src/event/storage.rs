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

use std::{
	fs::{File, OpenOptions},
	io::{BufRead, BufReader, Write},
	path::{Path, PathBuf},
	sync::{Arc, Mutex, PoisonError},
};

use thiserror::Error;

use super::{LedgerEvent, SequenceNumber};

/// Error types for event storage operations
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Failed to write events: {0}")]
	WriteFailed(String),
	#[error("Failed to read events: {0}")]
	ReadFailed(String),
	#[error("Storage corrupted: {0}")]
	Corrupted(String),
}

/// Event Storage trait - persistence layer for ledger events
///
/// Key properties:
/// - Append-only: events are never modified after writing
/// - Ordered: events can be replayed in sequence order
/// - Durable: events survive restarts (implementation-dependent)
///
/// An event is appended before it is applied to in-memory state, so a
/// failed append leaves the ledger unchanged.
pub trait EventStorage: Send {
	/// Append one event; returns its sequence number
	fn append(&mut self, event: &LedgerEvent) -> Result<SequenceNumber, StorageError>;

	/// Replay events from a given sequence number
	///
	/// Returns all events with sequence >= from_seq, in order.
	fn replay_from(&self, from_seq: SequenceNumber) -> Result<Vec<LedgerEvent>, StorageError>;

	/// Get the sequence number of the last committed event
	fn last_sequence(&self) -> SequenceNumber;

	/// Get total count of stored events
	fn event_count(&self) -> usize;
}

fn check_order(last: SequenceNumber, event: &LedgerEvent) -> Result<(), StorageError> {
	if event.sequence() <= last {
		return Err(StorageError::WriteFailed(format!(
			"sequence {} does not follow {}",
			event.sequence(),
			last
		)));
	}
	Ok(())
}

/// In-memory event storage
///
/// No durability. Clones share the same underlying log, so a test can keep
/// a clone to inspect what the engine committed.
#[derive(Clone, Default)]
pub struct MemoryEventStorage {
	events: Arc<Mutex<Vec<LedgerEvent>>>,
}

impl MemoryEventStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<LedgerEvent> {
		self.events
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

impl EventStorage for MemoryEventStorage {
	fn append(&mut self, event: &LedgerEvent) -> Result<SequenceNumber, StorageError> {
		let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
		let last = events.last().map(LedgerEvent::sequence).unwrap_or(0);
		check_order(last, event)?;
		events.push(event.clone());
		Ok(event.sequence())
	}

	fn replay_from(&self, from_seq: SequenceNumber) -> Result<Vec<LedgerEvent>, StorageError> {
		let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(events
			.iter()
			.filter(|e| e.sequence() >= from_seq)
			.cloned()
			.collect())
	}

	fn last_sequence(&self) -> SequenceNumber {
		self.events
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.last()
			.map(LedgerEvent::sequence)
			.unwrap_or(0)
	}

	fn event_count(&self) -> usize {
		self.events
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}
}

/// Append-only JSON-lines event log on disk
///
/// One event per line. Every append is flushed and synced before it is
/// acknowledged. A failed append is cut back off the file; if that is not
/// possible the storage refuses further appends until it is reopened.
pub struct FileEventStorage {
	path: PathBuf,
	file: File,
	/// Length of the acknowledged prefix of the file
	len: u64,
	last_seq: SequenceNumber,
	count: usize,
	poisoned: bool,
}

impl FileEventStorage {
	/// Open (or create) the log at `path`
	///
	/// Existing content is scanned so appends continue after the last
	/// stored sequence. An unterminated last line that does not parse is
	/// the remains of an interrupted append and is truncated away.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
		let path = path.as_ref().to_path_buf();
		if let Some(parent) = path.parent()
			&& !parent.as_os_str().is_empty()
		{
			std::fs::create_dir_all(parent).map_err(|e| {
				StorageError::WriteFailed(format!("create {}: {}", parent.display(), e))
			})?;
		}

		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.read(true)
			.open(&path)
			.map_err(|e| StorageError::WriteFailed(format!("open {}: {}", path.display(), e)))?;

		let scan = scan_log(&path)?;
		let mut len = scan.valid_len;
		match scan.tail {
			LogTail::Clean => {}
			LogTail::Torn { bytes } => {
				tracing::warn!(
					target: "ledger::recovery",
					path = %path.display(),
					bytes,
					"Truncating torn tail of event log"
				);
				file.set_len(scan.valid_len)
					.and_then(|_| file.sync_data())
					.map_err(|e| StorageError::WriteFailed(format!("truncate {}: {}", path.display(), e)))?;
			}
			LogTail::Unterminated => {
				file.write_all(b"\n")
					.and_then(|_| file.sync_data())
					.map_err(|e| StorageError::WriteFailed(format!("terminate {}: {}", path.display(), e)))?;
				len += 1;
			}
		}

		let last_seq = scan.events.last().map(LedgerEvent::sequence).unwrap_or(0);

		Ok(Self {
			path,
			file,
			len,
			last_seq,
			count: scan.events.len(),
			poisoned: false,
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Cut the file back to the acknowledged prefix after a failed append
	fn rollback(&mut self) {
		let restored = self
			.file
			.set_len(self.len)
			.and_then(|_| self.file.sync_data());
		if let Err(e) = restored {
			tracing::error!(
				target: "ledger::engine",
				path = %self.path.display(),
				error = %e,
				"Failed to roll back partial append, refusing further writes"
			);
			self.poisoned = true;
		}
	}
}

enum LogTail {
	Clean,
	/// Unterminated bytes after the last complete line that do not parse
	Torn { bytes: u64 },
	/// The last event parses but its newline never made it to disk
	Unterminated,
}

struct LogScan {
	events: Vec<LedgerEvent>,
	valid_len: u64,
	tail: LogTail,
}

fn scan_log(path: &Path) -> Result<LogScan, StorageError> {
	let file = File::open(path)
		.map_err(|e| StorageError::ReadFailed(format!("open {}: {}", path.display(), e)))?;
	let mut reader = BufReader::new(file);

	let mut events = Vec::new();
	let mut valid_len = 0u64;
	let mut line_no = 0usize;
	let mut line = Vec::new();
	loop {
		line.clear();
		let read = reader
			.read_until(b'\n', &mut line)
			.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
		if read == 0 {
			return Ok(LogScan {
				events,
				valid_len,
				tail: LogTail::Clean,
			});
		}
		line_no += 1;

		let terminated = line.ends_with(b"\n");
		if line.iter().all(u8::is_ascii_whitespace) {
			valid_len += read as u64;
			continue;
		}
		match serde_json::from_slice::<LedgerEvent>(&line) {
			Ok(event) => {
				events.push(event);
				valid_len += read as u64;
				if !terminated {
					return Ok(LogScan {
						events,
						valid_len,
						tail: LogTail::Unterminated,
					});
				}
			}
			Err(_) if !terminated => {
				return Ok(LogScan {
					events,
					valid_len,
					tail: LogTail::Torn { bytes: read as u64 },
				});
			}
			Err(e) => {
				return Err(StorageError::Corrupted(format!(
					"{} line {}: {}",
					path.display(),
					line_no,
					e
				)));
			}
		}
	}
}

impl EventStorage for FileEventStorage {
	fn append(&mut self, event: &LedgerEvent) -> Result<SequenceNumber, StorageError> {
		if self.poisoned {
			return Err(StorageError::WriteFailed(format!(
				"{} has an unrecoverable partial write",
				self.path.display()
			)));
		}
		check_order(self.last_seq, event)?;

		let mut line =
			serde_json::to_string(event).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
		line.push('\n');

		let written = self
			.file
			.write_all(line.as_bytes())
			.and_then(|_| self.file.flush())
			.and_then(|_| self.file.sync_data());
		if let Err(e) = written {
			self.rollback();
			return Err(StorageError::WriteFailed(e.to_string()));
		}

		self.len += line.len() as u64;
		self.last_seq = event.sequence();
		self.count += 1;
		Ok(self.last_seq)
	}

	fn replay_from(&self, from_seq: SequenceNumber) -> Result<Vec<LedgerEvent>, StorageError> {
		Ok(scan_log(&self.path)?
			.events
			.into_iter()
			.filter(|e| e.sequence() >= from_seq)
			.collect())
	}

	fn last_sequence(&self) -> SequenceNumber {
		self.last_seq
	}

	fn event_count(&self) -> usize {
		self.count
	}
}

#[cfg(test)]
mod tests {
	use chrono::{NaiveDate, Utc};
	use graft_sdk::types::{BloodGroup, Donation, DonationStatus};

	use super::*;

	fn create_test_event(seq: u64) -> LedgerEvent {
		LedgerEvent::DonationCreated {
			seq,
			donation: Donation {
				id: seq,
				donor_name: format!("donor_{}", seq),
				age: 30,
				blood_group: BloodGroup::OPositive,
				organ: "Kidney".to_string(),
				contact: "555".to_string(),
				city: "Pune".to_string(),
				availability_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
				status: DonationStatus::Pending,
				owner_user_id: "u1".to_string(),
				created_at: Utc::now(),
				settlement_id: None,
			},
			submission: None,
		}
	}

	fn temp_log() -> PathBuf {
		std::env::temp_dir()
			.join(format!("graft-storage-{}", uuid::Uuid::new_v4()))
			.join("ledger.jsonl")
	}

	#[test]
	fn test_append_and_replay() {
		let mut storage = MemoryEventStorage::new();

		storage.append(&create_test_event(1)).unwrap();
		let last_seq = storage.append(&create_test_event(2)).unwrap();
		assert_eq!(last_seq, 2);
		assert_eq!(storage.event_count(), 2);

		assert_eq!(storage.replay_from(1).unwrap().len(), 2);
		assert_eq!(storage.replay_from(2).unwrap().len(), 1);
	}

	#[test]
	fn test_out_of_order_append_rejected() {
		let mut storage = MemoryEventStorage::new();
		storage.append(&create_test_event(5)).unwrap();
		assert!(matches!(
			storage.append(&create_test_event(5)),
			Err(StorageError::WriteFailed(_))
		));
		assert_eq!(storage.last_sequence(), 5);
	}

	#[test]
	fn test_file_storage_survives_reopen() {
		let path = temp_log();
		{
			let mut storage = FileEventStorage::open(&path).unwrap();
			storage.append(&create_test_event(1)).unwrap();
			storage.append(&create_test_event(2)).unwrap();
		}

		let mut reopened = FileEventStorage::open(&path).unwrap();
		assert_eq!(reopened.last_sequence(), 2);
		assert_eq!(reopened.event_count(), 2);
		reopened.append(&create_test_event(3)).unwrap();

		let events = reopened.replay_from(2).unwrap();
		assert_eq!(events.len(), 2);
		assert_eq!(events[0].sequence(), 2);
		assert_eq!(events[1].sequence(), 3);
		assert_eq!(events[1].name(), "donation_created");

		std::fs::remove_dir_all(path.parent().unwrap()).ok();
	}

	#[test]
	fn test_file_storage_reports_corruption() {
		let path = temp_log();
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		std::fs::write(&path, "{not json}\n").unwrap();

		assert!(matches!(
			FileEventStorage::open(&path),
			Err(StorageError::Corrupted(_))
		));

		std::fs::remove_dir_all(path.parent().unwrap()).ok();
	}

	fn append_raw(path: &Path, bytes: &[u8]) {
		let mut file = OpenOptions::new().append(true).open(path).unwrap();
		file.write_all(bytes).unwrap();
	}

	#[test]
	fn test_torn_tail_is_truncated_on_open() {
		let path = temp_log();
		{
			let mut storage = FileEventStorage::open(&path).unwrap();
			storage.append(&create_test_event(1)).unwrap();
			storage.append(&create_test_event(2)).unwrap();
		}
		let line = serde_json::to_string(&create_test_event(3)).unwrap();
		append_raw(&path, &line.as_bytes()[..line.len() / 2]);

		let mut reopened = FileEventStorage::open(&path).unwrap();
		assert_eq!(reopened.last_sequence(), 2);
		assert_eq!(reopened.event_count(), 2);

		reopened.append(&create_test_event(3)).unwrap();
		drop(reopened);

		let reopened = FileEventStorage::open(&path).unwrap();
		let seqs: Vec<_> = reopened
			.replay_from(1)
			.unwrap()
			.iter()
			.map(LedgerEvent::sequence)
			.collect();
		assert_eq!(seqs, vec![1, 2, 3]);

		std::fs::remove_dir_all(path.parent().unwrap()).ok();
	}

	#[test]
	fn test_torn_tail_inside_multibyte_char_is_truncated() {
		let path = temp_log();
		{
			let mut storage = FileEventStorage::open(&path).unwrap();
			storage.append(&create_test_event(1)).unwrap();
		}
		// cut between the two bytes of 'é'
		append_raw(&path, b"{\"type\":\"donation_created\",\"donor_name\":\"Jos\xc3");

		let reopened = FileEventStorage::open(&path).unwrap();
		assert_eq!(reopened.last_sequence(), 1);
		assert_eq!(reopened.replay_from(1).unwrap().len(), 1);

		std::fs::remove_dir_all(path.parent().unwrap()).ok();
	}

	#[test]
	fn test_unterminated_complete_event_is_kept() {
		let path = temp_log();
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		let line = serde_json::to_string(&create_test_event(1)).unwrap();
		std::fs::write(&path, line).unwrap();

		let mut storage = FileEventStorage::open(&path).unwrap();
		assert_eq!(storage.last_sequence(), 1);
		storage.append(&create_test_event(2)).unwrap();
		assert_eq!(storage.replay_from(1).unwrap().len(), 2);

		std::fs::remove_dir_all(path.parent().unwrap()).ok();
	}

	#[test]
	fn test_rollback_drops_partial_append() {
		let path = temp_log();
		let mut storage = FileEventStorage::open(&path).unwrap();
		storage.append(&create_test_event(1)).unwrap();

		// bytes of a write that failed half way
		append_raw(&path, b"{\"type\":\"donation_cre");
		storage.rollback();
		assert!(!storage.poisoned);

		storage.append(&create_test_event(2)).unwrap();
		drop(storage);

		let reopened = FileEventStorage::open(&path).unwrap();
		assert_eq!(reopened.event_count(), 2);
		assert_eq!(reopened.last_sequence(), 2);

		std::fs::remove_dir_all(path.parent().unwrap()).ok();
	}

	#[test]
	fn test_poisoned_storage_refuses_appends() {
		let path = temp_log();
		let mut storage = FileEventStorage::open(&path).unwrap();
		storage.poisoned = true;

		assert!(matches!(
			storage.append(&create_test_event(1)),
			Err(StorageError::WriteFailed(_))
		));
		assert_eq!(storage.last_sequence(), 0);

		std::fs::remove_dir_all(path.parent().unwrap()).ok();
	}
}
