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

//! Graft ledger engine
//!
//! Owns every donation, request and settlement. All reads and writes are
//! funnelled through one loop thread, fed by a bounded ingress queue, and
//! every write is appended to an event log before it becomes visible.

pub mod config;
pub mod engine;
pub mod event;
pub mod journal;
pub mod matcher;
pub mod queue;
pub mod recovery;

pub use config::MatchingConfig;
pub use engine::{
	ApplyError, EngineConfig, EngineError, Ledger, LedgerCommand, LedgerEngine, LedgerHandle,
	LedgerState,
};
pub use event::{
	EventStorage, FileEventStorage, LedgerEvent, MemoryEventStorage, SequenceNumber, StorageError,
};
pub use journal::{JournalEntry, MemorySubmissionJournal, SubmissionJournal, WriteOp};
pub use queue::{IngressQueue, QueueError, QueueReceiver, QueueSender};
pub use recovery::{RecoveryCoordinator, RecoveryError};
