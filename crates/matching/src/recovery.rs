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

use thiserror::Error;
use tracing::{info, warn};

use crate::{
	engine::{ApplyError, Ledger, LedgerState},
	event::{EventStorage, StorageError},
	journal::SubmissionJournal,
};

#[derive(Debug, Error)]
pub enum RecoveryError {
	#[error("Failed to read event log: {0}")]
	Storage(#[from] StorageError),
	#[error("Event log cannot be replayed: {0}")]
	Apply(#[from] ApplyError),
}

/// Rebuilds ledger state from the event log on startup
///
/// Records, settlements and the submission journal are all derived from
/// events, so replaying the full log restores everything a previous run
/// acknowledged.
pub struct RecoveryCoordinator {
	event_storage: Box<dyn EventStorage>,
	journal: Box<dyn SubmissionJournal>,
}

impl RecoveryCoordinator {
	pub fn new(event_storage: Box<dyn EventStorage>, journal: Box<dyn SubmissionJournal>) -> Self {
		Self {
			event_storage,
			journal,
		}
	}

	/// Perform full recovery
	///
	/// Returns the rebuilt ledger, ready to hand to the engine, plus the last
	/// replayed sequence (`None` on a clean start).
	pub fn recover(self) -> Result<(Ledger, Option<u64>), RecoveryError> {
		info!(target: "ledger::recovery", "Starting recovery...");

		let mut state = LedgerState::new(self.journal);
		let last_event_seq = self.event_storage.last_sequence();

		if last_event_seq == 0 {
			info!(target: "ledger::recovery", "No events to replay, starting from empty state");
			return Ok((Ledger::from_parts(state, self.event_storage), None));
		}

		let events = self.event_storage.replay_from(1)?;
		info!(
			target: "ledger::recovery",
			"Replaying events from seq=1 to seq={}",
			last_event_seq
		);

		for event in &events {
			if let Err(e) = state.apply(event) {
				warn!(
					target: "ledger::recovery",
					seq = event.sequence(),
					event = event.name(),
					"Replay stopped: {}",
					e
				);
				return Err(e.into());
			}
		}

		info!(
			target: "ledger::recovery",
			events = events.len(),
			donations = state.donations().count(),
			requests = state.requests().count(),
			settlements = state.settlements().count(),
			"Recovery complete at seq={}",
			last_event_seq
		);

		Ok((Ledger::from_parts(state, self.event_storage), Some(last_event_seq)))
	}
}
