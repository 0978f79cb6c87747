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

mod control;
mod handle;
mod ledger;
mod state;

pub use control::{LedgerCommand, Reply};
pub use handle::LedgerHandle;
pub use ledger::Ledger;
pub use state::{ApplyError, LedgerState};

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::Duration,
};

use graft_settlement::SettlementError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
	config::MatchingConfig,
	event::StorageError,
	queue::{IngressQueue, QueueError, QueueReceiver},
};

/// Error types for ledger engine operations
#[derive(Debug, Error)]
pub enum EngineError {
	#[error(transparent)]
	Settlement(#[from] SettlementError),
	#[error("Settlement {0} not found")]
	SettlementNotFound(String),
	#[error("Not a party to settlement {0}")]
	NotParticipant(String),
	#[error("Event storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Failed to apply event: {0}")]
	State(#[from] ApplyError),
	#[error("Ledger state inconsistent: {0}")]
	Inconsistent(String),
	#[error("Ledger is overloaded")]
	Overloaded,
	#[error("Engine shutdown")]
	Shutdown,
	#[error("Failed to start engine: {0}")]
	Spawn(String),
}

/// Configuration for the ledger engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
	pub ingress_queue_size: usize,
	pub verbose_logging: bool,
	/// How often an idle loop wakes to check for shutdown
	pub idle_poll: Duration,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			ingress_queue_size: 1024,
			verbose_logging: false,
			idle_poll: Duration::from_millis(50),
		}
	}
}

impl From<&MatchingConfig> for EngineConfig {
	fn from(config: &MatchingConfig) -> Self {
		Self {
			ingress_queue_size: config.ingress_queue_size,
			verbose_logging: config.verbose_logging,
			..Self::default()
		}
	}
}

/// Ledger engine with a single-threaded command loop
///
/// The LedgerEngine runs the ledger in a dedicated thread, consuming
/// LedgerCommands from the ingress queue and answering each on its oneshot
/// channel.
///
/// Architecture:
/// - Single-threaded: every read and write runs on one thread
/// - Event-sourced: every state change is appended to storage first
/// - Non-blocking: callers talk to the loop through channels only
///
/// Because the loop is the only writer, two users racing to settle the same
/// record are serialized here: the first commit wins and the second sees
/// the record already settled.
pub struct LedgerEngine {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl LedgerEngine {
	/// Start the ledger loop on `queue_receiver`
	pub fn start(
		config: EngineConfig,
		queue_receiver: QueueReceiver,
		ledger: Ledger,
	) -> Result<Self, EngineError> {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("ledger-loop".to_string())
			.spawn(move || {
				let mut ledger = ledger;
				info!(
					target: "ledger::engine",
					next_seq = ledger.state().next_sequence(),
					"Ledger engine started"
				);
				Self::run_loop(&mut ledger, &config, &queue_receiver, &shutdown_clone);
				info!(target: "ledger::engine", "Ledger engine stopped");
			})
			.map_err(|e| EngineError::Spawn(e.to_string()))?;

		Ok(Self {
			thread_handle: Some(thread_handle),
			shutdown,
		})
	}

	/// Create the ingress queue, start the loop and return a handle to it
	pub fn spawn(config: EngineConfig, ledger: Ledger) -> Result<(Self, LedgerHandle), EngineError> {
		let (sender, receiver) = IngressQueue::new(config.ingress_queue_size).split();
		let engine = Self::start(config, receiver, ledger)?;
		Ok((engine, LedgerHandle::new(sender)))
	}

	fn run_loop(
		ledger: &mut Ledger,
		config: &EngineConfig,
		queue_receiver: &QueueReceiver,
		shutdown: &Arc<AtomicBool>,
	) {
		loop {
			if shutdown.load(Ordering::Relaxed) {
				break;
			}

			let cmd = match queue_receiver.recv_timeout(config.idle_poll) {
				Ok(cmd) => cmd,
				Err(QueueError::Empty) => continue,
				Err(QueueError::Disconnected) => {
					debug!(target: "ledger::engine", "Ingress queue disconnected");
					break;
				}
				Err(QueueError::Full) => {
					error!(target: "ledger::engine", "Unexpected Full error on recv");
					continue;
				}
			};

			if config.verbose_logging {
				debug!(target: "ledger::engine", command = cmd.name(), "Processing command");
			}

			if !Self::process_command(ledger, cmd) {
				break;
			}
		}
	}

	/// Process a single command; returns false on shutdown
	fn process_command(ledger: &mut Ledger, cmd: LedgerCommand) -> bool {
		match cmd {
			LedgerCommand::ListDonations { filter, respond_to } => {
				reply(respond_to, Ok(ledger.list_donations(&filter)));
			}
			LedgerCommand::ListRequests { filter, respond_to } => {
				reply(respond_to, Ok(ledger.list_requests(&filter)));
			}
			LedgerCommand::CheckDonationMatches {
				caller_id,
				fields,
				respond_to,
			} => {
				reply(
					respond_to,
					Ok(ledger.check_donation_matches(&caller_id, &fields)),
				);
			}
			LedgerCommand::CheckRequestMatches {
				caller_id,
				fields,
				respond_to,
			} => {
				reply(
					respond_to,
					Ok(ledger.check_request_matches(&caller_id, &fields)),
				);
			}
			LedgerCommand::CreateDonation {
				caller,
				fields,
				key,
				respond_to,
			} => {
				reply(
					respond_to,
					ledger.create_donation(&caller, &fields, key.as_ref()),
				);
			}
			LedgerCommand::CreateRequest {
				caller,
				fields,
				key,
				respond_to,
			} => {
				reply(
					respond_to,
					ledger.create_request(&caller, &fields, key.as_ref()),
				);
			}
			LedgerCommand::FulfillRequest {
				caller,
				request_id,
				fields,
				key,
				respond_to,
			} => {
				reply(
					respond_to,
					ledger.fulfill_request(&caller, request_id, &fields, key.as_ref()),
				);
			}
			LedgerCommand::AcceptDonation {
				caller,
				donation_id,
				key,
				respond_to,
			} => {
				reply(
					respond_to,
					ledger.accept_donation(&caller, donation_id, key.as_ref()),
				);
			}
			LedgerCommand::Activity {
				user_id,
				respond_to,
			} => {
				reply(respond_to, Ok(ledger.activity(&user_id)));
			}
			LedgerCommand::MatchDetail {
				user_id,
				settlement_id,
				respond_to,
			} => {
				reply(respond_to, ledger.match_detail(&user_id, &settlement_id));
			}
			LedgerCommand::Shutdown => return false,
		}
		true
	}

	/// Shutdown the ledger engine gracefully
	pub fn shutdown(mut self) {
		info!(target: "ledger::engine", "Shutting down ledger engine");
		self.stop();
	}

	fn stop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "ledger::engine", "Ledger engine thread panicked: {:?}", e);
		}
	}
}

impl Drop for LedgerEngine {
	fn drop(&mut self) {
		self.stop();
	}
}

fn reply<T>(respond_to: Reply<T>, result: Result<T, EngineError>) {
	if let Err(e) = &result {
		debug!(target: "ledger::engine", error = %e, "Command rejected");
	}
	// The caller may have timed out; a committed write stays committed.
	if respond_to.send(result).is_err() {
		debug!(target: "ledger::engine", "Reply dropped, caller went away");
	}
}
