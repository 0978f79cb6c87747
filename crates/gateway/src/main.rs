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

//! Graft Gateway Service
//!
//! HTTP front of the donation ledger. The gateway authenticates callers with
//! a bearer token, applies per-user rate limits and forwards every read and
//! write to the single ledger loop.
//!
//! # Startup
//!
//! 1. Logging and `.env`
//! 2. Gateway and ledger configuration
//! 3. Event log replay via the recovery coordinator
//! 4. Ledger loop thread, then the HTTP server
//!
//! On shutdown the HTTP server drains first, then the ledger loop is stopped
//! so no accepted write is lost.

mod admission;
mod auth;
mod config;
mod dispatcher;
mod handlers;
mod logging;
mod middleware;
mod request_context;
mod routes;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use graft_matching::{
	EngineConfig, LedgerEngine, MatchingConfig, MemorySubmissionJournal, RecoveryCoordinator,
};
use tracing::info;

use crate::{
	admission::AdmissionController, auth::BearerTokenProvider, config::GatewayRuntimeConfig,
	dispatcher::LedgerDispatcher, logging::init_logging, server::GatewayState,
};

#[actix_rt::main]
async fn main() -> Result<()> {
	// Initialize logging first
	init_logging()?;

	let config = GatewayRuntimeConfig::from_env().context("Failed to load gateway config")?;
	let ledger_config = match &config.ledger_config_path {
		Some(path) => MatchingConfig::from_file(path)
			.with_context(|| format!("Failed to load ledger config from {}", path))?,
		None => MatchingConfig::from_env().context("Failed to load ledger config")?,
	};

	let storage = ledger_config
		.open_storage()
		.context("Failed to open event storage")?;
	let (ledger, last_seq) =
		RecoveryCoordinator::new(storage, Box::new(MemorySubmissionJournal::new()))
			.recover()
			.context("Failed to recover ledger state")?;
	info!(target: "server", ?last_seq, "Ledger recovered");

	let (engine, handle) = LedgerEngine::spawn(EngineConfig::from(&ledger_config), ledger)
		.context("Failed to start ledger engine")?;

	let state = GatewayState {
		dispatcher: LedgerDispatcher::new(handle, config.ledger_timeout()),
		auth_provider: Arc::new(BearerTokenProvider::new(&config.jwt_secret)),
		admission: AdmissionController::new(config.rate_limit_rps, config.rate_limit_burst)
			.context("Invalid rate limit settings")?,
	};

	info!(target: "server", "Starting Graft Gateway on {}", config.bind_addr);
	let served = server::serve(&config, state).await;

	engine.shutdown();
	info!(target: "server", "Ledger engine stopped");

	served
}
