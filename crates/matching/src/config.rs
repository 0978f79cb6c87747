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

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::event::{EventStorage, FileEventStorage, MemoryEventStorage, StorageError};

/// Ledger engine settings
///
/// Read from `MATCHING_*` environment variables, optionally layered over a
/// config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
	/// Capacity of the ingress queue in front of the ledger loop
	pub ingress_queue_size: usize,
	/// JSON-lines event log; in-memory when unset
	pub ledger_path: Option<PathBuf>,
	/// Log every processed command at debug level
	pub verbose_logging: bool,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			ingress_queue_size: 1024,
			ledger_path: None,
			verbose_logging: false,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Open the configured event storage
	pub fn open_storage(&self) -> Result<Box<dyn EventStorage>, StorageError> {
		match &self.ledger_path {
			Some(path) => Ok(Box::new(FileEventStorage::open(path)?)),
			None => Ok(Box::new(MemoryEventStorage::new())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_use_memory_storage() {
		let config = MatchingConfig::default();
		assert_eq!(config.ingress_queue_size, 1024);
		let storage = config.open_storage().unwrap();
		assert_eq!(storage.event_count(), 0);
	}

	#[test]
	fn test_partial_source_keeps_defaults() {
		let cfg = config::Config::builder()
			.set_override("verbose_logging", true)
			.unwrap()
			.build()
			.unwrap();
		let config: MatchingConfig = cfg.try_deserialize().unwrap();
		assert!(config.verbose_logging);
		assert_eq!(config.ingress_queue_size, 1024);
		assert!(config.ledger_path.is_none());
	}
}
