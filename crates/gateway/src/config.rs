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

use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result, bail};

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const LOG_COMPONENT_NAME: &str = "gateway";

pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

pub const DEFAULT_RATE_LIMIT_RPS: u32 = 20;

pub const DEFAULT_RATE_LIMIT_BURST: u32 = 40;

pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

pub const DEFAULT_LEDGER_TIMEOUT_MS: u64 = 1_500;

#[derive(Debug, Clone)]
pub struct GatewayRuntimeConfig {
	pub bind_addr: SocketAddr,
	pub workers: usize,
	pub max_body_bytes: usize,
	/// How long a handler waits for the ledger before answering 504
	pub ledger_timeout_ms: u64,
	pub rate_limit_rps: u32,
	pub rate_limit_burst: u32,
	pub jwt_secret: String,
	/// Optional config file for the ledger engine (`MATCHING_*` otherwise)
	pub ledger_config_path: Option<String>,
}

impl GatewayRuntimeConfig {
	pub fn from_env() -> Result<Self> {
		dotenv::dotenv().ok();
		Self::from_lookup(|key| env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let bind_addr_str =
			lookup("GATEWAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
		let bind_addr = bind_addr_str
			.parse()
			.with_context(|| format!("Invalid bind address: {}", bind_addr_str))?;

		let workers = parsed(&lookup, "GATEWAY_WORKERS").unwrap_or_else(num_cpus::get);

		let jwt_secret = match lookup("GATEWAY_JWT_SECRET") {
			Some(secret) if !secret.trim().is_empty() => secret,
			_ => bail!("GATEWAY_JWT_SECRET must be set"),
		};

		Ok(Self {
			bind_addr,
			workers,
			max_body_bytes: parsed(&lookup, "GATEWAY_MAX_BODY_BYTES")
				.unwrap_or(DEFAULT_MAX_BODY_BYTES),
			ledger_timeout_ms: parsed(&lookup, "GATEWAY_LEDGER_TIMEOUT_MS")
				.unwrap_or(DEFAULT_LEDGER_TIMEOUT_MS),
			rate_limit_rps: parsed(&lookup, "GATEWAY_RATE_LIMIT_RPS")
				.unwrap_or(DEFAULT_RATE_LIMIT_RPS),
			rate_limit_burst: parsed(&lookup, "GATEWAY_RATE_LIMIT_BURST")
				.unwrap_or(DEFAULT_RATE_LIMIT_BURST),
			jwt_secret,
			ledger_config_path: lookup("GATEWAY_LEDGER_CONFIG"),
		})
	}

	pub fn ledger_timeout(&self) -> Duration {
		Duration::from_millis(self.ledger_timeout_ms)
	}
}

/// Unparseable values fall back to the default like missing ones
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
	lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn config_from(vars: &[(&str, &str)]) -> Result<GatewayRuntimeConfig> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		GatewayRuntimeConfig::from_lookup(|key| vars.get(key).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = config_from(&[("GATEWAY_JWT_SECRET", "s3cret")]).unwrap();
		assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
		assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
		assert_eq!(config.ledger_timeout(), Duration::from_millis(1_500));
		assert_eq!(config.rate_limit_rps, DEFAULT_RATE_LIMIT_RPS);
		assert_eq!(config.rate_limit_burst, DEFAULT_RATE_LIMIT_BURST);
		assert!(config.workers >= 1);
		assert!(config.ledger_config_path.is_none());
	}

	#[test]
	fn test_overrides_and_bad_values() {
		let config = config_from(&[
			("GATEWAY_JWT_SECRET", "s3cret"),
			("GATEWAY_BIND_ADDR", "127.0.0.1:9000"),
			("GATEWAY_WORKERS", "3"),
			("GATEWAY_RATE_LIMIT_RPS", "not-a-number"),
		])
		.unwrap();
		assert_eq!(config.bind_addr.port(), 9000);
		assert_eq!(config.workers, 3);
		assert_eq!(config.rate_limit_rps, DEFAULT_RATE_LIMIT_RPS);
	}

	#[test]
	fn test_secret_required() {
		assert!(config_from(&[]).is_err());
		assert!(config_from(&[("GATEWAY_JWT_SECRET", "  ")]).is_err());
		assert!(config_from(&[("GATEWAY_JWT_SECRET", "x"), ("GATEWAY_BIND_ADDR", "nope")]).is_err());
	}
}
