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

use std::sync::Arc;

use actix_web::{App, HttpServer, error, web};
use anyhow::{Context, Result};

use crate::{
	admission::AdmissionController,
	auth::AuthProvider,
	config::GatewayRuntimeConfig,
	dispatcher::LedgerDispatcher,
	handlers::GatewayError,
	middleware::{CorsMiddleware, LoggingMiddleware},
	routes::configure_routes,
};

/// Shared state handed to every handler
pub struct GatewayState {
	pub dispatcher: LedgerDispatcher,
	pub auth_provider: Arc<dyn AuthProvider>,
	pub admission: AdmissionController,
}

/// JSON extractor settings; malformed bodies answer with a `validation_error`
pub fn json_config(max_body_bytes: usize) -> web::JsonConfig {
	web::JsonConfig::default()
		.limit(max_body_bytes)
		.error_handler(|err, _req| GatewayError::BadPayload(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
	web::QueryConfig::default()
		.error_handler(|err, _req| GatewayError::BadPayload(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
	web::PathConfig::default().error_handler(|err: error::PathError, _req| {
		GatewayError::BadPayload(err.to_string()).into()
	})
}

/// Run the HTTP server until it is stopped by a signal
pub async fn serve(config: &GatewayRuntimeConfig, state: GatewayState) -> Result<()> {
	let state = web::Data::new(state);
	let max_body_bytes = config.max_body_bytes;

	tracing::info!(
		target: "server",
		bind_addr = %config.bind_addr,
		workers = config.workers,
		"Starting HTTP server"
	);

	HttpServer::new(move || {
		App::new()
			.app_data(state.clone())
			.app_data(json_config(max_body_bytes))
			.app_data(query_config())
			.app_data(path_config())
			.wrap(CorsMiddleware)
			.wrap(LoggingMiddleware)
			.configure(configure_routes)
	})
	.workers(config.workers)
	.bind(config.bind_addr)
	.with_context(|| format!("Failed to bind {}", config.bind_addr))?
	.run()
	.await
	.context("HTTP server terminated with an error")?;

	tracing::info!(target: "server", "HTTP server stopped");
	Ok(())
}
