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

use actix_web::web;

use crate::handlers;

/// Configure API routes for the gateway
///
/// - `/api/donations`, `/api/requests` - public lists, match checks, creates
/// - `/api/requests/{id}/fulfill`, `/api/donations/{id}/accept` - settlements
/// - `/api/my-activity`, `/api/settlements/{id}` - caller's own view
/// - `/health` - Health check endpoint
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
	cfg.service(
		web::scope("/api")
			.route("/donations", web::get().to(handlers::list_donations))
			.route("/donations", web::post().to(handlers::create_donation))
			.route(
				"/donations/check-matches",
				web::post().to(handlers::check_donation_matches),
			)
			.route(
				"/donations/{donation_id}/accept",
				web::put().to(handlers::accept_donation),
			)
			.route("/requests", web::get().to(handlers::list_requests))
			.route("/requests", web::post().to(handlers::create_request))
			.route(
				"/requests/check-matches",
				web::post().to(handlers::check_request_matches),
			)
			.route(
				"/requests/{request_id}/fulfill",
				web::put().to(handlers::fulfill_request),
			)
			.route("/my-activity", web::get().to(handlers::my_activity))
			.route(
				"/settlements/{settlement_id}",
				web::get().to(handlers::match_detail),
			),
	)
	.route("/health", web::get().to(handlers::health));
}
