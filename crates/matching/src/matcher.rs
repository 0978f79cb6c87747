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

//! Match finder and read-side queries
//!
//! Pure functions over ledger records. The engine calls them from its loop,
//! so every result reflects one consistent point in the event sequence.

use std::cmp::Reverse;

use graft_sdk::types::{
	Activity, Donation, DonationFields, DonationFilter, MatchDetail, Request, RequestFields,
	RequestFilter, Settlement, SettlementRole,
};

fn same_text(a: &str, b: &str) -> bool {
	a.trim().eq_ignore_ascii_case(b.trim())
}

fn filter_text(filter: &Option<String>, value: &str) -> bool {
	match filter.as_deref().map(str::trim) {
		None | Some("") => true,
		Some(wanted) => same_text(wanted, value),
	}
}

/// Pending requests a prospective donation could fulfill
///
/// Same organ and city, ABO/Rh-compatible with the donor, not owned by the
/// caller. Ordered by ascending id.
pub fn requests_for_donation<'a>(
	fields: &DonationFields,
	caller_id: &str,
	requests: impl IntoIterator<Item = &'a Request>,
) -> Vec<Request> {
	let mut matches: Vec<Request> = requests
		.into_iter()
		.filter(|r| r.is_pending())
		.filter(|r| r.owner_user_id != caller_id)
		.filter(|r| same_text(&r.organ_needed, &fields.organ))
		.filter(|r| same_text(&r.city, &fields.city))
		.filter(|r| fields.blood_group.can_donate_to(r.blood_group))
		.cloned()
		.collect();
	matches.sort_by_key(|r| r.id);
	matches
}

/// Pending donations a prospective request could accept
pub fn donations_for_request<'a>(
	fields: &RequestFields,
	caller_id: &str,
	donations: impl IntoIterator<Item = &'a Donation>,
) -> Vec<Donation> {
	let mut matches: Vec<Donation> = donations
		.into_iter()
		.filter(|d| d.is_pending())
		.filter(|d| d.owner_user_id != caller_id)
		.filter(|d| same_text(&d.organ, &fields.organ_needed))
		.filter(|d| same_text(&d.city, &fields.city))
		.filter(|d| d.blood_group.can_donate_to(fields.blood_group))
		.cloned()
		.collect();
	matches.sort_by_key(|d| d.id);
	matches
}

/// Public donation list: pending only, narrowed by `filter`
pub fn list_donations<'a>(
	filter: &DonationFilter,
	donations: impl IntoIterator<Item = &'a Donation>,
) -> Vec<Donation> {
	donations
		.into_iter()
		.filter(|d| d.is_pending())
		.filter(|d| filter_text(&filter.city, &d.city))
		.filter(|d| filter_text(&filter.organ, &d.organ))
		.filter(|d| filter.blood_group.is_none_or(|bg| bg == d.blood_group))
		.cloned()
		.collect()
}

/// Public request list: pending only, narrowed by `filter`
pub fn list_requests<'a>(
	filter: &RequestFilter,
	requests: impl IntoIterator<Item = &'a Request>,
) -> Vec<Request> {
	requests
		.into_iter()
		.filter(|r| r.is_pending())
		.filter(|r| filter_text(&filter.city, &r.city))
		.filter(|r| filter_text(&filter.organ_needed, &r.organ_needed))
		.filter(|r| filter.blood_group.is_none_or(|bg| bg == r.blood_group))
		.cloned()
		.collect()
}

/// Records owned by `user_id` in any status, plus settlements they took
/// part in, newest settlement first
pub fn activity<'a>(
	user_id: &str,
	donations: impl IntoIterator<Item = &'a Donation>,
	requests: impl IntoIterator<Item = &'a Request>,
	settlements: impl IntoIterator<Item = &'a Settlement>,
) -> Activity {
	let mut settlements: Vec<Settlement> = settlements
		.into_iter()
		.filter(|s| s.involves(user_id))
		.cloned()
		.collect();
	settlements.sort_by_key(|s| Reverse(s.settled_at));

	Activity {
		donations: donations
			.into_iter()
			.filter(|d| d.owner_user_id == user_id)
			.cloned()
			.collect(),
		requests: requests
			.into_iter()
			.filter(|r| r.owner_user_id == user_id)
			.cloned()
			.collect(),
		settlements,
	}
}

/// Counterpart details of `settlement` as seen by `user_id`
///
/// Returns `None` when the user is not a party to it.
pub fn match_detail(settlement: &Settlement, user_id: &str) -> Option<MatchDetail> {
	let (role, counterpart) = if settlement.donor.user_id == user_id {
		(SettlementRole::Donor, &settlement.recipient)
	} else if settlement.recipient.user_id == user_id {
		(SettlementRole::Recipient, &settlement.donor)
	} else {
		return None;
	};

	Some(MatchDetail {
		settlement_id: settlement.id.clone(),
		role,
		organ: settlement.organ.clone(),
		counterpart: counterpart.clone(),
	})
}
