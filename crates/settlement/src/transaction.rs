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

use chrono::{DateTime, Utc};
use graft_sdk::types::{
	Donation, DonationFields, DonationStatus, Party, RecordId, Request, RequestStatus, Settlement,
	SettlementKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A planned settlement: the target record in its settled state plus the
/// binding that moved it there
///
/// Built by the settlement rules, then persisted and applied by the ledger
/// as one step. Nothing here is visible until it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementTransaction {
	Fulfill {
		request: Request,
		settlement: Settlement,
	},
	Accept {
		donation: Donation,
		settlement: Settlement,
	},
}

impl SettlementTransaction {
	pub fn settlement(&self) -> &Settlement {
		match self {
			SettlementTransaction::Fulfill { settlement, .. } => settlement,
			SettlementTransaction::Accept { settlement, .. } => settlement,
		}
	}

	pub fn target_id(&self) -> RecordId {
		match self {
			SettlementTransaction::Fulfill { request, .. } => request.id,
			SettlementTransaction::Accept { donation, .. } => donation.id,
		}
	}
}

fn new_settlement_id() -> String {
	Uuid::new_v4().to_string()
}

/// Recipient side taken from a stored request
pub fn request_party(request: &Request) -> Party {
	Party {
		user_id: request.owner_user_id.clone(),
		name: request.requester_name.clone(),
		email: None,
		phone: request.contact.clone(),
		city: request.city.clone(),
	}
}

/// Donor side taken from a stored donation
pub fn donation_party(donation: &Donation) -> Party {
	Party {
		user_id: donation.owner_user_id.clone(),
		name: donation.donor_name.clone(),
		email: None,
		phone: donation.contact.clone(),
		city: donation.city.clone(),
	}
}

/// Bind `donor` to `request`, producing the matched request
pub(crate) fn build_fulfillment(
	request: &Request,
	fields: &DonationFields,
	donor: Party,
	now: DateTime<Utc>,
) -> SettlementTransaction {
	let settlement = Settlement {
		id: new_settlement_id(),
		kind: SettlementKind::Fulfill,
		donation_id: None,
		request_id: Some(request.id),
		organ: fields.organ.trim().to_string(),
		donor,
		recipient: request_party(request),
		settled_at: now,
	};

	let mut request = request.clone();
	request.status = RequestStatus::Matched;
	request.settlement_id = Some(settlement.id.clone());

	SettlementTransaction::Fulfill {
		request,
		settlement,
	}
}

/// Bind `recipient` to `donation`, producing the accepted donation
pub(crate) fn build_acceptance(
	donation: &Donation,
	recipient: Party,
	now: DateTime<Utc>,
) -> SettlementTransaction {
	let settlement = Settlement {
		id: new_settlement_id(),
		kind: SettlementKind::Accept,
		donation_id: Some(donation.id),
		request_id: None,
		organ: donation.organ.clone(),
		donor: donation_party(donation),
		recipient,
		settled_at: now,
	};

	let mut donation = donation.clone();
	donation.status = DonationStatus::Accepted;
	donation.settlement_id = Some(settlement.id.clone());

	SettlementTransaction::Accept {
		donation,
		settlement,
	}
}
