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

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a donation or request
pub type RecordId = u64;

/// ABO/Rh blood group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
	#[serde(rename = "A+")]
	APositive,
	#[serde(rename = "A-")]
	ANegative,
	#[serde(rename = "B+")]
	BPositive,
	#[serde(rename = "B-")]
	BNegative,
	#[serde(rename = "AB+")]
	AbPositive,
	#[serde(rename = "AB-")]
	AbNegative,
	#[serde(rename = "O+")]
	OPositive,
	#[serde(rename = "O-")]
	ONegative,
}

impl BloodGroup {
	pub const ALL: [BloodGroup; 8] = [
		BloodGroup::APositive,
		BloodGroup::ANegative,
		BloodGroup::BPositive,
		BloodGroup::BNegative,
		BloodGroup::AbPositive,
		BloodGroup::AbNegative,
		BloodGroup::OPositive,
		BloodGroup::ONegative,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			BloodGroup::APositive => "A+",
			BloodGroup::ANegative => "A-",
			BloodGroup::BPositive => "B+",
			BloodGroup::BNegative => "B-",
			BloodGroup::AbPositive => "AB+",
			BloodGroup::AbNegative => "AB-",
			BloodGroup::OPositive => "O+",
			BloodGroup::ONegative => "O-",
		}
	}

	fn antigens(&self) -> (bool, bool) {
		match self {
			BloodGroup::APositive | BloodGroup::ANegative => (true, false),
			BloodGroup::BPositive | BloodGroup::BNegative => (false, true),
			BloodGroup::AbPositive | BloodGroup::AbNegative => (true, true),
			BloodGroup::OPositive | BloodGroup::ONegative => (false, false),
		}
	}

	fn rh_positive(&self) -> bool {
		matches!(
			self,
			BloodGroup::APositive
				| BloodGroup::BPositive
				| BloodGroup::AbPositive
				| BloodGroup::OPositive
		)
	}

	/// Whether a donor of this group is compatible with `recipient`
	///
	/// The donor must not carry an A/B antigen the recipient lacks, and an
	/// Rh-positive donor can only give to an Rh-positive recipient.
	pub fn can_donate_to(&self, recipient: BloodGroup) -> bool {
		let (donor_a, donor_b) = self.antigens();
		let (recipient_a, recipient_b) = recipient.antigens();
		let abo_ok = (!donor_a || recipient_a) && (!donor_b || recipient_b);
		let rh_ok = !self.rh_positive() || recipient.rh_positive();
		abo_ok && rh_ok
	}
}

impl fmt::Display for BloodGroup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a blood group string is not one of the eight groups
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown blood group: {0}")]
pub struct ParseBloodGroupError(pub String);

impl FromStr for BloodGroup {
	type Err = ParseBloodGroupError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_uppercase();
		BloodGroup::ALL
			.into_iter()
			.find(|group| group.as_str() == normalized)
			.ok_or_else(|| ParseBloodGroupError(s.to_string()))
	}
}

/// Donation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
	Pending,
	Accepted,
}

/// Request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
	Pending,
	Matched,
}

/// Typed donation payload, produced from a validated form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationFields {
	pub donor_name: String,
	pub age: u32,
	pub blood_group: BloodGroup,
	pub organ: String,
	pub contact: String,
	pub city: String,
	pub availability_date: NaiveDate,
}

/// Typed request payload, produced from a validated form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFields {
	pub requester_name: String,
	pub age: u32,
	pub blood_group: BloodGroup,
	pub organ_needed: String,
	pub contact: String,
	pub city: String,
}

/// Stored donation offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
	pub id: RecordId,
	pub donor_name: String,
	pub age: u32,
	pub blood_group: BloodGroup,
	pub organ: String,
	pub contact: String,
	pub city: String,
	pub availability_date: NaiveDate,
	pub status: DonationStatus,
	pub owner_user_id: String,
	pub created_at: DateTime<Utc>,
	/// Settlement that accepted this donation, once accepted
	#[serde(default)]
	pub settlement_id: Option<String>,
}

impl Donation {
	pub fn is_pending(&self) -> bool {
		self.status == DonationStatus::Pending
	}
}

/// Stored organ request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
	pub id: RecordId,
	pub requester_name: String,
	pub age: u32,
	pub blood_group: BloodGroup,
	pub organ_needed: String,
	pub contact: String,
	pub city: String,
	pub status: RequestStatus,
	pub owner_user_id: String,
	pub created_at: DateTime<Utc>,
	/// Settlement that fulfilled this request, once matched
	#[serde(default)]
	pub settlement_id: Option<String>,
}

impl Request {
	pub fn is_pending(&self) -> bool {
		self.status == RequestStatus::Pending
	}
}

/// Profile of the signed-in user, used to pre-fill forms and to
/// supply contact details when accepting a donation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	pub full_name: String,
	pub email: String,
	pub phone: String,
	pub city: String,
	#[serde(default)]
	pub blood_group: Option<BloodGroup>,
}

/// One side of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
	pub user_id: String,
	pub name: String,
	#[serde(default)]
	pub email: Option<String>,
	pub phone: String,
	pub city: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementKind {
	/// A donor fulfilled an existing request
	Fulfill,
	/// A recipient accepted an existing donation
	Accept,
}

/// Binding between a donor and a recipient
///
/// Created atomically with the status transition of the target record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
	pub id: String,
	pub kind: SettlementKind,
	pub donation_id: Option<RecordId>,
	pub request_id: Option<RecordId>,
	pub organ: String,
	pub donor: Party,
	pub recipient: Party,
	pub settled_at: DateTime<Utc>,
}

impl Settlement {
	/// Record id that was moved out of `pending` by this settlement
	pub fn target_id(&self) -> Option<RecordId> {
		match self.kind {
			SettlementKind::Fulfill => self.request_id,
			SettlementKind::Accept => self.donation_id,
		}
	}

	pub fn involves(&self, user_id: &str) -> bool {
		self.donor.user_id == user_id || self.recipient.user_id == user_id
	}
}

/// Filters for the public donation list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationFilter {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub blood_group: Option<BloodGroup>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub organ: Option<String>,
}

/// Filters for the public request list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub blood_group: Option<BloodGroup>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub organ_needed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationList {
	pub donations: Vec<Donation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestList {
	pub requests: Vec<Request>,
}

/// Match finder response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchList<T> {
	pub matches: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationReceipt {
	pub message: String,
	pub donation: Donation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestReceipt {
	pub message: String,
	pub request: Request,
}

/// Response to fulfilling a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillReceipt {
	pub message: String,
	pub request: Request,
	pub settlement: Settlement,
}

/// Response to accepting a donation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptReceipt {
	pub message: String,
	pub donation: Donation,
	pub settlement: Settlement,
}

/// Everything the caller owns or took part in
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Activity {
	pub donations: Vec<Donation>,
	pub requests: Vec<Request>,
	pub settlements: Vec<Settlement>,
}

/// Which side of a settlement the viewer is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementRole {
	Donor,
	Recipient,
}

/// Counterpart contact details for a settlement the viewer took part in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
	pub settlement_id: String,
	pub role: SettlementRole,
	pub organ: String,
	pub counterpart: Party,
}

/// HTTP header carrying the submission key on writes
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Longest accepted submission key
pub const MAX_SUBMISSION_KEY_LEN: usize = 128;

/// Client-generated idempotency key, one per intake submission
///
/// Repeating a write with the same key returns the first result instead of
/// writing twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubmissionKey(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid submission key: {0:?}")]
pub struct InvalidSubmissionKey(pub String);

impl SubmissionKey {
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().simple().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl TryFrom<String> for SubmissionKey {
	type Error = InvalidSubmissionKey;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		let valid = !value.is_empty()
			&& value.len() <= MAX_SUBMISSION_KEY_LEN
			&& value
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
		if valid {
			Ok(Self(value))
		} else {
			Err(InvalidSubmissionKey(value))
		}
	}
}

impl FromStr for SubmissionKey {
	type Err = InvalidSubmissionKey;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::try_from(s.to_string())
	}
}

impl From<SubmissionKey> for String {
	fn from(key: SubmissionKey) -> Self {
		key.0
	}
}

impl fmt::Display for SubmissionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Error code for a write whose submission key was spent on another write
pub const SUBMISSION_KEY_REUSED: &str = "submission_key_reused";

/// Error body returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
	pub error: String,
	pub message: String,
}
