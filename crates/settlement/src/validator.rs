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

use graft_sdk::types::{DonationFields, RequestFields, UserProfile};
use thiserror::Error;

/// Longest accepted free-text field
pub const MAX_TEXT_LEN: usize = 120;

/// Longest accepted contact field
pub const MAX_CONTACT_LEN: usize = 32;

/// Oldest accepted age
pub const MAX_AGE: u32 = 120;

/// Error types for record validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("Field is required: {0}")]
	MissingField(&'static str),
	#[error("Field {field} exceeds {max} characters")]
	TooLong { field: &'static str, max: usize },
	#[error("Age must be between 1 and 120, got {0}")]
	AgeOutOfRange(u32),
	#[error("Organ mismatch: request needs {expected}, donation offers {actual}")]
	OrganMismatch { expected: String, actual: String },
	#[error("Submission key already used for a different operation")]
	SubmissionKeyReused,
}

fn text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err(ValidationError::MissingField(field));
	}
	if trimmed.chars().count() > max {
		return Err(ValidationError::TooLong { field, max });
	}
	Ok(())
}

fn age(value: u32) -> Result<(), ValidationError> {
	if value == 0 || value > MAX_AGE {
		return Err(ValidationError::AgeOutOfRange(value));
	}
	Ok(())
}

/// Validate a donation payload before it is stored or used to fulfill
pub fn validate_donation(fields: &DonationFields) -> Result<(), ValidationError> {
	text("donor_name", &fields.donor_name, MAX_TEXT_LEN)?;
	age(fields.age)?;
	text("organ", &fields.organ, MAX_TEXT_LEN)?;
	text("contact", &fields.contact, MAX_CONTACT_LEN)?;
	text("city", &fields.city, MAX_TEXT_LEN)?;
	Ok(())
}

/// Validate a request payload before it is stored or matched
pub fn validate_request(fields: &RequestFields) -> Result<(), ValidationError> {
	text("requester_name", &fields.requester_name, MAX_TEXT_LEN)?;
	age(fields.age)?;
	text("organ_needed", &fields.organ_needed, MAX_TEXT_LEN)?;
	text("contact", &fields.contact, MAX_CONTACT_LEN)?;
	text("city", &fields.city, MAX_TEXT_LEN)?;
	Ok(())
}

/// The accepting side's contact details come from its profile
pub fn validate_contact_profile(profile: &UserProfile) -> Result<(), ValidationError> {
	text("full_name", &profile.full_name, MAX_TEXT_LEN)?;
	text("phone", &profile.phone, MAX_CONTACT_LEN)?;
	text("city", &profile.city, MAX_TEXT_LEN)?;
	Ok(())
}

/// A fulfilling donation must offer the organ the request needs
pub fn validate_organ_match(needed: &str, offered: &str) -> Result<(), ValidationError> {
	if !needed.trim().eq_ignore_ascii_case(offered.trim()) {
		return Err(ValidationError::OrganMismatch {
			expected: needed.to_string(),
			actual: offered.to_string(),
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use graft_sdk::types::BloodGroup;

	fn donation() -> DonationFields {
		DonationFields {
			donor_name: "Asha".to_string(),
			age: 30,
			blood_group: BloodGroup::OPositive,
			organ: "Kidney".to_string(),
			contact: "555-0101".to_string(),
			city: "Pune".to_string(),
			availability_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
		}
	}

	#[test]
	fn test_valid_donation() {
		assert!(validate_donation(&donation()).is_ok());
	}

	#[test]
	fn test_blank_field_rejected() {
		let mut fields = donation();
		fields.organ = "  ".to_string();
		assert_eq!(
			validate_donation(&fields),
			Err(ValidationError::MissingField("organ"))
		);
	}

	#[test]
	fn test_age_bounds() {
		let mut fields = donation();
		fields.age = 0;
		assert!(matches!(
			validate_donation(&fields),
			Err(ValidationError::AgeOutOfRange(0))
		));
		fields.age = MAX_AGE + 1;
		assert!(validate_donation(&fields).is_err());
	}

	#[test]
	fn test_contact_length() {
		let mut fields = donation();
		fields.contact = "9".repeat(MAX_CONTACT_LEN + 1);
		assert!(matches!(
			validate_donation(&fields),
			Err(ValidationError::TooLong { field: "contact", .. })
		));
	}

	#[test]
	fn test_organ_match_ignores_case() {
		assert!(validate_organ_match("Kidney", " kidney").is_ok());
		assert!(validate_organ_match("Kidney", "Liver").is_err());
	}

	#[test]
	fn test_request_validation() {
		let fields = RequestFields {
			requester_name: "Ravi".to_string(),
			age: 45,
			blood_group: BloodGroup::ANegative,
			organ_needed: String::new(),
			contact: "555".to_string(),
			city: "Delhi".to_string(),
		};
		assert_eq!(
			validate_request(&fields),
			Err(ValidationError::MissingField("organ_needed"))
		);
	}
}
