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

//! Raw form input and its conversion into typed payloads
//!
//! Forms hold exactly what the user typed. Parsing happens on submit so the
//! entered text survives a failed attempt untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BloodGroup, DonationFields, Request, RequestFields, UserProfile};

/// Accepted date format for `availability_date`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
	#[error("Field is required: {0}")]
	Missing(&'static str),
	#[error("Age must be a positive whole number, got {0:?}")]
	InvalidAge(String),
	#[error("Unknown blood group: {0:?}")]
	InvalidBloodGroup(String),
	#[error("Invalid date {0:?}, expected YYYY-MM-DD")]
	InvalidDate(String),
	#[error("Field {field} is locked to {expected:?}")]
	Locked {
		field: &'static str,
		expected: String,
	},
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationForm {
	pub donor_name: String,
	pub age: String,
	pub blood_group: String,
	pub organ: String,
	pub contact: String,
	pub city: String,
	pub availability_date: String,
}

impl DonationForm {
	/// Pre-fill a donation form for fulfilling `request`
	///
	/// The organ comes from the request; personal details come from the
	/// signed-in donor's profile.
	pub fn prefill_for(request: &Request, profile: &UserProfile) -> Self {
		Self {
			donor_name: profile.full_name.clone(),
			age: String::new(),
			blood_group: profile
				.blood_group
				.map(|g| g.to_string())
				.unwrap_or_default(),
			organ: request.organ_needed.clone(),
			contact: profile.phone.clone(),
			city: profile.city.clone(),
			availability_date: String::new(),
		}
	}

	pub fn parse(&self) -> Result<DonationFields, FormError> {
		Ok(DonationFields {
			donor_name: required("donor_name", &self.donor_name)?,
			age: parse_age(&self.age)?,
			blood_group: parse_blood_group(&self.blood_group)?,
			organ: required("organ", &self.organ)?,
			contact: required("contact", &self.contact)?,
			city: required("city", &self.city)?,
			availability_date: parse_date(&self.availability_date)?,
		})
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestForm {
	pub requester_name: String,
	pub age: String,
	pub blood_group: String,
	pub organ_needed: String,
	pub contact: String,
	pub city: String,
}

impl RequestForm {
	pub fn from_profile(profile: &UserProfile) -> Self {
		Self {
			requester_name: profile.full_name.clone(),
			blood_group: profile
				.blood_group
				.map(|g| g.to_string())
				.unwrap_or_default(),
			contact: profile.phone.clone(),
			city: profile.city.clone(),
			..Self::default()
		}
	}

	pub fn parse(&self) -> Result<RequestFields, FormError> {
		Ok(RequestFields {
			requester_name: required("requester_name", &self.requester_name)?,
			age: parse_age(&self.age)?,
			blood_group: parse_blood_group(&self.blood_group)?,
			organ_needed: required("organ_needed", &self.organ_needed)?,
			contact: required("contact", &self.contact)?,
			city: required("city", &self.city)?,
		})
	}
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err(FormError::Missing(field));
	}
	Ok(trimmed.to_string())
}

fn parse_age(value: &str) -> Result<u32, FormError> {
	let trimmed = required("age", value)?;
	match trimmed.parse::<u32>() {
		Ok(age) if age > 0 => Ok(age),
		_ => Err(FormError::InvalidAge(trimmed)),
	}
}

fn parse_blood_group(value: &str) -> Result<BloodGroup, FormError> {
	let trimmed = required("blood_group", value)?;
	trimmed
		.parse()
		.map_err(|_| FormError::InvalidBloodGroup(trimmed))
}

fn parse_date(value: &str) -> Result<NaiveDate, FormError> {
	let trimmed = required("availability_date", value)?;
	NaiveDate::parse_from_str(&trimmed, DATE_FORMAT).map_err(|_| FormError::InvalidDate(trimmed))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::RequestStatus;
	use chrono::Utc;

	fn filled_donation() -> DonationForm {
		DonationForm {
			donor_name: " Asha Rao ".to_string(),
			age: "34".to_string(),
			blood_group: "o+".to_string(),
			organ: "Kidney".to_string(),
			contact: "555-0101".to_string(),
			city: "Pune".to_string(),
			availability_date: "2026-11-02".to_string(),
		}
	}

	#[test]
	fn test_parse_trims_and_types_fields() {
		let fields = filled_donation().parse().unwrap();
		assert_eq!(fields.donor_name, "Asha Rao");
		assert_eq!(fields.age, 34);
		assert_eq!(fields.blood_group, BloodGroup::OPositive);
		assert_eq!(
			fields.availability_date,
			NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
		);
	}

	#[test]
	fn test_missing_field_is_reported_by_name() {
		let mut form = filled_donation();
		form.city = "   ".to_string();
		assert_eq!(form.parse(), Err(FormError::Missing("city")));
	}

	#[test]
	fn test_age_must_be_positive_integer() {
		for bad in ["0", "-3", "thirty", "12.5"] {
			let mut form = filled_donation();
			form.age = bad.to_string();
			assert!(matches!(form.parse(), Err(FormError::InvalidAge(_))), "{bad}");
		}
	}

	#[test]
	fn test_invalid_date_rejected() {
		let mut form = filled_donation();
		form.availability_date = "2026-02-30".to_string();
		assert!(matches!(form.parse(), Err(FormError::InvalidDate(_))));
	}

	#[test]
	fn test_prefill_for_request_takes_organ_and_profile() {
		let request = Request {
			id: 9,
			requester_name: "Ravi".to_string(),
			age: 50,
			blood_group: BloodGroup::APositive,
			organ_needed: "Liver".to_string(),
			contact: "555-0199".to_string(),
			city: "Pune".to_string(),
			status: RequestStatus::Pending,
			owner_user_id: "recipient".to_string(),
			created_at: Utc::now(),
			settlement_id: None,
		};
		let profile = UserProfile {
			full_name: "Meera".to_string(),
			email: "meera@example.com".to_string(),
			phone: "555-0142".to_string(),
			city: "Mumbai".to_string(),
			blood_group: Some(BloodGroup::ONegative),
		};

		let form = DonationForm::prefill_for(&request, &profile);
		assert_eq!(form.organ, "Liver");
		assert_eq!(form.donor_name, "Meera");
		assert_eq!(form.blood_group, "O-");
		assert_eq!(form.city, "Mumbai");
		assert!(form.age.is_empty());
	}

	#[test]
	fn test_request_form_parse() {
		let form = RequestForm {
			requester_name: "Ravi".to_string(),
			age: "50".to_string(),
			blood_group: "AB-".to_string(),
			organ_needed: "Heart".to_string(),
			contact: "555".to_string(),
			city: "Delhi".to_string(),
		};
		let fields = form.parse().unwrap();
		assert_eq!(fields.blood_group, BloodGroup::AbNegative);
		assert_eq!(fields.organ_needed, "Heart");
	}
}
