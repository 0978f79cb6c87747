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

//! Graft SDK - shared types and client library for the donation ledger
//!
//! This crate provides the wire types shared by every Graft service, a typed
//! HTTP client for the record store API, form parsing, and the two-phase
//! intake coordinator used by donation and request forms.
//!
//! The SDK is designed to be lightweight and embeddable:
//! - No background threads
//! - No runtime initialization
//! - No environment or configuration loading

pub mod api;
pub mod client;
pub mod form;
pub mod intake;
pub mod types;

pub use api::LedgerApi;
pub use client::{Client, ClientError};
pub use form::{DonationForm, FormError, RequestForm};
pub use intake::{
	CheckFailurePolicy, DonationFlow, FulfillTarget, IntakeError, IntakeFlow, IntakeNotice,
	IntakeObserver, IntakeOptions, IntakeOutcome, IntakePhase, IntakeSession, IntakeStep,
	RequestFlow,
};
pub use types::*;
