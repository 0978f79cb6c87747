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

//! Settlement rules for the Graft ledger
//!
//! This crate decides whether a create, fulfill or accept may happen and
//! what it writes. It performs no I/O: the ledger engine calls it while
//! holding exclusive access to its state and persists the result.

pub mod handler;
pub mod transaction;
pub mod validator;

pub use handler::{
	Caller, LedgerView, RecordKind, SettlementError, accept_donation, create_donation,
	create_request, fulfill_request,
};
pub use transaction::{SettlementTransaction, donation_party, request_party};
pub use validator::ValidationError;
