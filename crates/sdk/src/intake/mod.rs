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

//! Two-phase intake: check for counterparts, then commit
//!
//! A submission first asks the match finder for compatible counterparts.
//! With none, the record is created straight away. With some, the session
//! stops in [`IntakePhase::MatchList`] and nothing is written until the user
//! either settles against one candidate or chooses to create a new public
//! record instead.
//!
//! ```text
//! Form -> Checking -> MatchList -> Committing(id) -> Done
//!                  \           \-> Creating ------/
//!                   \-> Creating ----------------/
//! ```
//!
//! The routine is written once in [`IntakeSession`] and specialised by an
//! [`IntakeFlow`]: donations settle by fulfilling a request, requests settle
//! by accepting a donation.

mod flows;
mod session;

use std::future::Future;

use thiserror::Error;

pub use flows::{DonationFlow, FulfillTarget, RequestFlow};
pub use session::IntakeSession;

use crate::{
	client::ClientError,
	form::FormError,
	types::{RecordId, Settlement, SubmissionKey},
};

/// Entity-specific half of the intake routine
pub trait IntakeFlow: Send + Sync {
	/// Raw user input, kept verbatim across failed attempts
	type Form: Clone + Send + Sync;
	/// Validated payload sent to the store
	type Payload: Clone + Send + Sync;
	/// Counterpart record offered by the match finder
	type Candidate: Clone + Send + Sync;
	/// Record returned by a plain create
	type Created: Clone + Send + Sync;

	/// Entity name used in logs and notices
	fn kind(&self) -> &'static str;

	fn parse(&self, form: &Self::Form) -> Result<Self::Payload, FormError>;

	/// Counterpart already chosen before the form was opened
	///
	/// When set, the match search is skipped and submit settles directly.
	fn preselected_target(&self) -> Option<RecordId> {
		None
	}

	fn check_matches(
		&self,
		payload: &Self::Payload,
	) -> impl Future<Output = Result<Vec<Self::Candidate>, ClientError>> + Send;

	fn create(
		&self,
		payload: &Self::Payload,
		key: &SubmissionKey,
	) -> impl Future<Output = Result<Self::Created, ClientError>> + Send;

	fn settle(
		&self,
		target: RecordId,
		payload: &Self::Payload,
		key: &SubmissionKey,
	) -> impl Future<Output = Result<Settlement, ClientError>> + Send;

	/// Settlement on `target` among the viewer's own, if one exists
	fn find_settlement(
		&self,
		target: RecordId,
	) -> impl Future<Output = Result<Option<Settlement>, ClientError>> + Send;

	fn candidate_id(&self, candidate: &Self::Candidate) -> RecordId;

	/// Whether the viewer owns this candidate
	fn is_own(&self, candidate: &Self::Candidate) -> bool;
}

/// Where an intake session currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum IntakePhase<C, O> {
	Form,
	Checking,
	MatchList(Vec<C>),
	Creating,
	Committing(RecordId),
	Done(IntakeOutcome<O>),
}

impl<C, O> IntakePhase<C, O> {
	pub fn name(&self) -> &'static str {
		match self {
			IntakePhase::Form => "form",
			IntakePhase::Checking => "checking",
			IntakePhase::MatchList(_) => "match_list",
			IntakePhase::Creating => "creating",
			IntakePhase::Committing(_) => "committing",
			IntakePhase::Done(_) => "done",
		}
	}

	/// A store call is outstanding
	pub fn is_in_flight(&self) -> bool {
		matches!(
			self,
			IntakePhase::Checking | IntakePhase::Creating | IntakePhase::Committing(_)
		)
	}
}

/// Terminal result of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome<O> {
	/// A new public record was stored
	Created(O),
	/// An existing counterpart was settled, no new record was stored
	Settled(Settlement),
}

impl<O> IntakeOutcome<O> {
	pub fn settled_target(&self) -> Option<RecordId> {
		match self {
			IntakeOutcome::Created(_) => None,
			IntakeOutcome::Settled(settlement) => settlement.target_id(),
		}
	}
}

/// What a call to `submit` produced
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeStep<C, O> {
	/// Counterparts exist; waiting for the user to choose
	MatchesFound(Vec<C>),
	Completed(IntakeOutcome<O>),
}

#[derive(Debug, Error)]
pub enum IntakeError {
	#[error("Invalid form: {0}")]
	Form(#[from] FormError),
	#[error("A submission is already in flight")]
	InFlight,
	#[error("Not allowed while {0}")]
	WrongPhase(&'static str),
	#[error("Candidate {0} is not in the match list")]
	UnknownCandidate(RecordId),
	#[error("Match check failed: {0}")]
	Check(ClientError),
	#[error("Commit failed: {0}")]
	Commit(#[from] ClientError),
	#[error("Submission was dismissed")]
	Dismissed,
}

/// What to do when the match check itself fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckFailurePolicy {
	/// Treat the failure as "no matches" and create the record
	#[default]
	CreateAnyway,
	/// Return to the form and surface the error
	ReturnToForm,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeOptions {
	pub check_failure: CheckFailurePolicy,
}

/// User-visible event raised by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeNotice {
	NoMatches { kind: &'static str },
	CheckFailed { kind: &'static str, reason: String },
	MatchesFound(usize),
	Created { kind: &'static str },
	Settled { kind: &'static str, target: RecordId },
	/// The chosen counterpart was settled by someone else or removed
	CandidateGone(RecordId),
	CommitFailed(String),
}

impl IntakeNotice {
	/// The session is finished; the parent view should close and refresh
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			IntakeNotice::Created { .. } | IntakeNotice::Settled { .. }
		)
	}

	pub fn message(&self) -> String {
		match self {
			IntakeNotice::NoMatches { kind } => {
				format!("No immediate matches found. Creating your {}.", kind)
			}
			IntakeNotice::CheckFailed { kind, .. } => {
				format!("Error checking matches. Creating new {} anyway.", kind)
			}
			IntakeNotice::MatchesFound(n) => format!("Found {} potential match(es).", n),
			IntakeNotice::Created { kind } => format!("Your {} was published.", kind),
			IntakeNotice::Settled { kind: "donation", .. } => {
				"Request fulfilled! A new donation was not created.".to_string()
			}
			IntakeNotice::Settled { .. } => {
				"Donation accepted! A new request was not created.".to_string()
			}
			IntakeNotice::CandidateGone(_) => {
				"That match is no longer available. Please choose another.".to_string()
			}
			IntakeNotice::CommitFailed(reason) => reason.clone(),
		}
	}
}

/// Toast / refresh seam for intake sessions
pub trait IntakeObserver: Send + Sync {
	fn notify(&self, notice: &IntakeNotice);
}

/// Observer that discards every notice
pub struct NoopObserver;

impl IntakeObserver for NoopObserver {
	fn notify(&self, _notice: &IntakeNotice) {}
}
