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

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::{
	CheckFailurePolicy, IntakeError, IntakeFlow, IntakeNotice, IntakeObserver, IntakeOptions,
	IntakeOutcome, IntakePhase, IntakeStep, NoopObserver,
};
use crate::{
	client::ClientError,
	types::{RecordId, SubmissionKey},
};

type Phase<F> = IntakePhase<<F as IntakeFlow>::Candidate, <F as IntakeFlow>::Created>;
type Step<F> = IntakeStep<<F as IntakeFlow>::Candidate, <F as IntakeFlow>::Created>;
type Outcome<F> = IntakeOutcome<<F as IntakeFlow>::Created>;

struct SessionState<F: IntakeFlow> {
	phase: Phase<F>,
	form: F::Form,
	/// Payload parsed by the last successful submit
	payload: Option<F::Payload>,
	/// Candidates restored when a commit from the match list fails
	candidates: Vec<F::Candidate>,
	dismissed: bool,
	last_error: Option<String>,
	/// The preselected target was settled or removed by someone else
	target_gone: bool,
	/// Settle whose reply was lost; it may have been applied
	unconfirmed_target: Option<RecordId>,
}

/// One intake submission, from form to terminal write
///
/// All transitions happen under a short-lived lock that is never held across
/// a store call, so a second `submit` during a call sees the in-flight phase
/// and is refused without touching the network. Every write of the session
/// carries the same [`SubmissionKey`], so a retried write cannot be applied
/// twice by the store.
pub struct IntakeSession<F: IntakeFlow> {
	flow: F,
	options: IntakeOptions,
	observer: Arc<dyn IntakeObserver>,
	key: SubmissionKey,
	state: Mutex<SessionState<F>>,
}

impl<F: IntakeFlow> IntakeSession<F> {
	pub fn new(flow: F, form: F::Form) -> Self {
		Self {
			flow,
			options: IntakeOptions::default(),
			observer: Arc::new(NoopObserver),
			key: SubmissionKey::generate(),
			state: Mutex::new(SessionState {
				phase: IntakePhase::Form,
				form,
				payload: None,
				candidates: Vec::new(),
				dismissed: false,
				last_error: None,
				target_gone: false,
				unconfirmed_target: None,
			}),
		}
	}

	pub fn with_options(mut self, options: IntakeOptions) -> Self {
		self.options = options;
		self
	}

	pub fn with_observer(mut self, observer: Arc<dyn IntakeObserver>) -> Self {
		self.observer = observer;
		self
	}

	fn lock(&self) -> MutexGuard<'_, SessionState<F>> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn notify(&self, notice: Option<IntakeNotice>) {
		if let Some(notice) = notice {
			self.observer.notify(&notice);
		}
	}

	pub fn flow(&self) -> &F {
		&self.flow
	}

	pub fn submission_key(&self) -> &SubmissionKey {
		&self.key
	}

	pub fn phase(&self) -> Phase<F> {
		self.lock().phase.clone()
	}

	pub fn form(&self) -> F::Form {
		self.lock().form.clone()
	}

	pub fn last_error(&self) -> Option<String> {
		self.lock().last_error.clone()
	}

	pub fn is_dismissed(&self) -> bool {
		self.lock().dismissed
	}

	/// Edit the form; only possible while the form is showing
	pub fn update_form(&self, edit: impl FnOnce(&mut F::Form)) -> Result<(), IntakeError> {
		let mut state = self.lock();
		match &state.phase {
			IntakePhase::Form => {}
			phase if phase.is_in_flight() => return Err(IntakeError::InFlight),
			phase => return Err(IntakeError::WrongPhase(phase.name())),
		}
		edit(&mut state.form);
		Ok(())
	}

	/// Submit the form
	///
	/// Resubmitting a finished session returns its outcome without writing.
	pub async fn submit(&self) -> Result<Step<F>, IntakeError> {
		let (payload, preselected) = {
			let mut state = self.lock();
			match &state.phase {
				IntakePhase::Form => {}
				IntakePhase::Done(outcome) => return Ok(IntakeStep::Completed(outcome.clone())),
				phase if phase.is_in_flight() => return Err(IntakeError::InFlight),
				phase => return Err(IntakeError::WrongPhase(phase.name())),
			}

			let payload = match self.flow.parse(&state.form) {
				Ok(payload) => payload,
				Err(e) => {
					state.last_error = Some(e.to_string());
					return Err(e.into());
				}
			};
			state.payload = Some(payload.clone());
			state.candidates.clear();
			state.last_error = None;
			state.dismissed = false;

			let preselected = self
				.flow
				.preselected_target()
				.filter(|_| !state.target_gone);
			state.phase = match preselected {
				Some(target) => IntakePhase::Committing(target),
				None => IntakePhase::Checking,
			};
			(payload, preselected)
		};

		if let Some(target) = preselected {
			debug!(target: "intake", kind = self.flow.kind(), target_id = target, "Settling preselected target");
			return self
				.commit_settle(target, payload, false)
				.await
				.map(IntakeStep::Completed);
		}

		let checked = self.flow.check_matches(&payload).await;

		let (step, notice) = {
			let mut state = self.lock();
			if state.dismissed {
				state.phase = IntakePhase::Form;
				return Err(IntakeError::Dismissed);
			}

			match checked {
				Ok(candidates) => {
					let candidates: Vec<_> = candidates
						.into_iter()
						.filter(|c| !self.flow.is_own(c))
						.collect();
					if candidates.is_empty() {
						state.phase = IntakePhase::Creating;
						(None, IntakeNotice::NoMatches {
							kind: self.flow.kind(),
						})
					} else {
						info!(
							target: "intake",
							kind = self.flow.kind(),
							matches = candidates.len(),
							"Matches found, awaiting choice"
						);
						state.candidates = candidates.clone();
						state.phase = IntakePhase::MatchList(candidates.clone());
						let found = candidates.len();
						(Some(IntakeStep::MatchesFound(candidates)), IntakeNotice::MatchesFound(found))
					}
				}
				Err(e) => {
					warn!(target: "intake", kind = self.flow.kind(), error = %e, "Match check failed");
					let notice = IntakeNotice::CheckFailed {
						kind: self.flow.kind(),
						reason: e.to_string(),
					};
					match self.options.check_failure {
						CheckFailurePolicy::CreateAnyway => {
							state.phase = IntakePhase::Creating;
							(None, notice)
						}
						CheckFailurePolicy::ReturnToForm => {
							state.phase = IntakePhase::Form;
							state.last_error = Some(e.to_string());
							drop(state);
							self.notify(Some(notice));
							return Err(IntakeError::Check(e));
						}
					}
				}
			}
		};

		self.notify(Some(notice));
		match step {
			Some(step) => Ok(step),
			None => self
				.commit_create(payload, false)
				.await
				.map(IntakeStep::Completed),
		}
	}

	/// Settle against one of the offered candidates
	pub async fn choose(&self, candidate_id: RecordId) -> Result<Outcome<F>, IntakeError> {
		let payload = {
			let mut state = self.lock();
			let listed = match &state.phase {
				IntakePhase::MatchList(candidates) => candidates
					.iter()
					.any(|c| self.flow.candidate_id(c) == candidate_id),
				phase if phase.is_in_flight() => return Err(IntakeError::InFlight),
				phase => return Err(IntakeError::WrongPhase(phase.name())),
			};
			if !listed {
				return Err(IntakeError::UnknownCandidate(candidate_id));
			}
			let payload = state
				.payload
				.clone()
				.ok_or(IntakeError::WrongPhase("form"))?;
			state.phase = IntakePhase::Committing(candidate_id);
			state.last_error = None;
			payload
		};

		self.commit_settle(candidate_id, payload, true).await
	}

	/// Decline every candidate and publish a new record
	pub async fn create_instead(&self) -> Result<Outcome<F>, IntakeError> {
		let payload = {
			let mut state = self.lock();
			match &state.phase {
				IntakePhase::MatchList(_) => {}
				phase if phase.is_in_flight() => return Err(IntakeError::InFlight),
				phase => return Err(IntakeError::WrongPhase(phase.name())),
			}
			let payload = state
				.payload
				.clone()
				.ok_or(IntakeError::WrongPhase("form"))?;
			state.phase = IntakePhase::Creating;
			state.last_error = None;
			payload
		};

		self.commit_create(payload, true).await
	}

	/// Close the match list or the whole view
	///
	/// From the match list this returns to the form with no server effect.
	/// While a call is outstanding the call is not withdrawn: its result is
	/// still recorded but no further notices are raised.
	pub fn dismiss(&self) {
		let mut state = self.lock();
		match &state.phase {
			IntakePhase::MatchList(_) => {
				state.phase = IntakePhase::Form;
				state.candidates.clear();
			}
			IntakePhase::Done(_) => {}
			_ => state.dismissed = true,
		}
	}

	async fn commit_create(
		&self,
		payload: F::Payload,
		from_list: bool,
	) -> Result<Outcome<F>, IntakeError> {
		let result = match self.flow.create(&payload, &self.key).await {
			Ok(created) => Ok(IntakeOutcome::Created(created)),
			Err(e) => self.reconcile(e).await,
		};
		self.finish(None, from_list, result)
	}

	async fn commit_settle(
		&self,
		target: RecordId,
		payload: F::Payload,
		from_list: bool,
	) -> Result<Outcome<F>, IntakeError> {
		let result = match self.flow.settle(target, &payload, &self.key).await {
			Ok(settlement) => Ok(IntakeOutcome::Settled(settlement)),
			Err(e) => self.reconcile(e).await,
		};
		self.finish(Some(target), from_list, result)
	}

	/// Resolve a write refused for key reuse
	///
	/// The session key was already spent by a settle whose reply never
	/// arrived, so that settle was applied. Its settlement is looked up and
	/// becomes the session outcome.
	async fn reconcile(&self, error: ClientError) -> Result<Outcome<F>, ClientError> {
		let unconfirmed = self.lock().unconfirmed_target;
		let target = match unconfirmed {
			Some(target) if matches!(error, ClientError::KeyReused(_)) => target,
			_ => return Err(error),
		};

		match self.flow.find_settlement(target).await {
			Ok(Some(settlement)) => {
				info!(
					target: "intake",
					kind = self.flow.kind(),
					target_id = target,
					"Earlier settle was applied after all"
				);
				Ok(IntakeOutcome::Settled(settlement))
			}
			Ok(None) => Err(error),
			Err(lookup) => {
				warn!(target: "intake", kind = self.flow.kind(), error = %lookup, "Settlement lookup failed");
				Err(error)
			}
		}
	}

	fn finish(
		&self,
		target: Option<RecordId>,
		from_list: bool,
		result: Result<Outcome<F>, ClientError>,
	) -> Result<Outcome<F>, IntakeError> {
		let mut state = self.lock();
		let silent = state.dismissed;
		let (result, notice) = match result {
			Ok(outcome) => {
				let notice = match &outcome {
					IntakeOutcome::Created(_) => {
						info!(target: "intake", kind = self.flow.kind(), "Record created");
						IntakeNotice::Created {
							kind: self.flow.kind(),
						}
					}
					IntakeOutcome::Settled(settlement) => {
						let target = settlement.target_id().or(target).unwrap_or_default();
						info!(
							target: "intake",
							kind = self.flow.kind(),
							target_id = target,
							settlement_id = %settlement.id,
							"Settled against existing record"
						);
						IntakeNotice::Settled {
							kind: self.flow.kind(),
							target,
						}
					}
				};
				state.unconfirmed_target = None;
				state.phase = IntakePhase::Done(outcome.clone());
				(Ok(outcome), notice)
			}
			Err(e) => {
				warn!(target: "intake", kind = self.flow.kind(), target_id = ?target, error = %e, "Commit failed");
				state.last_error = Some(e.to_string());
				let notice = match target {
					Some(target) if e.is_stale_target() => {
						state
							.candidates
							.retain(|c| self.flow.candidate_id(c) != target);
						if !from_list {
							state.target_gone = true;
						}
						IntakeNotice::CandidateGone(target)
					}
					Some(target) if e.is_retryable() => {
						state.unconfirmed_target = Some(target);
						IntakeNotice::CommitFailed(e.to_string())
					}
					_ => IntakeNotice::CommitFailed(e.to_string()),
				};
				state.phase = Self::fallback_phase(&state, from_list);
				(Err(IntakeError::Commit(e)), notice)
			}
		};
		drop(state);

		self.notify((!silent).then_some(notice));
		result
	}

	fn fallback_phase(state: &SessionState<F>, from_list: bool) -> Phase<F> {
		if from_list && !state.dismissed && !state.candidates.is_empty() {
			IntakePhase::MatchList(state.candidates.clone())
		} else {
			IntakePhase::Form
		}
	}
}
