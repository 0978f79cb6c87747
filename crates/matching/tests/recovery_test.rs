//! Recovery tests: a restarted ledger must answer exactly as before

use std::path::PathBuf;

use chrono::NaiveDate;
use graft_matching::{
	EngineConfig, EngineError, EventStorage, FileEventStorage, LedgerEngine, LedgerEvent,
	MatchingConfig, MemoryEventStorage, MemorySubmissionJournal, RecoveryCoordinator,
	RecoveryError,
};
use graft_sdk::types::{
	BloodGroup, DonationFields, DonationFilter, DonationStatus, RequestFields, RequestFilter,
	SubmissionKey, UserProfile,
};
use graft_settlement::{Caller, SettlementError};

fn caller(user_id: &str) -> Caller {
	Caller::new(
		user_id,
		UserProfile {
			full_name: format!("{} full name", user_id),
			email: format!("{}@example.org", user_id),
			phone: "555-0100".to_string(),
			city: "Pune".to_string(),
			blood_group: None,
		},
	)
}

fn donation_fields() -> DonationFields {
	DonationFields {
		donor_name: "Ravi".to_string(),
		age: 29,
		blood_group: BloodGroup::ANegative,
		organ: "Liver".to_string(),
		contact: "555-0101".to_string(),
		city: "Pune".to_string(),
		availability_date: NaiveDate::from_ymd_opt(2027, 1, 10).unwrap(),
	}
}

fn request_fields() -> RequestFields {
	RequestFields {
		requester_name: "Meera".to_string(),
		age: 47,
		blood_group: BloodGroup::AbPositive,
		organ_needed: "Liver".to_string(),
		contact: "555-0102".to_string(),
		city: "Pune".to_string(),
	}
}

fn temp_ledger_path() -> PathBuf {
	std::env::temp_dir()
		.join(format!("graft-recovery-{}", uuid::Uuid::new_v4()))
		.join("ledger.jsonl")
}

fn recover_from(storage: Box<dyn EventStorage>) -> graft_matching::Ledger {
	let coordinator = RecoveryCoordinator::new(storage, Box::new(MemorySubmissionJournal::new()));
	coordinator.recover().unwrap().0
}

#[tokio::test]
async fn test_file_ledger_survives_restart() {
	let path = temp_ledger_path();
	let config = MatchingConfig {
		ledger_path: Some(path.clone()),
		..MatchingConfig::default()
	};
	let accept_key = SubmissionKey::generate();

	// First run: one settled donation, one open request
	let (donation_id, settlement_id) = {
		let ledger = recover_from(config.open_storage().unwrap());
		let (engine, handle) = LedgerEngine::spawn(EngineConfig::from(&config), ledger).unwrap();

		let donation = handle
			.create_donation(caller("donor"), donation_fields(), None)
			.await
			.unwrap();
		handle
			.create_request(caller("other"), request_fields(), None)
			.await
			.unwrap();
		let (_, settlement) = handle
			.accept_donation(caller("recipient"), donation.id, Some(accept_key.clone()))
			.await
			.unwrap();

		engine.shutdown();
		(donation.id, settlement.id)
	};

	// Second run over the same file
	let storage = config.open_storage().unwrap();
	assert_eq!(storage.last_sequence(), 3);
	let coordinator =
		RecoveryCoordinator::new(storage, Box::new(MemorySubmissionJournal::new()));
	let (ledger, last_seq) = coordinator.recover().unwrap();
	assert_eq!(last_seq, Some(3));

	let state = ledger.state();
	assert_eq!(state.next_sequence(), 4);
	assert_eq!(state.next_donation_id(), donation_id + 1);
	assert!(state.settlement(&settlement_id).is_some());

	let (_engine, handle) = LedgerEngine::spawn(EngineConfig::from(&config), ledger).unwrap();

	assert!(handle.list_donations(DonationFilter::default()).await.unwrap().is_empty());
	assert_eq!(handle.list_requests(RequestFilter::default()).await.unwrap().len(), 1);

	// The journal was rebuilt: a resent accept replays instead of conflicting
	let (donation, settlement) = handle
		.accept_donation(caller("recipient"), donation_id, Some(accept_key))
		.await
		.unwrap();
	assert_eq!(donation.status, DonationStatus::Accepted);
	assert_eq!(settlement.id, settlement_id);

	// A different user still gets a conflict
	let late = handle
		.accept_donation(caller("late"), donation_id, None)
		.await;
	assert!(matches!(
		late,
		Err(EngineError::Settlement(SettlementError::Conflict { .. }))
	));

	// New writes continue the sequence
	let next = handle
		.create_donation(caller("donor"), donation_fields(), None)
		.await
		.unwrap();
	assert_eq!(next.id, donation_id + 1);

	std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn test_clean_start_reports_no_sequence() {
	let coordinator = RecoveryCoordinator::new(
		Box::new(MemoryEventStorage::new()),
		Box::new(MemorySubmissionJournal::new()),
	);
	let (ledger, last_seq) = coordinator.recover().unwrap();
	assert!(last_seq.is_none());
	assert_eq!(ledger.state().next_sequence(), 1);
}

#[test]
fn test_replay_rejects_dangling_settlement() {
	let storage = MemoryEventStorage::new();
	let mut writer = storage.clone();

	let mut ledger = recover_from(Box::new(storage.clone()));
	let donation = ledger
		.create_donation(&caller("donor"), &donation_fields(), None)
		.unwrap();
	let (_, settlement) = ledger
		.accept_donation(&caller("recipient"), donation.id, None)
		.unwrap();

	// A settlement for a donation the log never created
	writer
		.append(&LedgerEvent::DonationAccepted {
			seq: 3,
			donation_id: 99,
			settlement,
			submission: None,
		})
		.unwrap();

	let coordinator =
		RecoveryCoordinator::new(Box::new(storage), Box::new(MemorySubmissionJournal::new()));
	assert!(matches!(coordinator.recover(), Err(RecoveryError::Apply(_))));
}

#[test]
fn test_corrupted_log_fails_to_open() {
	let path = temp_ledger_path();
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	std::fs::write(&path, "{\"type\":\"donation_created\"}\n").unwrap();

	assert!(FileEventStorage::open(&path).is_err());

	std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[tokio::test]
async fn test_interrupted_append_does_not_block_restart() {
	let path = temp_ledger_path();
	let config = MatchingConfig {
		ledger_path: Some(path.clone()),
		..MatchingConfig::default()
	};

	{
		let ledger = recover_from(config.open_storage().unwrap());
		let (engine, handle) = LedgerEngine::spawn(EngineConfig::from(&config), ledger).unwrap();
		handle
			.create_donation(caller("donor"), donation_fields(), None)
			.await
			.unwrap();
		handle
			.create_request(caller("other"), request_fields(), None)
			.await
			.unwrap();
		engine.shutdown();
	}

	// Crash in the middle of writing a third event
	{
		use std::io::Write;
		let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
		file.write_all(b"{\"type\":\"request_created\",\"seq\":3,\"requ").unwrap();
	}

	let storage = config.open_storage().unwrap();
	assert_eq!(storage.last_sequence(), 2);
	let ledger = recover_from(storage);
	let (_engine, handle) = LedgerEngine::spawn(EngineConfig::from(&config), ledger).unwrap();

	assert_eq!(handle.list_donations(DonationFilter::default()).await.unwrap().len(), 1);
	handle
		.create_request(caller("third"), request_fields(), None)
		.await
		.unwrap();
	assert_eq!(handle.list_requests(RequestFilter::default()).await.unwrap().len(), 2);

	std::fs::remove_dir_all(path.parent().unwrap()).ok();
}
