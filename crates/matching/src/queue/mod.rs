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

use std::time::Duration;

use crossbeam::channel::{
	Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded,
};

use crate::engine::LedgerCommand;

/// Bounded ingress queue in front of the ledger loop
///
/// Many request handlers enqueue, one loop dequeues. A full queue is
/// reported to the caller instead of blocking it.
pub struct IngressQueue {
	sender: Sender<LedgerCommand>,
	receiver: Receiver<LedgerCommand>,
}

impl IngressQueue {
	/// Create a new ingress queue with the specified capacity
	///
	/// Capacity bounds how many commands may wait for the loop before
	/// callers are told the ledger is overloaded.
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Split the queue into sender and receiver ends
	///
	/// The sender can be cloned for every handler.
	/// The receiver must remain unique for the single ledger loop.
	pub fn split(self) -> (QueueSender, QueueReceiver) {
		(
			QueueSender {
				sender: self.sender,
			},
			QueueReceiver {
				receiver: self.receiver,
			},
		)
	}
}

#[derive(Clone)]
pub struct QueueSender {
	sender: Sender<LedgerCommand>,
}

impl QueueSender {
	/// Try to enqueue a command (non-blocking)
	///
	/// Returns error if the queue is full, indicating that the
	/// ledger loop is overloaded.
	pub fn try_enqueue(&self, cmd: LedgerCommand) -> Result<(), QueueError> {
		self.sender.try_send(cmd).map_err(|e| match e {
			TrySendError::Full(_) => QueueError::Full,
			TrySendError::Disconnected(_) => QueueError::Disconnected,
		})
	}

	pub fn is_full(&self) -> bool {
		self.sender.is_full()
	}
}

pub struct QueueReceiver {
	receiver: Receiver<LedgerCommand>,
}

impl QueueReceiver {
	/// Receive a command (blocking)
	pub fn recv(&self) -> Result<LedgerCommand, QueueError> {
		self.receiver.recv().map_err(|_| QueueError::Disconnected)
	}

	/// Receive a command, giving up after `timeout`
	///
	/// Lets the loop wake periodically to observe its shutdown flag.
	pub fn recv_timeout(&self, timeout: Duration) -> Result<LedgerCommand, QueueError> {
		self.receiver.recv_timeout(timeout).map_err(|e| match e {
			RecvTimeoutError::Timeout => QueueError::Empty,
			RecvTimeoutError::Disconnected => QueueError::Disconnected,
		})
	}

	/// Try to receive a command (non-blocking)
	pub fn try_recv(&self) -> Result<LedgerCommand, QueueError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => QueueError::Empty,
			TryRecvError::Disconnected => QueueError::Disconnected,
		})
	}
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
	#[error("Queue is full")]
	Full,
	#[error("Queue is empty")]
	Empty,
	#[error("Queue disconnected")]
	Disconnected,
}

#[cfg(test)]
mod tests {
	use graft_sdk::types::{DonationFilter, RequestFilter};
	use tokio::sync::oneshot;

	use super::*;

	fn list_command() -> LedgerCommand {
		let (respond_to, _rx) = oneshot::channel();
		LedgerCommand::ListDonations {
			filter: DonationFilter::default(),
			respond_to,
		}
	}

	#[test]
	fn test_enqueue_and_recv() {
		let queue = IngressQueue::new(10);
		let (sender, receiver) = queue.split();

		sender.try_enqueue(list_command()).unwrap();

		let received = receiver.recv().unwrap();
		assert_eq!(received.name(), "list_donations");
	}

	#[test]
	fn test_queue_full() {
		let queue = IngressQueue::new(2);
		let (sender, _receiver) = queue.split();

		sender.try_enqueue(list_command()).unwrap();
		sender.try_enqueue(list_command()).unwrap();
		assert!(sender.is_full());

		let result = sender.try_enqueue(list_command());
		assert!(matches!(result, Err(QueueError::Full)));
	}

	#[test]
	fn test_multiple_senders_preserve_order() {
		let queue = IngressQueue::new(10);
		let (sender, receiver) = queue.split();

		let sender1 = sender.clone();
		let sender2 = sender.clone();

		sender1.try_enqueue(list_command()).unwrap();
		let (respond_to, _rx) = oneshot::channel();
		sender2
			.try_enqueue(LedgerCommand::ListRequests {
				filter: RequestFilter::default(),
				respond_to,
			})
			.unwrap();

		assert_eq!(receiver.recv().unwrap().name(), "list_donations");
		assert_eq!(receiver.recv().unwrap().name(), "list_requests");
	}

	#[test]
	fn test_recv_timeout_and_disconnect() {
		let queue = IngressQueue::new(1);
		let (sender, receiver) = queue.split();

		assert!(matches!(
			receiver.recv_timeout(Duration::from_millis(5)),
			Err(QueueError::Empty)
		));

		drop(sender);
		assert!(matches!(
			receiver.try_recv(),
			Err(QueueError::Disconnected)
		));
	}
}
