//! Out-of-band control signal channel.
//!
//! Runs alongside the frame pipeline so that high-priority signals (barge-in,
//! emergency stop) never queue behind ordinary data frames.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

pub const DEFAULT_CONTROL_CHANNEL_CAPACITY: usize = 100;

/// A control-plane signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Interrupt,
    Cancel,
    ClearPipeline,
    EmergencyStop,
    Pause,
    Resume,
}

/// A signal plus free-form metadata (e.g. `reason`, `task_id`).
#[derive(Debug, Clone)]
pub struct ControlMessage {
    pub signal: ControlSignal,
    pub metadata: serde_json::Map<String, Value>,
}

impl ControlMessage {
    pub fn new(signal: ControlSignal) -> Self {
        Self {
            signal,
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A bounded, FIFO control channel. Sends are non-blocking: when the queue is
/// full or the channel has been closed, the message is dropped and logged
/// rather than blocking the caller.
pub struct ControlChannel {
    tx: mpsc::Sender<ControlMessage>,
    rx: mpsc::Receiver<ControlMessage>,
    active: bool,
}

impl ControlChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx,
            active: true,
        }
    }

    /// A clonable handle for sending signals from other tasks.
    pub fn sender(&self) -> ControlSender {
        ControlSender {
            tx: self.tx.clone(),
        }
    }

    pub fn send_signal(&self, message: ControlMessage) {
        if !self.active {
            warn!(signal = ?message.signal, "dropped control signal: channel closed");
            return;
        }
        if let Err(err) = self.tx.try_send(message) {
            warn!(error = %err, "dropped control signal: queue full or closed");
        }
    }

    /// Wait up to `timeout` for the next signal. Returns `None` on timeout or
    /// if the channel has been closed and drained.
    pub async fn wait_for_signal(&mut self, timeout: std::time::Duration) -> Option<ControlMessage> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Drain all currently-queued signals without acting on them.
    pub fn clear(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Mark the channel inactive; subsequent `send_signal` calls are dropped.
    pub fn close(&mut self) {
        self.active = false;
        self.clear();
    }
}

/// A clonable sender handle, usable from any task holding a reference to the
/// orchestrator's control plane.
#[derive(Clone)]
pub struct ControlSender {
    tx: mpsc::Sender<ControlMessage>,
}

impl ControlSender {
    pub fn send(&self, message: ControlMessage) {
        if let Err(err) = self.tx.try_send(message) {
            warn!(error = %err, "dropped control signal: queue full or closed");
        }
    }

    pub fn send_interrupt(&self, reason: impl Into<String>) {
        self.send(ControlMessage::new(ControlSignal::Interrupt).with_metadata(
            "reason",
            Value::String(reason.into()),
        ));
    }

    pub fn send_cancel(&self, reason: impl Into<String>) {
        self.send(
            ControlMessage::new(ControlSignal::Cancel)
                .with_metadata("reason", Value::String(reason.into())),
        );
    }

    pub fn send_emergency_stop(&self, reason: impl Into<String>) {
        self.send(
            ControlMessage::new(ControlSignal::EmergencyStop)
                .with_metadata("reason", Value::String(reason.into())),
        );
    }
}
