#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Core event bus for the Dropship ingestion daemon.
//!
//! The bus provides a typed event enum, sequential identifiers, and support
//! for replaying recent events when subscribers attach late (e.g. a test
//! harness observing a pass that already started). Internally it uses
//! `tokio::broadcast` with a bounded buffer; when the channel overflows, the
//! oldest events are dropped.

pub mod error;

pub use error::{EventBusError, EventBusResult};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the daemon.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced across the ingestion pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A manifest-plus-copy pass began.
    PassStarted {
        /// Identifier shared by all events of this pass.
        pass_id: Uuid,
    },
    /// A candidate file reached a stable size and is safe to read.
    FileStable {
        /// Pass the observation belongs to.
        pass_id: Uuid,
        /// File name within the source directory.
        name: String,
    },
    /// A candidate file vanished (or never settled) before it could be read.
    FileVanished {
        /// Pass the observation belongs to.
        pass_id: Uuid,
        /// File name within the source directory.
        name: String,
    },
    /// The manifest artifact was persisted to the source directory.
    ManifestWritten {
        /// Pass the manifest belongs to.
        pass_id: Uuid,
        /// Path of the manifest artifact.
        path: String,
        /// Number of entries recorded in the manifest.
        entries: u64,
    },
    /// A file was written to the destination and removed from the source.
    FileCopied {
        /// Pass the transfer belongs to.
        pass_id: Uuid,
        /// File name within the source directory.
        name: String,
        /// Number of bytes written to the destination.
        bytes: u64,
        /// Pre-transfer SHA-256 digest of the file content.
        sha256: String,
        /// Attempt number on which the transfer succeeded (1-based).
        attempt: u32,
    },
    /// A file exhausted its transfer attempts and remains in the source.
    FileFailed {
        /// Pass the failure belongs to.
        pass_id: Uuid,
        /// File name within the source directory.
        name: String,
        /// Human-readable description of the final failure.
        message: String,
    },
    /// A full pass finished; counts cover the copy phase.
    PassCompleted {
        /// Pass that completed.
        pass_id: Uuid,
        /// Candidate files enumerated by the copy phase.
        found: u64,
        /// Files copied and removed from the source.
        copied: u64,
        /// Files that exhausted their attempts.
        failed: u64,
    },
    /// The trigger marker was detected and confirmed stable.
    TriggerDetected {
        /// Path of the trigger marker.
        path: String,
    },
    /// The trigger marker was deleted after a pass.
    TriggerCleared {
        /// Path of the trigger marker.
        path: String,
    },
    /// Component health changed; an empty list means fully recovered.
    HealthChanged {
        /// Names of the currently degraded components.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for log consumers and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PassStarted { .. } => "pass_started",
            Self::FileStable { .. } => "file_stable",
            Self::FileVanished { .. } => "file_vanished",
            Self::ManifestWritten { .. } => "manifest_written",
            Self::FileCopied { .. } => "file_copied",
            Self::FileFailed { .. } => "file_failed",
            Self::PassCompleted { .. } => "pass_completed",
            Self::TriggerDetected { .. } => "trigger_detected",
            Self::TriggerCleared { .. } => "trigger_cleared",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// The wrapped event.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel uses the same capacity as the in-memory replay
    /// buffer, ensuring dropped events impact both structures consistently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn publish(&self, event: Event) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            for item in buffer.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
        buffer.back().map(|event| event.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from
/// the live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
