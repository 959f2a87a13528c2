// ABOUTME: Structured event channel for retries, tool invocations, and loop progress
// ABOUTME: Explicit bus object passed to emitters; observers subscribe at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Event channel
//!
//! Components that emit events receive an [`EventBus`] at construction time.
//! Every event gets a sequence number that is strictly increasing in emission
//! order, so a subscriber can detect gaps when it lags behind the channel.
//! Sequence assignment and send happen under one short lock, so delivery order
//! always matches sequence order.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::constants::events::DEFAULT_CHANNEL_CAPACITY;
use crate::errors::ErrorCode;
use crate::models::TerminalState;

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// An attempt at a guarded call is starting
    AttemptStarted {
        /// Operation name
        operation: String,
        /// 1-based attempt number
        attempt: u32,
    },
    /// An attempt failed and another will follow after `delay_ms`
    RetryScheduled {
        /// Operation name
        operation: String,
        /// Attempt that failed
        attempt: u32,
        /// Backoff before the next attempt
        delay_ms: u64,
        /// Failure class
        code: ErrorCode,
        /// Failure message
        error: String,
    },
    /// An external capability was invoked
    ToolInvoked {
        /// Capability name
        tool: String,
        /// Short description of the input
        summary: String,
    },
    /// A guarded call succeeded
    Succeeded {
        /// Operation name
        operation: String,
        /// Attempts used
        attempts: u32,
    },
    /// A guarded call failed for good
    Failed {
        /// Operation name
        operation: String,
        /// Attempts used
        attempts: u32,
        /// Failure class
        code: ErrorCode,
        /// Failure message
        error: String,
    },
    /// The convergence loop finished evaluating a recipe
    IterationEvaluated {
        /// Optimization run
        run_id: Uuid,
        /// Adjustment rounds so far
        iteration: u32,
        /// Evaluated total
        total_calories: f64,
        /// Caller's target
        target_calories: f64,
    },
    /// The convergence loop reached a terminal state
    OptimizationFinished {
        /// Optimization run
        run_id: Uuid,
        /// Terminal state
        state: TerminalState,
        /// Adjustment rounds performed
        iterations: u32,
        /// Final total
        total_calories: f64,
    },
}

/// An emitted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunerEvent {
    /// Position in emission order, starting at 1
    pub sequence: u64,
    /// Emission time
    pub emitted_at: DateTime<Utc>,
    /// Payload
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Append-only event channel
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<TunerEvent>,
    sequence: Mutex<u64>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Mutex::new(0),
        }
    }

    /// Emit an event; with no subscribers the event is dropped
    pub fn emit(&self, kind: EventKind) -> u64 {
        let mut last = self.sequence.lock().unwrap_or_else(PoisonError::into_inner);
        *last += 1;
        let sequence = *last;
        let event = TunerEvent {
            sequence,
            emitted_at: Utc::now(),
            kind,
        };
        if self.sender.send(event).is_err() {
            debug!(sequence, "Event emitted with no subscribers");
        }
        drop(last);
        sequence
    }

    /// Subscribe to events emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TunerEvent> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far
    #[must_use]
    pub fn emitted(&self) -> u64 {
        *self.sequence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forward every event into `tracing` until the bus is dropped
    #[must_use]
    pub fn spawn_log_observer(&self) -> JoinHandle<()> {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => log_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event observer lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

fn log_event(event: &TunerEvent) {
    match serde_json::to_string(&event.kind) {
        Ok(payload) => info!(sequence = event.sequence, event = %payload, "tuner event"),
        Err(e) => warn!(sequence = event.sequence, "Failed to serialize event: {e}"),
    }
}
