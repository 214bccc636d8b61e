// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fire-and-forget attendance recording.
//!
//! Attendance rows are an audit side effect of sign-in and sign-out. They
//! are queued to a background worker and applied in submission order; a
//! failed write is logged and dropped. Nothing here can fail or delay the
//! caller.

use crate::db::AttendanceStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
enum AttendanceCommand {
    Open { user_id: String, at: DateTime<Utc> },
    Close { user_id: String, at: DateTime<Utc> },
}

/// Handle for submitting attendance side effects.
#[derive(Clone)]
pub struct AttendanceRecorder {
    tx: mpsc::UnboundedSender<AttendanceCommand>,
}

impl AttendanceRecorder {
    /// Start the background worker. The worker exits once every recorder
    /// handle has been dropped and the queue is drained.
    pub fn spawn(store: Arc<dyn AttendanceStore>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(store, rx));
        (Self { tx }, worker)
    }

    /// Open an attendance row for `user_id`, timestamped now.
    pub fn open(&self, user_id: &str) {
        self.submit(AttendanceCommand::Open {
            user_id: user_id.to_string(),
            at: Utc::now(),
        });
    }

    /// Close the open attendance row for `user_id`, timestamped now.
    pub fn close(&self, user_id: &str) {
        self.submit(AttendanceCommand::Close {
            user_id: user_id.to_string(),
            at: Utc::now(),
        });
    }

    fn submit(&self, command: AttendanceCommand) {
        if let Err(e) = self.tx.send(command) {
            tracing::warn!(command = ?e.0, "Attendance worker gone, dropping command");
        }
    }
}

async fn run_worker(
    store: Arc<dyn AttendanceStore>,
    mut rx: mpsc::UnboundedReceiver<AttendanceCommand>,
) {
    while let Some(command) = rx.recv().await {
        let (action, user_id, result) = match command {
            AttendanceCommand::Open { user_id, at } => {
                let result = store.open_attendance(&user_id, at).await;
                ("open", user_id, result)
            }
            AttendanceCommand::Close { user_id, at } => {
                let result = store.close_attendance(&user_id, at).await;
                ("close", user_id, result)
            }
        };

        match result {
            Ok(()) => tracing::debug!(action, user_id = %user_id, "Attendance recorded"),
            Err(e) => tracing::warn!(
                action,
                user_id = %user_id,
                error = %e,
                "Attendance write failed, dropping"
            ),
        }
    }
    tracing::debug!("Attendance worker stopped");
}
