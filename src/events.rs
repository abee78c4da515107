// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Notifications from the core to whatever is presenting it.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, info, warn};
use tokio::{sync::mpsc, time};

use crate::roster::Roster;

/// How long an action result stays on screen.
pub(crate) const DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub(crate) enum Event {
    /// The signed-in user changed. `None` once signed out.
    AuthChanged(Option<String>),
    RosterChanged(Arc<Roster>),
    ActionResult {
        id: u64,
        status: Status,
        message: String,
    },
    /// The result with the given identifier should no longer be shown.
    ActionDismissed { id: u64 },
}

#[derive(Clone)]
pub(crate) struct Notifier {
    tx: mpsc::UnboundedSender<Event>,
    next_id: Arc<AtomicU64>,
}

impl Notifier {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                next_id: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    fn send(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("Dropping event because nothing is listening");
        }
    }

    pub(crate) fn auth_changed(&self, username: Option<String>) {
        self.send(Event::AuthChanged(username));
    }

    pub(crate) fn roster_changed(&self, roster: Arc<Roster>) {
        self.send(Event::RosterChanged(roster));
    }

    /// Reports the outcome of an action. The result stays until the
    /// presentation decides otherwise.
    pub(crate) fn action_result(&self, status: Status, message: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(Event::ActionResult {
            id,
            status,
            message: message.to_owned(),
        });
        id
    }

    /// Reports the outcome of an action and schedules its dismissal after
    /// [`DISMISS_AFTER`].
    pub(crate) fn action_result_dismissed(&self, status: Status, message: &str) -> u64 {
        let id = self.action_result(status, message);
        let tx = self.tx.clone();
        drop(tokio::spawn(async move {
            time::sleep(DISMISS_AFTER).await;
            _ = tx.send(Event::ActionDismissed { id });
        }));
        id
    }
}

/// Writes every event to the log. Used when the presentation reports results
/// on its own and only needs the events for diagnostics.
pub(crate) async fn trace(mut rx: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::AuthChanged(Some(username)) => info!("Signed in as {}", username),
            Event::AuthChanged(None) => info!("Signed out"),
            Event::RosterChanged(roster) => {
                debug!("Roster now has {} activities", roster.iter().count());
            }
            Event::ActionResult {
                id,
                status: Status::Success,
                message,
            } => debug!("Action {} succeeded: {}", id, message),
            Event::ActionResult {
                id,
                status: Status::Error,
                message,
            } => warn!("Action {} failed: {}", id, message),
            Event::ActionDismissed { id } => debug!("Action {} dismissed", id),
        }
    }
}
