// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, sync::Arc};

use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::watch;

use crate::{
    api::{self, Executor as _},
    error::Failure,
    events::Notifier,
};

const FETCH_FAILED: &str = "Failed to load activities. Please try again later.";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct Activity {
    pub(crate) description: String,
    pub(crate) schedule: String,
    pub(crate) max_participants: i64,
    pub(crate) participants: Vec<String>,
}

impl Activity {
    /// Remaining capacity. Negative when the server has overbooked the
    /// activity.
    pub(crate) fn spots_left(&self) -> i64 {
        let taken = i64::try_from(self.participants.len()).unwrap_or(i64::MAX);
        self.max_participants.saturating_sub(taken)
    }
}

/// Every activity the server knows about, keyed by name.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub(crate) struct Roster {
    activities: BTreeMap<String, Activity>,
}

impl Roster {
    pub(crate) fn get(&self, name: &str) -> Option<&Activity> {
        self.activities.get(name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Activity)> {
        self.activities
            .iter()
            .map(|(name, activity)| (name.as_str(), activity))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// The last roster we fetched.
///
/// Snapshots are swapped in whole: a reader sees either the previous roster
/// or the new one, and a failed fetch leaves the previous one in place.
pub(crate) struct Cache {
    transport: Arc<api::Transport>,
    snapshot: watch::Sender<Arc<Roster>>,
    notifier: Notifier,
}

impl Cache {
    pub(crate) fn new(transport: Arc<api::Transport>, notifier: Notifier) -> Self {
        let (snapshot, _) = watch::channel(Arc::default());
        Self {
            transport,
            snapshot,
            notifier,
        }
    }

    /// The roster as of the last successful refresh. Empty until then.
    pub(crate) fn current(&self) -> Arc<Roster> {
        Arc::clone(&self.snapshot.borrow())
    }

    // LINT: The CLI reads snapshots one gesture at a time; long-lived
    // presentations watch for replacements instead.
    #[allow(dead_code)]
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Roster>> {
        self.snapshot.subscribe()
    }

    pub(crate) async fn refresh(&self) -> Result<Arc<Roster>, Failure> {
        let roster = api::GetActivities
            .execute(&self.transport)
            .await
            .map(Arc::new)
            .map_err(|e| {
                warn!("Could not fetch activities: {}", e);
                Failure::describe(e, FETCH_FAILED, FETCH_FAILED)
            })?;

        debug!("Replacing roster");
        _ = self.snapshot.send_replace(Arc::clone(&roster));
        self.notifier.roster_changed(Arc::clone(&roster));
        Ok(roster)
    }
}
