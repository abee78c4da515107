// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, sync::Arc};

use log::{debug, info, warn};

use crate::{
    api::{self, Executor as _},
    auth,
    error::{Error, Failure},
    events::{Notifier, Status},
    roster::{self, Roster},
    session, storage,
};

const ACTION_REJECTED: &str = "An error occurred";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kind {
    Signup,
    Unregister,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Signup => "signup",
            Self::Unregister => "unregister",
        })
    }
}

impl Kind {
    const fn unreachable(self) -> &'static str {
        match self {
            Self::Signup => "Failed to sign up. Please try again.",
            Self::Unregister => "Failed to unregister. Please try again.",
        }
    }
}

/// A change the server accepted.
#[derive(Debug)]
pub(crate) struct Applied {
    /// The server's confirmation.
    pub(crate) message: String,
    /// The refresh that followed. A failure here means the change went
    /// through but the roster we hold predates it.
    pub(crate) refresh: Result<Arc<Roster>, Failure>,
}

/// Signs participants up for activities and takes them off again.
///
/// Nothing here is retried: the server rejects repeated changes, and its
/// answer is passed on as is. Callers are expected to submit each change
/// once.
pub(crate) struct Coordinator<S> {
    gateway: Arc<auth::Gateway<S>>,
    roster: Arc<roster::Cache>,
    notifier: Notifier,
}

impl<S: storage::Storage<session::Data>> Coordinator<S> {
    pub(crate) fn new(
        gateway: Arc<auth::Gateway<S>>,
        roster: Arc<roster::Cache>,
        notifier: Notifier,
    ) -> Self {
        Self {
            gateway,
            roster,
            notifier,
        }
    }

    pub(crate) async fn signup(&self, activity: &str, email: &str) -> Result<Applied, Failure> {
        self.apply(Kind::Signup, activity, email).await
    }

    pub(crate) async fn unregister(
        &self,
        activity: &str,
        email: &str,
    ) -> Result<Applied, Failure> {
        self.apply(Kind::Unregister, activity, email).await
    }

    async fn apply(&self, kind: Kind, activity: &str, email: &str) -> Result<Applied, Failure> {
        let Some(token) = self.gateway.session().authenticated_token() else {
            debug!("Refusing {} of {} without a session", kind, email);
            return Err(self.reject(Failure::describe(
                Error::AuthRequired,
                ACTION_REJECTED,
                kind.unreachable(),
            )));
        };

        let transport = self.gateway.transport();
        let result = match kind {
            Kind::Signup => {
                api::Signup {
                    activity,
                    email,
                    token: &token,
                }
                .execute(transport)
                .await
            }
            Kind::Unregister => {
                api::Unregister {
                    activity,
                    email,
                    token: &token,
                }
                .execute(transport)
                .await
            }
        };

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                if e.is_auth_failure() {
                    info!("The server no longer accepts our session");
                    self.gateway.expire().await;
                } else if e.is_conflict() {
                    info!(
                        "{} of {} for {} conflicts with enrollment: {}",
                        kind, email, activity, e
                    );
                } else {
                    warn!("{} of {} for {} failed: {}", kind, email, activity, e);
                }
                return Err(self.reject(Failure::describe(
                    e,
                    ACTION_REJECTED,
                    kind.unreachable(),
                )));
            }
        };

        _ = self
            .notifier
            .action_result_dismissed(Status::Success, &receipt.message);

        // Only now has the server applied the change, so this refresh cannot
        // predate it.
        let refresh = self.roster.refresh().await;
        if let Err(ref failure) = refresh {
            _ = self.notifier.action_result(Status::Error, failure.message());
        }

        Ok(Applied {
            message: receipt.message,
            refresh,
        })
    }

    fn reject(&self, failure: Failure) -> Failure {
        if failure.is_answer() {
            _ = self
                .notifier
                .action_result_dismissed(Status::Error, failure.message());
        } else {
            _ = self.notifier.action_result(Status::Error, failure.message());
        }
        failure
    }
}
