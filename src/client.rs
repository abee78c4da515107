// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use log::debug;
use secrecy::SecretString;
use url::Url;

use crate::{
    api::{self, AuthStatus},
    auth,
    error::{Failure, Result},
    events::{Notifier, Status},
    mutation::{self, Applied},
    roster::{self, Roster},
    session::{self, SessionStore, Snapshot},
    storage,
};

/// Everything a front end needs, wired together.
///
/// Each method is one user gesture. Whatever the gesture changes is reported
/// through the [`Notifier`] as well as returned.
pub(crate) struct Client<S> {
    gateway: Arc<auth::Gateway<S>>,
    roster: Arc<roster::Cache>,
    mutations: mutation::Coordinator<S>,
    notifier: Notifier,
}

impl<S: storage::Storage<session::Data>> Client<S> {
    pub(crate) fn new(base: Url, storage: S, notifier: Notifier) -> Result<Self> {
        let transport = Arc::new(api::Transport::new(base)?);
        let gateway = Arc::new(auth::Gateway::new(
            Arc::clone(&transport),
            Arc::new(SessionStore::new(storage)),
            notifier.clone(),
        ));
        let roster = Arc::new(roster::Cache::new(transport, notifier.clone()));
        let mutations =
            mutation::Coordinator::new(Arc::clone(&gateway), Arc::clone(&roster), notifier.clone());

        Ok(Self {
            gateway,
            roster,
            mutations,
            notifier,
        })
    }

    /// Picks up where the last run left off: restores the saved token and
    /// has the server validate it.
    pub(crate) async fn resume(&self) -> AuthStatus {
        if self.gateway.session().restore().await.is_none() {
            debug!("No saved session");
        }
        self.gateway.check_auth().await
    }

    pub(crate) async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<String, Failure> {
        let grant = match self.gateway.login(username, password).await {
            Ok(grant) => grant,
            Err(failure) => {
                _ = self.notifier.action_result(Status::Error, failure.message());
                return Err(failure);
            }
        };

        let username = grant.username.clone();
        self.gateway
            .session()
            .save(grant.token, grant.username)
            .await;
        self.notifier.auth_changed(Some(username.clone()));

        // What the roster offers depends on who is looking.
        _ = self.refresh().await;
        Ok(username)
    }

    pub(crate) async fn logout(&self) {
        self.gateway.logout().await;
        _ = self.refresh().await;
    }

    /// Validates the session again, e.g. before acting on a stale one.
    pub(crate) async fn check_auth(&self) -> AuthStatus {
        self.gateway.check_auth().await
    }

    /// Fetches the roster, reporting a failure to the presentation.
    pub(crate) async fn refresh(&self) -> Result<Arc<Roster>, Failure> {
        self.roster.refresh().await.map_err(|failure| {
            _ = self.notifier.action_result(Status::Error, failure.message());
            failure
        })
    }

    pub(crate) async fn signup(&self, activity: &str, email: &str) -> Result<Applied, Failure> {
        self.mutations.signup(activity, email).await
    }

    pub(crate) async fn unregister(&self, activity: &str, email: &str) -> Result<Applied, Failure> {
        self.mutations.unregister(activity, email).await
    }

    pub(crate) fn session(&self) -> Snapshot {
        self.gateway.session().snapshot()
    }

    pub(crate) fn roster(&self) -> Arc<Roster> {
        self.roster.current()
    }
}

#[cfg(test)]
mod tests {
    use crate::{events::Event, fake};

    use super::*;

    type Memory = storage::Memory<session::Data>;

    fn password(value: &str) -> SecretString {
        SecretString::new(value.to_owned())
    }

    #[tokio::test]
    async fn session_survives_restart() -> Result<(), Failure> {
        let api = fake::Api::start().await;
        let backing = Memory::new();

        let (notifier, _events) = Notifier::channel();
        let first = Client::new(api.url(), backing.clone(), notifier)?;
        assert_eq!(first.resume().await, AuthStatus::default());
        _ = first.login(fake::USERNAME, &password(fake::PASSWORD)).await?;
        drop(first);

        let (notifier, mut events) = Notifier::channel();
        let second = Client::new(api.url(), backing, notifier)?;
        assert!(!second.session().authenticated);

        let status = second.resume().await;

        assert!(status.authenticated);
        assert_eq!(status.username.as_deref(), Some(fake::USERNAME));
        assert_eq!(
            second.session(),
            Snapshot {
                authenticated: true,
                username: Some(fake::USERNAME.to_owned()),
            },
        );
        assert!(matches!(
            events.try_recv(),
            Ok(Event::AuthChanged(Some(ref username))) if username == fake::USERNAME
        ));
        Ok(())
    }

    #[tokio::test]
    async fn login_and_logout_refresh_roster() -> Result<(), Failure> {
        let api = fake::Api::start().await;
        let (notifier, mut events) = Notifier::channel();
        let client = Client::new(api.url(), Memory::new(), notifier)?;

        assert!(client.roster().is_empty());
        let username = client.login(fake::USERNAME, &password(fake::PASSWORD)).await?;
        assert_eq!(username, fake::USERNAME);
        assert!(!client.roster().is_empty());

        client.logout().await;

        assert_eq!(client.session(), Snapshot::default());
        assert_eq!(client.check_auth().await, AuthStatus::default());

        let seen: Vec<Event> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert!(matches!(
            seen.as_slice(),
            [
                Event::AuthChanged(Some(_)),
                Event::RosterChanged(_),
                Event::AuthChanged(None),
                Event::RosterChanged(_),
                Event::AuthChanged(None),
            ]
        ));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_is_reported() -> Result<(), Failure> {
        let api = fake::Api::start().await;
        let (notifier, mut events) = Notifier::channel();
        let client = Client::new(api.url(), Memory::new(), notifier)?;

        let failure = client.login(fake::USERNAME, &password("nope")).await.err();

        assert_eq!(
            failure.as_ref().map(Failure::message),
            Some("Invalid credentials")
        );
        assert_eq!(client.session(), Snapshot::default());
        assert!(matches!(
            events.try_recv(),
            Ok(Event::ActionResult { status: Status::Error, ref message, .. })
                if message == "Invalid credentials"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn chess_club_scenario() -> Result<(), Failure> {
        let api = fake::Api::start().await;
        let (notifier, _events) = Notifier::channel();
        let client = Client::new(api.url(), Memory::new(), notifier)?;
        _ = client.resume().await;
        _ = client.refresh().await?;

        let requests = api.requests();
        let refused = client.unregister("Chess Club", "a@x.com").await.err();
        assert!(refused.is_some());
        assert_eq!(api.requests(), requests);

        _ = client.login(fake::USERNAME, &password(fake::PASSWORD)).await?;
        let applied = client.signup("Chess Club", "b@x.com").await?;

        assert_eq!(applied.message, "Signed up b@x.com for Chess Club");
        let chess = client.roster().get("Chess Club").cloned();
        assert_eq!(
            chess.as_ref().map(|a| a.participants.clone()),
            Some(vec!["a@x.com".to_owned(), "b@x.com".to_owned()]),
        );
        assert_eq!(chess.map(|a| a.spots_left()), Some(2));
        Ok(())
    }
}
