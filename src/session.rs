// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::lock::Mutex;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::storage;

/// The record we persist between runs.
#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct Data {
    token: String,
}

impl Data {
    pub(crate) fn new(token: &SecretString) -> Self {
        Self {
            token: token.expose_secret().clone(),
        }
    }

    pub(crate) fn into_token(self) -> SecretString {
        SecretString::new(self.token)
    }

    #[cfg(any(feature = "secret-service", feature = "keychain"))]
    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Default)]
struct Session {
    token: Option<SecretString>,
    username: Option<String>,
    authenticated: bool,
}

/// A read-only view of the session that does not expose the token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) authenticated: bool,
    pub(crate) username: Option<String>,
}

fn duplicate(token: &SecretString) -> SecretString {
    SecretString::new(token.expose_secret().clone())
}

/// Holds the authentication state of this client.
///
/// A session is only ever marked authenticated with a username and a token
/// the server has vouched for. A token restored from storage stays
/// unauthenticated until it is confirmed.
pub(crate) struct SessionStore<S> {
    storage: Mutex<S>,
    state: RwLock<Session>,
}

impl<S: storage::Storage<Data>> SessionStore<S> {
    pub(crate) fn new(storage: S) -> Self {
        Self {
            storage: Mutex::new(storage),
            state: RwLock::new(Session::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads a previously saved token, if there is one. The session is not
    /// authenticated by this.
    pub(crate) async fn restore(&self) -> Option<SecretString> {
        let data = self.storage.lock().await.get().await;
        let token = match data {
            Ok(data) => data.map(Data::into_token),
            Err(e) => {
                warn!("Ignoring the saved session because it could not be read: {}", e);
                None
            }
        };

        let mut state = self.write();
        *state = Session {
            token: token.as_ref().map(duplicate),
            ..Session::default()
        };
        debug!("Restored session (token present: {})", state.token.is_some());
        token
    }

    /// Records a successful login and persists its token.
    pub(crate) async fn save(&self, token: SecretString, username: String) {
        let data = Data::new(&token);
        {
            let mut state = self.write();
            *state = Session {
                token: Some(token),
                username: Some(username),
                authenticated: true,
            };
        }

        let mut storage = self.storage.lock().await;
        if let Err(e) = storage.update(&data).await {
            warn!(
                "The session will not be remembered because it could not be saved: {}",
                e
            );
        } else if !storage.is_persistent() {
            debug!("Session storage is not persistent; the session ends with this process");
        }
    }

    /// Forgets the session, both here and in storage.
    pub(crate) async fn clear(&self) {
        *self.write() = Session::default();
        if let Err(e) = self.storage.lock().await.clear().await {
            warn!("The saved session could not be removed: {}", e);
        }
    }

    /// Marks the held token as confirmed by the server for `username`.
    /// Returns `false` if there is no token to confirm.
    pub(crate) fn confirm(&self, username: String) -> bool {
        let mut state = self.write();
        if state.token.is_none() {
            return false;
        }
        if state.username.as_deref() != Some(username.as_str()) {
            info!("Authenticated as {}", username);
        }
        state.username = Some(username);
        state.authenticated = true;
        true
    }

    /// The held token, whether or not it has been confirmed.
    pub(crate) fn token(&self) -> Option<SecretString> {
        self.read().token.as_ref().map(duplicate)
    }

    /// The held token, but only once the server has confirmed it.
    pub(crate) fn authenticated_token(&self) -> Option<SecretString> {
        let state = self.read();
        state
            .authenticated
            .then(|| state.token.as_ref().map(duplicate))
            .flatten()
    }

    #[cfg(test)]
    pub(crate) fn is_authenticated(&self) -> bool {
        self.read().authenticated
    }

    pub(crate) fn username(&self) -> Option<String> {
        self.read().username.clone()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let state = self.read();
        Snapshot {
            authenticated: state.authenticated,
            username: state.username.clone(),
        }
    }
}
