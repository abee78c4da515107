// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use log::{info, warn};
use secrecy::SecretString;

use crate::{
    api::{self, AuthStatus, Executor as _, Grant},
    error::Failure,
    events::Notifier,
    session::{self, SessionStore},
    storage,
};

const LOGIN_REJECTED: &str = "Login failed";
const LOGIN_UNREACHABLE: &str = "Login failed. Please try again.";

/// Login, logout, and session validation against the server.
pub(crate) struct Gateway<S> {
    transport: Arc<api::Transport>,
    session: Arc<SessionStore<S>>,
    notifier: Notifier,
}

impl<S: storage::Storage<session::Data>> Gateway<S> {
    pub(crate) fn new(
        transport: Arc<api::Transport>,
        session: Arc<SessionStore<S>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            transport,
            session,
            notifier,
        }
    }

    pub(crate) fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    pub(crate) fn transport(&self) -> &api::Transport {
        &self.transport
    }

    /// Exchanges credentials for a token. The session is left alone; it is up
    /// to the caller to save the grant.
    pub(crate) async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Grant, Failure> {
        api::Login { username, password }
            .execute(&self.transport)
            .await
            .map_err(|e| {
                warn!("Login as {} failed: {}", username, e);
                Failure::describe(e, LOGIN_REJECTED, LOGIN_UNREACHABLE)
            })
    }

    /// Ends the session. The server is told on a best-effort basis; the local
    /// session is cleared no matter what it says.
    pub(crate) async fn logout(&self) {
        if let Some(username) = self.session.username() {
            info!("Signing out {}", username);
        }
        if let Some(token) = self.session.token() {
            if let Err(e) = (api::Logout { token: &token })
                .execute(&self.transport)
                .await
            {
                warn!("The server could not be told about the logout: {}", e);
            }
        }

        self.expire().await;
    }

    /// Asks the server whether the held token is still good, clearing the
    /// session if it is not. Without a token this never touches the network.
    pub(crate) async fn check_auth(&self) -> AuthStatus {
        let Some(token) = self.session.token() else {
            self.notifier.auth_changed(None);
            return AuthStatus::default();
        };

        match (api::CheckAuth { token: &token })
            .execute(&self.transport)
            .await
        {
            Ok(AuthStatus {
                authenticated: true,
                username: Some(username),
            }) if self.session.confirm(username.clone()) => {
                self.notifier.auth_changed(Some(username.clone()));
                AuthStatus {
                    authenticated: true,
                    username: Some(username),
                }
            }
            Ok(_) => {
                info!("The saved session is no longer valid");
                self.expire().await;
                AuthStatus::default()
            }
            Err(e) => {
                warn!("The saved session could not be validated: {}", e);
                self.expire().await;
                AuthStatus::default()
            }
        }
    }

    /// Drops the session locally, e.g. after the server refused its token.
    pub(crate) async fn expire(&self) {
        self.session.clear().await;
        self.notifier.auth_changed(None);
    }
}
