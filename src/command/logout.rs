// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{client::Client, error::Result, password, session, storage};

/// Sign out and forget the saved session.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        _prompt: &dyn password::Prompt,
    ) -> Result<()> {
        let username = client.session().username;
        client.logout().await;
        match username {
            Some(username) => println!("Signed out {username}."),
            None => println!("Not signed in."),
        }
        Ok(())
    }
}
