// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    client::Client,
    error::{self, Result},
    password::{self, Request},
    session, storage,
};

const ATTEMPTS: usize = 3;

/// Sign in and remember the session for later runs.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The account to sign in as.
    #[clap()]
    username: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        prompt: &dyn password::Prompt,
    ) -> Result<()> {
        let mut request = Request::new(&self.username);
        for _ in 0..ATTEMPTS {
            let Some(password) = prompt.prompt(request.clone()).await? else {
                return Err(error::Password::NoPrompt.into());
            };

            match client.login(&self.username, &password).await {
                Ok(username) => {
                    println!("Signed in as {username}.");
                    return Ok(());
                }
                // Only a refusal is worth another try.
                Err(failure) if failure.is_answer() => {
                    request = request.retry(failure.message());
                }
                Err(failure) => {
                    error!("{}", failure);
                    return Err(error::Error::Command);
                }
            }
        }

        error!("Giving up after {} attempts", ATTEMPTS);
        Err(error::Error::Command)
    }
}
