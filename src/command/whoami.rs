// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    client::Client,
    error::{self, Result},
    password, session, storage,
};

/// Show who is signed in, if anyone.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        _prompt: &dyn password::Prompt,
    ) -> Result<()> {
        match client.check_auth().await.username {
            Some(username) => {
                println!("{username}");
                Ok(())
            }
            None => {
                error!("Not signed in");
                Err(error::Error::Command)
            }
        }
    }
}
