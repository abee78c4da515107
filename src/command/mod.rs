// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::{client::Client, error::Result, password, session, storage};

pub(crate) mod activities;
pub(crate) mod enrollment;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod whoami;

#[async_trait]
pub(crate) trait Command {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        prompt: &dyn password::Prompt,
    ) -> Result<()>;
}
