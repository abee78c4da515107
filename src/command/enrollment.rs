// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::{Args, Parser};
use log::{error, warn};

use crate::{
    client::Client,
    error::{self, Failure, Result},
    mutation::Applied,
    password, session, storage,
};

#[derive(Debug, Args)]
struct Target {
    /// The name of the activity.
    #[clap()]
    activity: String,

    /// The participant's email address.
    #[clap()]
    email: String,
}

fn report<S: storage::Storage<session::Data>>(
    client: &Client<S>,
    outcome: Result<Applied, Failure>,
    activity: &str,
) -> Result<()> {
    let applied = outcome.map_err(|failure| {
        error!("{}", failure);
        error::Error::Command
    })?;

    println!("{}", applied.message);
    if let Err(failure) = applied.refresh {
        warn!(
            "The change was made, but the activity list may be out of date: {}",
            failure.message()
        );
        return Ok(());
    }

    let roster = client.roster();
    if let Some(row) = roster.get(activity).map(|a| (activity, a)) {
        println!("{}", super::activities::render([row]));
    }
    Ok(())
}

/// Sign a participant up for an activity.
#[derive(Debug, Parser)]
pub(crate) struct Signup {
    #[command(flatten)]
    target: Target,
}

#[async_trait]
impl super::Command for Signup {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        _prompt: &dyn password::Prompt,
    ) -> Result<()> {
        let Target { activity, email } = self.target;
        report(client, client.signup(&activity, &email).await, &activity)
    }
}

/// Take a participant off an activity.
#[derive(Debug, Parser)]
pub(crate) struct Unregister {
    #[command(flatten)]
    target: Target,
}

#[async_trait]
impl super::Command for Unregister {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        _prompt: &dyn password::Prompt,
    ) -> Result<()> {
        let Target { activity, email } = self.target;
        report(client, client.unregister(&activity, &email).await, &activity)
    }
}
