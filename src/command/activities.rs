// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;
use tabled::{
    settings::{object::Segment, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::{
    client::Client,
    error::{self, Result},
    password,
    roster::Activity,
    session, storage,
};

#[derive(Tabled)]
struct Row<'a> {
    #[tabled(rename = "Activity")]
    name: &'a str,
    #[tabled(rename = "Description")]
    description: &'a str,
    #[tabled(rename = "Schedule")]
    schedule: &'a str,
    #[tabled(rename = "Availability")]
    availability: String,
    #[tabled(rename = "Participants")]
    participants: String,
}

impl<'a> Row<'a> {
    fn new(name: &'a str, activity: &'a Activity) -> Self {
        Self {
            name,
            description: &activity.description,
            schedule: &activity.schedule,
            availability: format!("{} spots left", activity.spots_left()),
            participants: if activity.participants.is_empty() {
                "No participants yet".to_owned()
            } else {
                activity.participants.join("\n")
            },
        }
    }
}

pub(super) fn render<'a>(activities: impl IntoIterator<Item = (&'a str, &'a Activity)>) -> Table {
    let mut table = Table::new(
        activities
            .into_iter()
            .map(|(name, activity)| Row::new(name, activity)),
    );
    _ = table
        .with(Style::rounded())
        .with(Modify::new(Segment::all()).with(Alignment::left()));
    table
}

/// List every activity with its schedule and participants.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Show only the activity with this name.
    #[arg(long, short)]
    name: Option<String>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        _prompt: &dyn password::Prompt,
    ) -> Result<()> {
        let roster = client.refresh().await.map_err(|failure| {
            error!("{}", failure);
            error::Error::Command
        })?;

        if let Some(name) = self.name {
            let Some(activity) = roster.get(&name) else {
                error!("There is no activity named {}", name);
                return Err(error::Error::Command);
            };
            println!("{}", render([(name.as_str(), activity)]));
        } else if roster.is_empty() {
            println!("No activities are on offer.");
        } else {
            println!("{}", render(roster.iter()));
        }

        if let Some(username) = client.session().username {
            println!("Signed in as {username}; use `signup` and `unregister` to change enrollment.");
        }
        Ok(())
    }
}
