// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod auth;
mod client;
mod command;
mod error;
mod events;
#[cfg(test)]
mod fake;
mod metadata;
mod mutation;
mod password;
mod roster;
mod session;
mod storage;

use std::{path::PathBuf, process};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use client::Client;
use error::Result;
use log::{debug, error, warn};
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Activities(command::activities::Command),
    Login(command::login::Command),
    Logout(command::logout::Command),
    Whoami(command::whoami::Command),
    Signup(command::enrollment::Signup),
    Unregister(command::enrollment::Unregister),
}

#[async_trait]
impl command::Command for Command {
    async fn execute<S: storage::Storage<session::Data>>(
        self,
        client: &Client<S>,
        prompt: &dyn password::Prompt,
    ) -> Result<()> {
        match self {
            Self::Activities(cmd) => cmd.execute(client, prompt).await,
            Self::Login(cmd) => cmd.execute(client, prompt).await,
            Self::Logout(cmd) => cmd.execute(client, prompt).await,
            Self::Whoami(cmd) => cmd.execute(client, prompt).await,
            Self::Signup(cmd) => cmd.execute(client, prompt).await,
            Self::Unregister(cmd) => cmd.execute(client, prompt).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the activities API.
    #[arg(long, env = "ROLLCALL_URL", default_value = "http://127.0.0.1:8000", value_parser = Url::parse)]
    url: Url,

    /// Keep the session for this run only instead of saving it for later
    /// runs.
    #[arg(long)]
    no_persist_session: bool,

    /// The path to the Pinentry program to use when asking for a password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> Box<dyn storage::Storage<session::Data>> {
    if !args.no_persist_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        if let Some(file_storage) = storage::File::new("session.json") {
            return Box::new(file_storage);
        }

        warn!("The session cannot be saved because there is no data directory for it");
    }

    Box::new(storage::Memory::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let (notifier, events) = events::Notifier::channel();
    drop(tokio::spawn(events::trace(events)));

    let client = Client::new(
        args.url.clone(),
        get_session_storage(&args).await,
        notifier,
    )?;
    let status = client.resume().await;
    debug!("Resumed session (authenticated: {})", status.authenticated);

    command::Command::execute(args.command, &client, &prompt).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("ROLLCALL_LOG", "warn")
        .write_style("ROLLCALL_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        // Commands report their own failures before giving up.
        if !matches!(e, error::Error::Command) {
            error!("We encountered an error: {}", e);
        }
        process::exit(1);
    };
}
