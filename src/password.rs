// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{ffi::OsString, path::Path};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::task;

use crate::{error::Result, metadata};

/// What to ask the user for: the password of one account, possibly after a
/// rejected attempt.
#[derive(Debug, Clone)]
pub(crate) struct Request {
    username: String,
    error: Option<String>,
}

impl Request {
    pub(crate) fn new(username: &str) -> Self {
        Self {
            username: username.to_owned(),
            error: None,
        }
    }

    /// The same request again, telling the user why the last answer failed.
    #[must_use]
    pub(crate) fn retry(self, error: &str) -> Self {
        Self {
            error: Some(error.to_owned()),
            ..self
        }
    }
}

#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<T: Prompt + ?Sized> Prompt for Box<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

#[async_trait]
impl<T: Prompt> Prompt for Vec<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for candidate in self {
            if let r @ (Ok(Some(_)) | Err(_)) = candidate.prompt(req.clone()).await {
                return r;
            }
        }

        Ok(None)
    }
}

pub(crate) struct PinentryPrompt {
    executable: Option<OsString>,
}

impl PinentryPrompt {
    pub(crate) const fn new() -> Self {
        Self { executable: None }
    }

    pub(crate) fn new_with_executable<P: AsRef<Path>>(executable: P) -> Self {
        Self {
            executable: Some(executable.as_ref().as_os_str().into()),
        }
    }
}

#[async_trait]
impl Prompt for PinentryPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        fn interact<'input>(
            mut input: pinentry::PassphraseInput<'input>,
            title: &'input str,
            description: &'input str,
            error: Option<&'input String>,
        ) -> Result<SecretString> {
            _ = input.required("A password is required to sign in.");
            _ = input.with_title(title);
            _ = input.with_description(description);
            _ = input.with_prompt("Password");
            if let Some(e) = error {
                _ = input.with_error(e);
            }

            Ok(input.interact()?)
        }

        let title = format!("Sign in - {}", *metadata::CLIENT_DISPLAY_NAME);
        let description = format!("Enter the password for {}.", req.username);

        let input = self
            .executable
            .as_ref()
            .and_then(pinentry::PassphraseInput::with_binary)
            .or_else(pinentry::PassphraseInput::with_default_binary)
            .map(|input| {
                task::spawn_blocking(move || {
                    interact(input, &title, &description, req.error.as_ref())
                })
            });

        Ok(match input {
            Some(fut) => Some(fut.await??),
            None => None,
        })
    }
}

pub(crate) struct RpasswordPrompt;

#[async_trait]
impl Prompt for RpasswordPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        if let Some(error) = req.error {
            eprintln!("Error: {error}");
        }

        let label = format!("Password for {}: ", req.username);
        Ok(Some(
            task::spawn_blocking(move || {
                rpassword::prompt_password(label).map(SecretString::new)
            })
            .await??,
        ))
    }
}
