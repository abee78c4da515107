// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Requests understood by the activities API.

use async_trait::async_trait;
use log::debug;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize};
use url::Url;

use crate::{
    error::{Error, Result},
    metadata,
    roster::Roster,
};

/// The HTTP client and the base URL every endpoint is resolved against.
pub(crate) struct Transport {
    http: reqwest::Client,
    base: Url,
}

impl Transport {
    pub(crate) fn new(base: Url) -> Result<Self> {
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(base));
        }

        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(metadata::USER_AGENT.as_str())
                .build()?,
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        _ = url
            .path_segments_mut()
            .map_err(|()| Error::InvalidUrl(self.base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url.path());
        self.http.request(method, url)
    }
}

#[derive(Deserialize)]
struct Rejection {
    detail: Option<serde_json::Value>,
}

impl Rejection {
    fn parse(body: &[u8]) -> Option<String> {
        // Validation errors carry structured detail; we only surface plain,
        // non-blank messages.
        match serde_json::from_slice::<Self>(body).ok()?.detail? {
            serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail),
            _ => None,
        }
    }
}

#[async_trait]
pub(crate) trait Executor: Sized + Send {
    type Response: DeserializeOwned + Send;

    fn request(self, transport: &Transport) -> Result<RequestBuilder>;

    async fn execute(self, transport: &Transport) -> Result<Self::Response> {
        let resp = self.request(transport)?.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!("Server responded with {} ({} bytes)", status, body.len());

        if status.is_success() {
            serde_json::from_slice(&body).map_err(Error::Decode)
        } else {
            Err(Error::Protocol {
                status,
                detail: Rejection::parse(&body),
            })
        }
    }
}

/// Issued by the server on a successful login.
#[derive(Debug, Deserialize)]
pub(crate) struct Grant {
    pub(crate) token: SecretString,
    pub(crate) username: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub(crate) struct AuthStatus {
    pub(crate) authenticated: bool,
    #[serde(default)]
    pub(crate) username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Receipt {
    pub(crate) message: String,
}

pub(crate) struct Login<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a SecretString,
}

impl Executor for Login<'_> {
    type Response = Grant;

    fn request(self, transport: &Transport) -> Result<RequestBuilder> {
        let mut url = transport.endpoint(&["login"])?;
        _ = url
            .query_pairs_mut()
            .append_pair("username", self.username)
            .append_pair("password", self.password.expose_secret());
        Ok(transport.request(Method::POST, url))
    }
}

pub(crate) struct Logout<'a> {
    pub(crate) token: &'a SecretString,
}

impl Executor for Logout<'_> {
    type Response = IgnoredAny;

    fn request(self, transport: &Transport) -> Result<RequestBuilder> {
        Ok(transport
            .request(Method::POST, transport.endpoint(&["logout"])?)
            .bearer_auth(self.token.expose_secret()))
    }
}

pub(crate) struct CheckAuth<'a> {
    pub(crate) token: &'a SecretString,
}

impl Executor for CheckAuth<'_> {
    type Response = AuthStatus;

    fn request(self, transport: &Transport) -> Result<RequestBuilder> {
        Ok(transport
            .request(Method::GET, transport.endpoint(&["check-auth"])?)
            .bearer_auth(self.token.expose_secret()))
    }
}

pub(crate) struct GetActivities;

impl Executor for GetActivities {
    type Response = Roster;

    fn request(self, transport: &Transport) -> Result<RequestBuilder> {
        Ok(transport.request(Method::GET, transport.endpoint(&["activities"])?))
    }
}

fn enrollment(
    transport: &Transport,
    method: Method,
    action: &str,
    activity: &str,
    email: &str,
    token: &SecretString,
) -> Result<RequestBuilder> {
    let mut url = transport.endpoint(&["activities", activity, action])?;
    _ = url.query_pairs_mut().append_pair("email", email);
    Ok(transport
        .request(method, url)
        .bearer_auth(token.expose_secret()))
}

pub(crate) struct Signup<'a> {
    pub(crate) activity: &'a str,
    pub(crate) email: &'a str,
    pub(crate) token: &'a SecretString,
}

impl Executor for Signup<'_> {
    type Response = Receipt;

    fn request(self, transport: &Transport) -> Result<RequestBuilder> {
        enrollment(
            transport,
            Method::POST,
            "signup",
            self.activity,
            self.email,
            self.token,
        )
    }
}

pub(crate) struct Unregister<'a> {
    pub(crate) activity: &'a str,
    pub(crate) email: &'a str,
    pub(crate) token: &'a SecretString,
}

impl Executor for Unregister<'_> {
    type Response = Receipt;

    fn request(self, transport: &Transport) -> Result<RequestBuilder> {
        enrollment(
            transport,
            Method::DELETE,
            "unregister",
            self.activity,
            self.email,
            self.token,
        )
    }
}
