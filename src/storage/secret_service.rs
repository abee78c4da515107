// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::{
    error::{self, Result},
    metadata,
    session::Data,
};

use super::{IsPersistent, Storage};

/// The session token as a keyring item of its own. Items are tagged with the
/// API base URL, so signing in to one server leaves the others alone.
pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    label: String,
    attributes: HashMap<String, String>,
}

impl SecretService {
    pub(crate) async fn new(url: &url::Url) -> Result<Self> {
        let keyring = oo7::Keyring::new().await.map_err(error::Storage::from)?;
        let tag = |name: &str| format!("{}.{}", *metadata::CLIENT_TYPE_ID, name);

        Ok(Self {
            keyring,
            label: format!("{} session for {}", *metadata::CLIENT_DISPLAY_NAME, url),
            attributes: HashMap::from([
                (tag("kind"), "session-token".to_owned()),
                (tag("url"), url.as_str().to_owned()),
            ]),
        })
    }

    fn query(&self) -> HashMap<&str, &str> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }

    async fn find(&self) -> Result<Option<oo7::Item>> {
        let mut items = self
            .keyring
            .search_items(self.query())
            .await
            .map_err(error::Storage::from)?;
        Ok(items.pop())
    }
}

impl IsPersistent for SecretService {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage<Data> for SecretService {
    async fn get(&mut self) -> Result<Option<Data>> {
        let Some(item) = self.find().await? else {
            return Ok(None);
        };

        let secret = item.secret().await.map_err(error::Storage::from)?;
        let token = String::from_utf8(secret.to_vec())
            .map_err(|_| error::Storage::MalformedToken)?;
        Ok(Some(Data::new(&SecretString::new(token))))
    }

    async fn update(&mut self, data: &Data) -> Result<()> {
        self.keyring
            .create_item(&self.label, self.query(), data.token().as_bytes(), true)
            .await
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        if let Some(item) = self.find().await? {
            item.delete().await.map_err(error::Storage::from)?;
        }
        Ok(())
    }
}
