// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::SecretString;
use security_framework::{
    base,
    os::macos::{
        keychain::{SecKeychain, SecPreferencesDomain},
        keychain_item::SecKeychainItem,
        passwords::SecKeychainItemPassword,
    },
};

use crate::{
    error::{self, Result},
    metadata,
    session::Data,
};

use super::{IsPersistent, Storage};

// errSecItemNotFound
const ITEM_NOT_FOUND: i32 = -25300_i32;

/// The session token as a generic password. The service names this program
/// and the account is the API base URL.
pub(crate) struct Keychain {
    keychain: SecKeychain,
    service: String,
    account: String,
}

impl Keychain {
    pub(crate) fn new(url: &url::Url) -> Result<Self> {
        let service = metadata::PROJECT_DIRS
            .as_ref()
            .ok_or(error::Storage::NoProjectDirs)?
            .project_path()
            .to_string_lossy()
            .into_owned();

        Ok(Self {
            keychain: SecKeychain::default_for_domain(SecPreferencesDomain::User)
                .map_err(error::Storage::from)?,
            service,
            account: url.as_str().to_owned(),
        })
    }

    fn lookup(&self) -> Result<Option<(SecKeychainItemPassword, SecKeychainItem)>> {
        match self
            .keychain
            .find_generic_password(&self.service, &self.account)
        {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.code() == ITEM_NOT_FOUND => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }
}

fn storage_error(e: base::Error) -> error::Error {
    error::Storage::from(e).into()
}

impl IsPersistent for Keychain {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage<Data> for Keychain {
    async fn get(&mut self) -> Result<Option<Data>> {
        let Some((password, _)) = self.lookup()? else {
            return Ok(None);
        };

        let token = String::from_utf8(password.to_vec())
            .map_err(|_| error::Storage::MalformedToken)?;
        Ok(Some(Data::new(&SecretString::new(token))))
    }

    async fn update(&mut self, data: &Data) -> Result<()> {
        self.keychain
            .set_generic_password(&self.service, &self.account, data.token().as_bytes())
            .map_err(storage_error)
    }

    async fn clear(&mut self) -> Result<()> {
        if let Some((_, item)) = self.lookup()? {
            item.delete();
        }
        Ok(())
    }
}
