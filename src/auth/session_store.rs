use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

use crate::auth::SessionVault;

const SERVICE: &str = "rs_invoice_client";

/// Session cookie kept in the OS keyring, one entry per backend URL.
pub struct KeyringVault {
    account: String,
}

impl KeyringVault {
    pub fn new(backend_url: &str) -> Self {
        Self {
            account: backend_url.trim_end_matches('/').to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE, &self.account).map_err(|e| anyhow!(e.to_string()))
    }
}

impl SessionVault for KeyringVault {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(v) => Ok(Some(v)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }

    fn save(&self, cookie: &str) -> Result<()> {
        self.entry()?
            .set_password(cookie)
            .map_err(|e| anyhow!(e.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }
}
