pub mod relay;
pub mod session_store;

use anyhow::Result;
use std::cell::RefCell;

/// Where the backend's session cookie lives between runs.
pub trait SessionVault {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, cookie: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-local vault: nothing survives the run.
#[derive(Debug, Default)]
pub struct MemoryVault {
    cookie: RefCell<Option<String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(cookie: &str) -> Self {
        Self {
            cookie: RefCell::new(Some(cookie.to_string())),
        }
    }
}

impl SessionVault for MemoryVault {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.cookie.borrow().clone())
    }

    fn save(&self, cookie: &str) -> Result<()> {
        *self.cookie.borrow_mut() = Some(cookie.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.cookie.borrow_mut() = None;
        Ok(())
    }
}
