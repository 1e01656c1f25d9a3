use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{Config, config::write_toml, model::UserProfile};

/// An authenticated backend session.
///
/// Produced by [`crate::BackendClient::login`] and handed to every call that
/// needs a bearer token. Nothing holds on to it globally; the CLI persists it
/// between invocations with [`Session::save`] and drops it on logout.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn new(token: String) -> Self {
        Self { token, user: None }
    }

    pub fn session_file_path() -> Result<PathBuf> {
        Ok(Config::config_dir()?.join("session.toml"))
    }

    /// Stored session, or `None` if nobody is logged in.
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::session_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;

        let session = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;

        Ok(Some(session))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::session_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_toml(path, self)
    }

    /// Forget the stored session. Missing files are fine.
    pub fn clear() -> Result<()> {
        Self::clear_at(&Self::session_file_path()?)
    }

    pub fn clear_at(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                log::info!("Removed session file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove session file: {}", path.display()))),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user.as_ref().map(|u| u.email.as_str()))
            .finish()
    }
}
