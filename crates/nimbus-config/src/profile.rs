//! Named profiles.
//!
//! Each profile is a directory under `<root>/profiles/`. The name of the active one is kept
//! in `<root>/current`; `NIMBUS_PROFILE` overrides it for a single invocation.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result};

/// Environment variable that selects the profile for one invocation.
pub const PROFILE_ENV: &str = "NIMBUS_PROFILE";

/// Profile used when nothing else selects one.
pub const DEFAULT_PROFILE: &str = "default";

const PROFILES_DIR: &str = "profiles";
const CURRENT_FILE: &str = "current";

/// Profile directories under one config root.
#[derive(Debug, Clone)]
pub struct Profiles {
    root: PathBuf,
}

impl Profiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for profile `name`. Does not create it.
    pub fn dir(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(PROFILES_DIR).join(name))
    }

    /// Resolve the active profile name.
    ///
    /// Precedence: `explicit` (the `--profile` flag), then `NIMBUS_PROFILE`, then the
    /// `current` file, then [`DEFAULT_PROFILE`].
    pub fn active_name(&self, explicit: Option<&str>) -> Result<String> {
        let env = std::env::var(PROFILE_ENV).ok();
        self.resolve_name(explicit, env.as_deref())
    }

    fn resolve_name(&self, explicit: Option<&str>, env: Option<&str>) -> Result<String> {
        let chosen = explicit
            .filter(|n| !n.is_empty())
            .or(env.filter(|n| !n.is_empty()));
        if let Some(name) = chosen {
            validate_name(name)?;
            return Ok(name.to_string());
        }

        if let Some(name) = self.current()? {
            return Ok(name);
        }
        Ok(DEFAULT_PROFILE.to_string())
    }

    /// Resolve the active profile and make sure its directory exists.
    pub fn ensure_active(&self, explicit: Option<&str>) -> Result<(String, PathBuf)> {
        let name = self.active_name(explicit)?;
        let dir = self.dir(&name)?;
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::WriteFile {
            path: dir.display().to_string(),
            source: e,
        })?;
        tracing::debug!(profile = %name, dir = %dir.display(), "Active profile");
        Ok((name, dir))
    }

    /// The name stored in the `current` file, if any.
    pub fn current(&self) -> Result<Option<String>> {
        let path = self.root.join(CURRENT_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::ReadFile {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        let name = contents.trim();
        if name.is_empty() {
            return Ok(None);
        }
        validate_name(name)?;
        Ok(Some(name.to_string()))
    }

    /// Make `name` the persistent active profile.
    pub fn set_current(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        std::fs::create_dir_all(&self.root).map_err(|e| ConfigError::WriteFile {
            path: self.root.display().to_string(),
            source: e,
        })?;
        let path = self.root.join(CURRENT_FILE);
        std::fs::write(&path, name).map_err(|e| ConfigError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Names of the profiles that have a directory, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = self.root.join(PROFILES_DIR);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ConfigError::ReadFile {
                    path: dir.display().to_string(),
                    source: e,
                });
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| validate_name(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Check that `name` is usable as a profile directory name.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != CURRENT_FILE
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidProfile(name.to_string()))
    }
}
