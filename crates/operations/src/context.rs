//! Shared state of one installer run

use ifw_errors::{Error, OperationError};
use ifw_events::{EventEmitter, EventSender};
use ifw_platform::{ElevationProvider, ElevationToken, UserDirs};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const TARGET_DIR_KEY: &str = "TargetDir";
pub const HOME_DIR_KEY: &str = "HomeDir";
pub const APPLICATION_NAME_KEY: &str = "ApplicationName";

/// Everything an operation may read or change besides the filesystem
///
/// Passed explicitly into every execute and undo call; there is no global
/// installer state.
#[derive(Clone)]
pub struct RunContext {
    values: BTreeMap<String, String>,
    component: Option<String>,
    pub elevation: ElevationToken,
    elevation_provider: Option<Arc<dyn ElevationProvider>>,
    target_dir: PathBuf,
    backup_dir: PathBuf,
    /// Root for system-wide configuration (`/etc` outside tests)
    system_dir: PathBuf,
    user_dirs: UserDirs,
    env: BTreeMap<String, String>,
    events: Option<EventSender>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("component", &self.component)
            .field("target_dir", &self.target_dir)
            .field("backup_dir", &self.backup_dir)
            .field("elevated", &self.elevation.is_granted())
            .field("values", &self.values.len())
            .finish_non_exhaustive()
    }
}

impl EventEmitter for RunContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl RunContext {
    #[must_use]
    pub fn new(target_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        let target_dir = target_dir.into();
        let user_dirs = UserDirs::detect();
        let mut values = BTreeMap::new();
        values.insert(TARGET_DIR_KEY.to_string(), target_dir.display().to_string());
        values.insert(HOME_DIR_KEY.to_string(), user_dirs.home.display().to_string());
        Self {
            values,
            component: None,
            elevation: ElevationToken::none(),
            elevation_provider: None,
            target_dir,
            backup_dir: backup_dir.into(),
            system_dir: PathBuf::from("/etc"),
            user_dirs,
            env: BTreeMap::new(),
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_elevation_provider(mut self, provider: Arc<dyn ElevationProvider>) -> Self {
        self.elevation_provider = Some(provider);
        self
    }

    /// Redirect home, config and data directories, for sandboxed runs
    #[must_use]
    pub fn with_user_dirs(mut self, dirs: UserDirs) -> Self {
        self.values
            .insert(HOME_DIR_KEY.to_string(), dirs.home.display().to_string());
        self.user_dirs = dirs;
        self
    }

    #[must_use]
    pub fn with_system_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_dir = dir.into();
        self
    }

    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    #[must_use]
    pub fn system_dir(&self) -> &Path {
        &self.system_dir
    }

    #[must_use]
    pub fn user_dirs(&self) -> &UserDirs {
        &self.user_dirs
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn set_component(&mut self, component: Option<String>) {
        self.component = component;
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a value, returning the previous one
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove_value(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Environment overlay applied to every child process
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.env.insert(name.into(), value.into())
    }

    pub fn remove_env(&mut self, name: &str) -> Option<String> {
        self.env.remove(name)
    }

    /// Replace every `@Key@` with its value
    ///
    /// Text between two `@` that is not a plausible key (empty, or with
    /// characters other than alphanumerics, `_`, `-` and `.`) is copied as is,
    /// so addresses like `user@example.com` survive.
    ///
    /// # Errors
    ///
    /// `ContextValueMissing` for a well-formed key that has no value.
    pub fn substitute(&self, input: &str) -> Result<String, Error> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find('@') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('@') else {
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let key = &after[..end];
            let is_key = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
            if is_key {
                let value = self.value(key).ok_or_else(|| OperationError::ContextValueMissing {
                    key: key.to_string(),
                })?;
                out.push_str(value);
                rest = &after[end + 1..];
            } else {
                out.push('@');
                rest = after;
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Absolute form of `path`; relative paths are taken from the target
    /// directory
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.target_dir.join(path)
        }
    }

    /// Check the elevation token, re-acquiring it once if a provider is
    /// available and `reacquire` is set
    ///
    /// # Errors
    ///
    /// `AuthorizationError::NotElevated`, or the provider's error.
    pub async fn ensure_elevated(&mut self, operation: &str, reacquire: bool) -> Result<(), Error> {
        if self.elevation.is_granted() {
            return Ok(());
        }
        if let (Some(provider), true) = (self.elevation_provider.clone(), reacquire) {
            tracing::info!(operation, "re-acquiring elevation");
            self.elevation = provider.acquire().await?;
        }
        self.elevation.require(operation).map_err(Error::from)
    }

    #[must_use]
    pub fn elevation_provider(&self) -> Option<&Arc<dyn ElevationProvider>> {
        self.elevation_provider.as_ref()
    }
}
