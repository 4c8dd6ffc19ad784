//! EnvironmentVariable and GlobalSettings
//!
//! Both persist to flat `KEY=value` files. Undo after commit has no backup
//! to restore, so it edits the single key back out instead of dropping the
//! whole file.

use super::{create_parent_dirs, remove_created_dirs};
use crate::backup::{backup_copy, restore};
use crate::context::RunContext;
use crate::operation::UndoState;
use ifw_errors::{Error, OperationError};
use ifw_platform::filesystem;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File name used below `environment.d`
const ENVIRONMENT_FILE: &str = "60-ifw.conf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persistence {
    Session,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    User,
    System,
}

fn persistence(args: &[String]) -> Result<Persistence, Error> {
    match args.get(2).map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "session" | "false") => Ok(Persistence::Session),
        Some("permanent" | "true") => Ok(Persistence::Permanent),
        Some(other) => Err(invalid_option("persistence", other)),
    }
}

fn scope(args: &[String]) -> Result<Scope, Error> {
    match args.get(3).map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "user" | "false") => Ok(Scope::User),
        Some("system" | "true") => Ok(Scope::System),
        Some(other) => Err(invalid_option("scope", other)),
    }
}

fn invalid_option(what: &str, value: &str) -> Error {
    OperationError::failed("EnvironmentVariable", format!("unknown {what} '{value}'")).into()
}

/// Permanent system-wide variables need elevation
#[must_use]
pub(crate) fn environment_needs_elevation(args: &[String]) -> bool {
    matches!(
        (persistence(args), scope(args)),
        (Ok(Persistence::Permanent), Ok(Scope::System))
    )
}

fn lookup<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
}

/// Set or, with `None`, remove `key` in a `KEY=value` document
fn with_key(text: &str, key: &str, value: Option<&str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut written = false;
    for line in text.lines() {
        let matches = line
            .split_once('=')
            .is_some_and(|(k, _)| k.trim() == key);
        if !matches {
            out.push_str(line);
            out.push('\n');
        } else if let (Some(value), false) = (value, written) {
            out.push_str(&format!("{key}={value}\n"));
            written = true;
        }
    }
    if let (Some(value), false) = (value, written) {
        out.push_str(&format!("{key}={value}\n"));
    }
    out
}

async fn read_or_empty(path: &Path) -> Result<String, Error> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Rewrite `key` in `file`, deleting the file once it holds nothing
async fn store_key(file: &Path, key: &str, value: Option<&str>) -> Result<(), Error> {
    let text = with_key(&read_or_empty(file).await?, key, value);
    if text.trim().is_empty() {
        filesystem::remove_path(file).await
    } else {
        filesystem::atomic_write(file, text.as_bytes()).await
    }
}

/// [`store_key`] for an operation, returning the directories it had to create
async fn store_key_creating(file: &Path, key: &str, value: &str) -> Result<Vec<PathBuf>, Error> {
    let created_dirs = create_parent_dirs(file).await?;
    if let Err(e) = store_key(file, key, Some(value)).await {
        remove_created_dirs(&created_dirs).await;
        return Err(e);
    }
    Ok(created_dirs)
}

/// `EnvironmentVariable(name, value, [session|permanent], [user|system])`
pub(super) async fn environment_variable(
    args: &[String],
    ctx: &mut RunContext,
) -> Result<UndoState, Error> {
    let name = args[0].trim().to_string();
    if name.is_empty() || name.contains(['=', '\n']) {
        return Err(OperationError::failed(
            "EnvironmentVariable",
            format!("invalid variable name '{name}'"),
        )
        .into());
    }
    let value = args[1].clone();

    let (file, backup, created_dirs) = match persistence(args)? {
        Persistence::Session => (None, None, Vec::new()),
        Persistence::Permanent => {
            let dir = match scope(args)? {
                Scope::User => ctx.user_dirs().config.clone(),
                Scope::System => ctx.system_dir().to_path_buf(),
            };
            let file = dir.join("environment.d").join(ENVIRONMENT_FILE);
            let backup = backup_copy(ctx, &file).await?;
            let created_dirs = store_key_creating(&file, &name, &value).await?;
            (Some(file), backup, created_dirs)
        }
    };

    let previous = ctx.set_env(name.clone(), value);
    Ok(UndoState::Environment {
        name,
        previous,
        file,
        backup,
        created_dirs,
    })
}

pub(super) async fn undo_environment(
    name: &str,
    previous: Option<&str>,
    file: Option<&Path>,
    backup: Option<&Path>,
    ctx: &mut RunContext,
) -> Result<(), Error> {
    match previous {
        Some(value) => ctx.set_env(name, value),
        None => ctx.remove_env(name),
    };
    match (file, backup) {
        (Some(file), Some(backup)) => restore(backup, file).await,
        (Some(file), None) => store_key(file, name, None).await,
        (None, _) => Ok(()),
    }
}

fn settings_file(args: &[String], ctx: &RunContext) -> (PathBuf, String, String) {
    if let [company, application, key, value] = args {
        let file = ctx
            .user_dirs()
            .config
            .join(company)
            .join(format!("{application}.conf"));
        (file, key.clone(), value.clone())
    } else {
        (ctx.resolve(&args[0]), args[1].clone(), args[2].clone())
    }
}

/// `GlobalSettings(file, key, value)` or
/// `GlobalSettings(company, application, key, value)`
pub(super) async fn global_settings(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let (file, key, value) = settings_file(args, ctx);
    if key.trim().is_empty() || key.contains(['=', '\n']) {
        return Err(OperationError::failed("GlobalSettings", format!("invalid key '{key}'")).into());
    }
    let previous = lookup(&read_or_empty(&file).await?, &key).map(str::to_string);
    let backup = backup_copy(ctx, &file).await?;
    let created_dirs = store_key_creating(&file, &key, &value).await?;
    Ok(UndoState::Setting {
        file,
        key,
        value,
        previous,
        backup,
        created_dirs,
    })
}

/// Put the previous value back unless someone changed the key since
///
/// Before commit the whole file comes back from its snapshot; afterwards
/// only the key is rewritten.
pub(super) async fn undo_setting(
    file: &Path,
    key: &str,
    value: &str,
    previous: Option<&str>,
    backup: Option<&Path>,
) -> Result<(), Error> {
    let current = read_or_empty(file).await?;
    if lookup(&current, key) != Some(value) {
        tracing::warn!(file = %file.display(), key, "setting changed since install, leaving it");
        return Ok(());
    }
    match backup {
        Some(backup) => restore(backup, file).await,
        None => store_key(file, key, previous).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_with_key() {
        let text = "A=1\nB=2\n";
        assert_eq!(with_key(text, "B", Some("3")), "A=1\nB=3\n");
        assert_eq!(with_key(text, "C", Some("x")), "A=1\nB=2\nC=x\n");
        assert_eq!(with_key(text, "A", None), "B=2\n");
        assert_eq!(lookup(text, "B"), Some("2"));
    }

    #[test]
    fn test_elevation_rule() {
        assert!(environment_needs_elevation(&strings(&[
            "PATH", "/x", "permanent", "system"
        ])));
        assert!(!environment_needs_elevation(&strings(&["PATH", "/x", "permanent"])));
        assert!(!environment_needs_elevation(&strings(&["PATH", "/x"])));
    }
}
