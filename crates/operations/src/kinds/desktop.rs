//! Freedesktop integration: CreateShortcut, CreateDesktopEntry and
//! RegisterFileType

use super::write_replacing;
use crate::context::RunContext;
use crate::operation::{BackupEntry, UndoState};
use ifw_errors::{Error, OperationError};
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Split trailing `key=value` options off the positional arguments
fn split_options<'a>(args: &'a [String], keys: &[&str]) -> (Vec<&'a str>, Vec<(&'a str, &'a str)>) {
    let mut positional = Vec::new();
    let mut options = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) if keys.contains(&key) => options.push((key, value)),
            _ => positional.push(arg.as_str()),
        }
    }
    (positional, options)
}

fn option<'a>(options: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    options.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Quote an `Exec` argument when it contains characters the desktop entry
/// spec reserves
fn exec_quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains([' ', '\t', '"', '\'', '\\', '$', '`']) {
        let escaped = arg
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('`', "\\`");
        format!("\"{escaped}\"")
    } else {
        arg.to_string()
    }
}

fn applications_dir(ctx: &RunContext) -> PathBuf {
    ctx.user_dirs().data.join("applications")
}

/// `CreateShortcut(target, link, [args...], [workingDirectory=], [iconPath=], [description=])`
pub(super) async fn create_shortcut(args: &[String], ctx: &RunContext) -> Result<UndoState, Error> {
    let (positional, options) =
        split_options(args, &["workingDirectory", "iconPath", "iconId", "description"]);
    let [target, link, extra @ ..] = positional.as_slice() else {
        return Err(OperationError::failed("CreateShortcut", "missing target or link").into());
    };
    let target = ctx.resolve(target);
    let link = ctx.resolve(link);
    let name = link
        .file_stem()
        .map_or_else(|| "Application".to_string(), |s| s.to_string_lossy().into_owned());

    let mut exec = exec_quote(&target.display().to_string());
    for arg in extra {
        exec.push(' ');
        exec.push_str(&exec_quote(arg));
    }

    let mut entry = String::from("[Desktop Entry]\nType=Application\n");
    let _ = writeln!(entry, "Name={name}");
    let _ = writeln!(entry, "Exec={exec}");
    if let Some(dir) = option(&options, "workingDirectory") {
        let _ = writeln!(entry, "Path={}", ctx.resolve(dir).display());
    }
    if let Some(icon) = option(&options, "iconPath") {
        let _ = writeln!(entry, "Icon={icon}");
    }
    if let Some(description) = option(&options, "description") {
        let _ = writeln!(entry, "Comment={description}");
    }
    entry.push_str("Terminal=false\n");

    let replaced = write_replacing(ctx, &link, entry.as_bytes()).await?;
    Ok(replaced.into_undo(link))
}

/// `CreateDesktopEntry(filename, "Key=Value\nKey=Value")`
///
/// A relative file name lands in the user's applications directory.
pub(super) async fn create_desktop_entry(
    args: &[String],
    ctx: &RunContext,
) -> Result<UndoState, Error> {
    let file = Path::new(&args[0]);
    let path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        applications_dir(ctx).join(file)
    };

    // Pairs may be separated by real newlines or a literal `\n`
    let mut entry = String::from("[Desktop Entry]\n");
    for line in args[1].replace("\\n", "\n").lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.contains('=') {
            return Err(OperationError::failed(
                "CreateDesktopEntry",
                format!("'{line}' is not a Key=Value pair"),
            )
            .into());
        }
        entry.push_str(line);
        entry.push('\n');
    }

    let replaced = write_replacing(ctx, &path, entry.as_bytes()).await?;
    Ok(replaced.into_undo(path))
}

/// `RegisterFileType(extension, command, [description], [contentType], [icon], [progId=])`
pub(super) async fn register_file_type(
    args: &[String],
    ctx: &RunContext,
) -> Result<UndoState, Error> {
    let (positional, options) = split_options(args, &["progId"]);
    let [extension, command, rest @ ..] = positional.as_slice() else {
        return Err(OperationError::failed("RegisterFileType", "missing extension or command").into());
    };
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        return Err(OperationError::failed("RegisterFileType", "empty file extension").into());
    }
    let description = rest.first().copied().filter(|s| !s.is_empty());
    let content_type = rest
        .get(1)
        .copied()
        .filter(|s| !s.is_empty())
        .map_or_else(|| format!("application/x-{extension}"), str::to_string);
    let icon = rest.get(2).copied().filter(|s| !s.is_empty());
    let id = option(&options, "progId").map_or_else(|| format!("ifw-{extension}"), str::to_string);

    let mut mime = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    mime.push_str(
        "<mime-info xmlns=\"http://www.freedesktop.org/standards/shared-mime-info\">\n",
    );
    let _ = writeln!(mime, "  <mime-type type=\"{}\">", escape(content_type.as_str()));
    if let Some(description) = description {
        let _ = writeln!(mime, "    <comment>{}</comment>", escape(description));
    }
    let _ = writeln!(mime, "    <glob pattern=\"*.{}\"/>", escape(extension));
    mime.push_str("  </mime-type>\n</mime-info>\n");

    let mut entry = String::from("[Desktop Entry]\nType=Application\nNoDisplay=true\n");
    let _ = writeln!(entry, "Name={}", description.unwrap_or(extension));
    let _ = writeln!(entry, "Exec={command}");
    let _ = writeln!(entry, "MimeType={content_type};");
    if let Some(icon) = icon {
        let _ = writeln!(entry, "Icon={icon}");
    }

    let data = &ctx.user_dirs().data;
    let mime_file = data.join("mime").join("packages").join(format!("{id}.xml"));
    let desktop_file = applications_dir(ctx).join(format!("{id}.desktop"));

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut backups = Vec::new();
    for (path, contents) in [(mime_file, mime), (desktop_file, entry)] {
        match write_replacing(ctx, &path, contents.as_bytes()).await {
            Ok(replaced) => {
                if let Some(backup) = replaced.backup {
                    backups.push(BackupEntry {
                        original: path.clone(),
                        backup,
                    });
                }
                dirs.extend(replaced.created_dirs);
                files.push(path);
            }
            Err(e) => {
                super::undo_file_set(&files, &dirs, &backups).await?;
                return Err(e);
            }
        }
    }
    Ok(UndoState::FileSet {
        files,
        dirs,
        backups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_quoting() {
        assert_eq!(exec_quote("/opt/app/bin/app"), "/opt/app/bin/app");
        assert_eq!(exec_quote("/opt/my app/run"), "\"/opt/my app/run\"");
        assert_eq!(exec_quote("a$b"), "\"a\\$b\"");
    }

    #[test]
    fn test_split_options() {
        let args: Vec<String> = ["bin", "link", "--flag", "iconPath=/i.png", "x=y"]
            .into_iter()
            .map(String::from)
            .collect();
        let (positional, options) = split_options(&args, &["iconPath"]);
        assert_eq!(positional, vec!["bin", "link", "--flag", "x=y"]);
        assert_eq!(option(&options, "iconPath"), Some("/i.png"));
    }
}
