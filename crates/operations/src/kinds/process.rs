//! ElevatedExecute and ConsumeOutput

use crate::context::RunContext;
use crate::operation::UndoState;
use ifw_errors::{Error, OperationError, ProcessError};
use ifw_platform::{CommandOutput, PlatformCommand};
use std::path::PathBuf;

/// Separates the install command from the command run on undo
const UNDO_MARKER: &str = "UNDOEXECUTE";
const WORKING_DIR_PREFIX: &str = "workingdirectory=";

struct CommandSpec {
    command: Vec<String>,
    undo_command: Option<Vec<String>>,
    working_dir: Option<PathBuf>,
}

fn parse_execute(args: &[String], ctx: &RunContext) -> Result<CommandSpec, Error> {
    let mut working_dir = None;
    let mut command = Vec::new();
    let mut undo_command: Option<Vec<String>> = None;
    for arg in args {
        if let Some(dir) = arg.strip_prefix(WORKING_DIR_PREFIX) {
            working_dir = Some(ctx.resolve(dir));
        } else if arg == UNDO_MARKER {
            undo_command = Some(Vec::new());
        } else if let Some(undo) = undo_command.as_mut() {
            undo.push(arg.clone());
        } else {
            command.push(arg.clone());
        }
    }
    if command.is_empty() {
        return Err(OperationError::failed("ElevatedExecute", "no program given").into());
    }
    if undo_command.as_ref().is_some_and(Vec::is_empty) {
        return Err(OperationError::failed(
            "ElevatedExecute",
            format!("{UNDO_MARKER} is not followed by a program"),
        )
        .into());
    }
    Ok(CommandSpec {
        command,
        undo_command,
        working_dir,
    })
}

fn build(command: &[String], working_dir: Option<&PathBuf>, ctx: &RunContext) -> PlatformCommand {
    let mut cmd = PlatformCommand::new(command[0].clone());
    cmd.args(&command[1..]).envs(ctx.env());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir.clone());
    }
    cmd
}

/// Run a command to completion
///
/// A launch failure re-acquires elevation and retries once. A crash is
/// never retried.
async fn run(
    operation: &str,
    command: &[String],
    working_dir: Option<&PathBuf>,
    ctx: &mut RunContext,
) -> Result<CommandOutput, Error> {
    let cmd = build(command, working_dir, ctx);
    match cmd.run().await {
        Err(Error::Process(ProcessError::LaunchFailed { message, .. })) => {
            tracing::warn!(command = %cmd.display(), %message, "launch failed, retrying once");
            ctx.ensure_elevated(operation, true).await?;
            build(command, working_dir, ctx).run().await
        }
        other => other,
    }
}

pub(super) async fn elevated_execute(
    args: &[String],
    ctx: &mut RunContext,
) -> Result<UndoState, Error> {
    let spec = parse_execute(args, ctx)?;
    let output = run("ElevatedExecute", &spec.command, spec.working_dir.as_ref(), ctx).await?;
    tracing::debug!(
        program = %spec.command[0],
        stdout = %output.stdout_lossy().trim(),
        "command finished"
    );
    Ok(UndoState::Execute {
        undo_command: spec.undo_command,
        working_dir: spec.working_dir,
    })
}

pub(super) async fn undo_execute(
    undo_command: Option<&[String]>,
    working_dir: Option<&PathBuf>,
    ctx: &mut RunContext,
) -> Result<(), Error> {
    if let Some(command) = undo_command {
        run("ElevatedExecute", command, working_dir, ctx).await?;
    }
    Ok(())
}

/// `ConsumeOutput(key, program, [args...])` stores the trimmed standard
/// output under `key`
pub(super) async fn consume_output(
    args: &[String],
    ctx: &mut RunContext,
) -> Result<UndoState, Error> {
    let key = args[0].trim().to_string();
    if key.is_empty() {
        return Err(OperationError::failed("ConsumeOutput", "empty value key").into());
    }
    let output = run("ConsumeOutput", &args[1..], None, ctx).await?;
    let value = output.stdout_lossy().trim().to_string();
    let previous = ctx.set_value(key.clone(), value);
    Ok(UndoState::ContextValue { key, previous })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_undo_command() {
        let ctx = RunContext::new("/opt/demo", "/tmp/backup");
        let spec = parse_execute(
            &strings(&["touch", "a", "UNDOEXECUTE", "rm", "a", "workingdirectory=bin"]),
            &ctx,
        )
        .unwrap();
        assert_eq!(spec.command, strings(&["touch", "a"]));
        assert_eq!(spec.undo_command, Some(strings(&["rm", "a"])));
        assert_eq!(spec.working_dir, Some(PathBuf::from("/opt/demo/bin")));

        assert!(parse_execute(&strings(&["true", "UNDOEXECUTE"]), &ctx).is_err());
        assert!(parse_execute(&strings(&["workingdirectory=/"]), &ctx).is_err());
    }

    #[cfg(unix)]
    fn unstartable_script(dir: &std::path::Path) -> String {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("setup.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();
        script.display().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_failure_reacquires_elevation_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let script = unstartable_script(dir.path());
        let mut ctx = RunContext::new(dir.path(), dir.path().join("backup"))
            .with_elevation_provider(std::sync::Arc::new(ifw_platform::StaticElevation::new(true)));
        assert!(!ctx.elevation.is_granted());

        let err = elevated_execute(&strings(&[script.as_str()]), &mut ctx)
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Process(ProcessError::LaunchFailed { .. })),
            "{err:?}"
        );
        // Only the retry path acquires elevation
        assert!(ctx.elevation.is_granted());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_failure_without_elevation_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let script = unstartable_script(dir.path());
        let mut ctx = RunContext::new(dir.path(), dir.path().join("backup"))
            .with_elevation_provider(std::sync::Arc::new(ifw_platform::StaticElevation::new(false)));

        let err = consume_output(&strings(&["Out", script.as_str()]), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)), "{err:?}");
        assert_eq!(ctx.value("Out"), None);
    }

    #[tokio::test]
    async fn test_missing_program_is_not_retried() {
        let mut ctx = RunContext::new("/opt/demo", "/tmp/backup")
            .with_elevation_provider(std::sync::Arc::new(ifw_platform::StaticElevation::new(true)));
        let err = elevated_execute(&strings(&["/definitely/not/here"]), &mut ctx)
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Process(ProcessError::NotExecutable { .. })),
            "{err:?}"
        );
        assert!(!ctx.elevation.is_granted());
    }
}
