//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::{style, StyledObject, Term};
use ifw_events::{
    AppEvent, DownloadEvent, GeneralEvent, LifecycleEvent, OperationEvent, ResolverEvent,
};
use ifw_types::RunStatus;
use std::collections::HashMap;

/// Progress is reported in steps of this many percent
const PROGRESS_STEP: u64 = 25;

/// Event handler for progress display and user feedback
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Events are only logged, never printed
    quiet: bool,
    /// Command name used to correlate log records
    command: String,
    /// Last reported progress step per download URL
    downloads: HashMap<String, u64>,
}

impl EventHandler {
    pub fn new(
        command: impl Into<String>,
        colors_enabled: bool,
        debug_enabled: bool,
        quiet: bool,
    ) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
            command: command.into(),
            downloads: HashMap::new(),
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event, &self.command);
        if self.quiet {
            return;
        }

        match event {
            AppEvent::Download(download) => self.handle_download(download),
            AppEvent::Operation(operation) => self.handle_operation(operation),
            AppEvent::Resolver(resolver) => self.handle_resolver(resolver),
            AppEvent::Lifecycle(lifecycle) => self.handle_lifecycle(lifecycle),
            AppEvent::General(general) => self.handle_general(general),
            // Container reads and writes only go to the log
            AppEvent::Container(_) => {}
        }
    }

    fn handle_download(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started {
                url, total_size, ..
            } => {
                let size = total_size.map(|s| format!(" ({})", format_bytes(s)));
                self.show_status(&format!(
                    "Downloading {}{}",
                    file_name(&url),
                    size.unwrap_or_default()
                ));
                self.downloads.insert(url, 0);
            }
            DownloadEvent::Progress { url, progress } => {
                let Some(fraction) = progress.fraction() else {
                    return;
                };
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let percent = (fraction * 100.0) as u64;
                let step = percent / PROGRESS_STEP * PROGRESS_STEP;
                let last = self.downloads.entry(url.clone()).or_insert(0);
                if step > *last && step < 100 {
                    *last = step;
                    self.show_detail(&format!("{} {step}%", file_name(&url)));
                }
            }
            DownloadEvent::Completed { url, .. } => {
                self.downloads.remove(&url);
            }
            DownloadEvent::Retrying {
                url,
                attempt,
                reason,
            } => {
                self.show_warning(&format!(
                    "Retrying {} (attempt {attempt}): {reason}",
                    file_name(&url)
                ));
            }
            DownloadEvent::HashMismatch { url, .. } => {
                self.show_warning(&format!("Checksum mismatch for {}", file_name(&url)));
            }
            DownloadEvent::Cancelled { url } => {
                self.downloads.remove(&url);
            }
            DownloadEvent::Failed { url, failure } => {
                self.downloads.remove(&url);
                self.show_error(&format!(
                    "Download of {} failed: {}",
                    file_name(&url),
                    failure.message
                ));
            }
        }
    }

    fn handle_operation(&self, event: OperationEvent) {
        match event {
            OperationEvent::Executing { operation, .. } if self.debug_enabled => {
                self.show_detail(&format!("  {operation}"));
            }
            OperationEvent::Failed {
                operation, failure, ..
            } => {
                self.show_error(&format!("{operation} failed: {}", failure.message));
            }
            OperationEvent::Undone { operation, .. } => {
                self.show_detail(&format!("  undone {operation}"));
            }
            OperationEvent::UndoFailed {
                operation, failure, ..
            } => {
                self.show_warning(&format!("Could not undo {operation}: {}", failure.message));
            }
            _ => {}
        }
    }

    fn handle_resolver(&self, event: ResolverEvent) {
        match event {
            ResolverEvent::Completed { install, remove } => {
                if !remove.is_empty() {
                    self.show_detail(&format!("Removing {}", remove.join(", ")));
                }
                if !install.is_empty() {
                    self.show_detail(&format!("Installing {}", install.join(", ")));
                }
            }
            ResolverEvent::Failed { failure } => {
                self.show_error(&failure.message);
            }
            ResolverEvent::Started { .. } => {}
        }
    }

    fn handle_lifecycle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::SourceFailed { url, failure } => {
                self.show_warning(&format!("Repository {url} unavailable: {}", failure.message));
            }
            LifecycleEvent::ComponentInstalling { name, version } => {
                self.show_status(&format!("Installing {name} {version}"));
            }
            LifecycleEvent::ComponentInstalled { name, version } => {
                self.show_success(&format!("Installed {name} {version}"));
            }
            LifecycleEvent::ComponentRemoved { name } => {
                self.show_success(&format!("Removed {name}"));
            }
            LifecycleEvent::RecoveryStarted { operations } => {
                self.show_warning(&format!(
                    "A previous run was interrupted, undoing {operations} operations"
                ));
            }
            LifecycleEvent::Finished { status } if status == RunStatus::Canceled => {
                self.show_warning("Canceled, all changes were undone");
            }
            LifecycleEvent::StateChanged { from, to } if self.debug_enabled => {
                self.show_detail(&format!("{from} -> {to}"));
            }
            _ => {}
        }
    }

    fn handle_general(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(context) => self.show_warning(&format!("{message}: {context}")),
                None => self.show_warning(&message),
            },
            GeneralEvent::Error { message, details } => match details {
                Some(details) => self.show_error(&format!("{message}: {details}")),
                None => self.show_error(&message),
            },
            GeneralEvent::DebugLog { message, .. } if self.debug_enabled => {
                self.show_detail(&message);
            }
            GeneralEvent::CommandFailed { command, error } => {
                self.show_error(&format!("{command} failed: {error}"));
            }
            _ => {}
        }
    }

    fn styled<'a>(&self, text: &'a str) -> StyledObject<&'a str> {
        style(text).force_styling(self.colors_enabled)
    }

    fn show_status(&self, message: &str) {
        self.print(&self.styled(message).bold().to_string());
    }

    fn show_detail(&self, message: &str) {
        self.print(&self.styled(message).dim().to_string());
    }

    fn show_success(&self, message: &str) {
        self.print(&self.styled(message).green().to_string());
    }

    fn show_warning(&self, message: &str) {
        self.print(&self.styled(message).yellow().to_string());
    }

    fn show_error(&self, message: &str) {
        self.print(&self.styled(message).red().to_string());
    }

    fn print(&self, line: &str) {
        // Terminal write failures are not worth aborting a run for
        let _ = self.term.write_line(line);
    }
}

fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
