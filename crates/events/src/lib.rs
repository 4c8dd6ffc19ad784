#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in ifw
//!
//! Library crates never print. They report through an unbounded channel of
//! domain events; the CLI renders them and forwards them into `tracing`.

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod progress;
pub use progress::{ProgressEvent, SpeedMeter};

pub mod events;
pub use events::{
    AppEvent, ContainerEvent, DownloadEvent, FailureContext, GeneralEvent, LifecycleEvent,
    OperationEvent, ResolverEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for the event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout ifw
///
/// Implemented for the raw `EventSender` and for any context struct that
/// carries an optional sender.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // A dropped receiver only means nobody is listening.
            let _ = sender.send(event);
        }
    }

    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    fn emit_command_started(&self, command: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::CommandStarted {
            command: command.into(),
        }));
    }

    fn emit_command_completed(&self, command: impl Into<String>, success: bool) {
        self.emit(AppEvent::General(GeneralEvent::CommandCompleted {
            command: command.into(),
            success,
        }));
    }

    fn emit_command_failed(&self, command: impl Into<String>, error: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::CommandFailed {
            command: command.into(),
            error: error.into(),
        }));
    }

    fn emit_download_started(
        &self,
        url: impl Into<String>,
        component: Option<String>,
        total_size: Option<u64>,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.into(),
            component,
            total_size,
        }));
    }

    fn emit_download_progress(&self, url: impl Into<String>, progress: ProgressEvent) {
        self.emit(AppEvent::Download(DownloadEvent::Progress {
            url: url.into(),
            progress,
        }));
    }

    fn emit_download_completed(
        &self,
        url: impl Into<String>,
        component: Option<String>,
        final_size: u64,
        hash: Option<String>,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.into(),
            component,
            final_size,
            hash,
        }));
    }

    fn emit_lifecycle(&self, event: LifecycleEvent) {
        self.emit(AppEvent::Lifecycle(event));
    }

    fn emit_operation(&self, event: OperationEvent) {
        self.emit(AppEvent::Operation(event));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
