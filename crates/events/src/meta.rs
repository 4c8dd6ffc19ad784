use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Level;
use uuid::Uuid;

use crate::AppEvent;

/// Envelope data a consumer attaches to an event when it records it
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub event_id: Uuid,
    /// CLI command or run the event belongs to
    pub correlation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub source: EventSource,
}

impl EventMeta {
    #[must_use]
    pub fn new(level: impl Into<EventLevel>, source: impl Into<EventSource>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            correlation_id: None,
            timestamp: Utc::now(),
            level: level.into(),
            source: source.into(),
        }
    }

    /// Metadata derived from the event's own level and domain
    #[must_use]
    pub fn for_event(event: &AppEvent) -> Self {
        Self::new(event.log_level(), event.event_source())
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Severity of an event, ordered from least to most severe
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for EventLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => EventLevel::Trace,
            Level::DEBUG => EventLevel::Debug,
            Level::INFO => EventLevel::Info,
            Level::WARN => EventLevel::Warn,
            Level::ERROR => EventLevel::Error,
        }
    }
}

/// Event domain, used as the `source` field of log records
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventSource(Cow<'static, str>);

impl EventSource {
    pub const GENERAL: Self = Self::const_str("general");
    pub const DOWNLOAD: Self = Self::const_str("download");
    pub const OPERATION: Self = Self::const_str("operation");
    pub const RESOLVER: Self = Self::const_str("resolver");
    pub const LIFECYCLE: Self = Self::const_str("lifecycle");
    pub const CONTAINER: Self = Self::const_str("container");

    const fn const_str(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for EventSource {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DownloadEvent, FailureContext};

    #[test]
    fn test_meta_follows_event() {
        let event = AppEvent::Download(DownloadEvent::Failed {
            url: "https://example.com/a.7z".to_string(),
            failure: FailureContext::new(None::<String>, "gone", None::<String>, false),
        });
        let meta = EventMeta::for_event(&event).with_correlation_id("install");
        assert_eq!(meta.level, EventLevel::Error);
        assert_eq!(meta.source, EventSource::DOWNLOAD);
        assert_eq!(meta.correlation_id.as_deref(), Some("install"));
        assert!(EventLevel::Warn < meta.level);
    }
}
