//! Integration tests for events

#[cfg(test)]
mod tests {
    use ifw_errors::{IntegrityError, UserFacingError};
    use ifw_events::*;
    use ifw_types::{RunState, RunStatus};

    #[tokio::test]
    async fn test_emit_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, AppEvent::General(GeneralEvent::Error { .. })));
        assert_eq!(event1.log_level(), tracing::Level::ERROR);

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(event2, AppEvent::General(GeneralEvent::DebugLog { .. })));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_none_sender_is_silent() {
        let sender: Option<EventSender> = None;
        sender.emit_warning("nobody listens");
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = AppEvent::Lifecycle(LifecycleEvent::StateChanged {
            from: RunState::Idle,
            to: RunState::MetadataFetching,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "lifecycle");
        assert_eq!(json["event"]["type"], "StateChanged");
        assert_eq!(json["event"]["to"], "metadata_fetching");

        let finished = AppEvent::Lifecycle(LifecycleEvent::Finished {
            status: RunStatus::Canceled,
        });
        assert_eq!(finished.event_source(), EventSource::LIFECYCLE);
    }

    #[test]
    fn test_failure_context_from_error() {
        let err = IntegrityError::HashMismatch {
            path: "/tmp/x".into(),
            expected: "a".into(),
            actual: "b".into(),
        };
        let ctx = FailureContext::from_error(&err);
        assert!(ctx.retryable);
        assert_eq!(ctx.code.as_deref(), err.user_code());
    }
}
