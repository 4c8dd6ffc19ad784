//! Integration tests for error types

#[cfg(test)]
mod tests {
    use ifw_errors::*;

    #[test]
    fn test_error_conversion() {
        let net_err = NetworkError::Timeout {
            url: "https://example.com".into(),
        };
        let err: Error = net_err.into();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("network.timeout"));
    }

    #[test]
    fn test_arity_messages() {
        let err = ValidationError::InvalidArgumentCount {
            operation: "Copy".into(),
            given: 3,
            expected: Arity::Exactly(2),
        };
        assert_eq!(
            err.to_string(),
            "Invalid arguments in Copy: 3 arguments given, 2 expected."
        );

        let err = ValidationError::InvalidArgumentCount {
            operation: "EnvironmentVariable".into(),
            given: 5,
            expected: Arity::Range(2, 4),
        };
        assert!(err.to_string().contains("2 to 4 expected"));
        assert!(!Error::from(err).is_retryable());
    }

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Either(3, 4).accepts(4));
        assert!(!Arity::Either(3, 4).accepts(5));
        assert!(Arity::AtLeast(2).accepts(7));
        assert!(!Arity::Range(2, 4).accepts(1));
    }

    #[test]
    fn test_integrity_is_retryable() {
        let err: Error = IntegrityError::HashMismatch {
            path: "/tmp/a".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("integrity.hash_mismatch"));
    }

    #[test]
    fn test_cycle_names_pair() {
        let err = DependencyError::Cycle {
            a: "A".into(),
            b: "B".into(),
        };
        assert_eq!(
            err.to_string(),
            "Dependency cycle between components detected: 'A' and 'B'."
        );
    }

    #[test]
    fn test_still_required_message() {
        let err = DependencyError::StillRequired {
            component: "app.runtime".into(),
            dependents: vec!["app.core".into(), "app.docs".into()],
        };
        let text = err.to_string();
        assert!(text.starts_with("cannot resolve all dependencies"));
        assert!(text.contains("app.core, app.docs"));
    }

    #[test]
    fn test_io_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::StorageFull, "no space left");
        let err = Error::io_with_path(&io_err, "/opt/app/bin/tool");
        match &err {
            Error::Io { kind, path, .. } => {
                assert_eq!(*kind, std::io::ErrorKind::StorageFull);
                assert_eq!(path.as_deref(), Some(std::path::Path::new("/opt/app/bin/tool")));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("/opt/app/bin/tool"));
    }

    #[test]
    fn test_cancelled_is_not_failure() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::from(InstallError::Aborted).is_cancelled());
        assert!(!Error::internal("boom").is_cancelled());
    }
}
