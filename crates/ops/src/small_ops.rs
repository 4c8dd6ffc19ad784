//! Small operations implemented in the ops crate
//!
//! This module serves as a public API facade that re-exports operations
//! from specialized modules.

use crate::maintenance;
use crate::query;

pub use maintenance::recover;
pub use query::{inspect, list_components};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpsContextBuilder;
    use ifw_config::Config;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_recover_without_journal() {
        let temp = tempdir().unwrap();
        let (tx, _rx) = ifw_events::channel();
        let ctx = OpsContextBuilder::new()
            .with_config(Config::default())
            .with_target_dir(temp.path().join("target"))
            .with_sources(Vec::new())
            .with_event_sender(tx)
            .build()
            .unwrap();

        let info = recover(&ctx).await.unwrap();
        assert!(!info.recovered);
        assert_eq!(info.undone, 0);
    }

    #[tokio::test]
    async fn test_list_installed_only_on_empty_target() {
        let temp = tempdir().unwrap();
        let (tx, _rx) = ifw_events::channel();
        let ctx = OpsContextBuilder::new()
            .with_target_dir(temp.path().join("target"))
            .with_event_sender(tx)
            .build()
            .unwrap();

        assert!(list_components(&ctx, true).await.unwrap().is_empty());
    }

    #[test]
    fn test_build_requires_event_sender() {
        assert!(OpsContextBuilder::new().build().is_err());
    }
}
