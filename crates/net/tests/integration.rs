//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use ifw_errors::{Error, IntegrityError, NetworkError};
    use ifw_events::{channel, AppEvent, DownloadEvent};
    use ifw_hash::{Hash, HashAlgorithm};
    use ifw_net::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    fn fast_config() -> DownloadConfig {
        DownloadConfig {
            retry: RetryConfig {
                max_retries: 1,
                initial_delay: Duration::from_millis(10),
                jitter_factor: 0.0,
                ..RetryConfig::default()
            },
            progress_interval: Duration::ZERO,
            ..DownloadConfig::default()
        }
    }

    fn downloader() -> Downloader {
        Downloader::new(NetClient::with_defaults().unwrap(), fast_config())
    }

    struct MapResources(HashMap<String, Vec<u8>>);

    impl ResourceProvider for MapResources {
        fn resource(&self, name: &str) -> Result<Option<Vec<u8>>, Error> {
            Ok(self.0.get(name).cloned())
        }
    }

    #[tokio::test]
    async fn test_download_file_with_events() {
        let server = MockServer::start();
        let content = b"payload archive bytes";
        let mock = server.mock(|when, then| {
            when.method(GET).path("/app.core/1.0data.tar");
            then.status(200)
                .header("content-length", content.len().to_string())
                .body(content);
        });

        let (tx, mut rx) = channel();
        let temp = tempdir().unwrap();
        let dest = temp.path().join("nested").join("1.0data.tar");
        let request = DownloadRequest::new(server.url("/app.core/1.0data.tar"), &dest)
            .for_component("app.core");

        let result = downloader()
            .with_events(tx)
            .download(&request, &CancellationToken::new())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(result.size, content.len() as u64);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.hash, Hash::from_data(HashAlgorithm::Sha256, content));
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
        assert!(!temp.path().join("nested").join("1.0data.tar.lock").exists());

        let mut started = false;
        let mut completed = false;
        let mut progress = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Download(DownloadEvent::Started { component, .. }) => {
                    assert_eq!(component.as_deref(), Some("app.core"));
                    started = true;
                }
                AppEvent::Download(DownloadEvent::Progress { .. }) => progress += 1,
                AppEvent::Download(DownloadEvent::Completed { final_size, .. }) => {
                    assert_eq!(final_size, content.len() as u64);
                    completed = true;
                }
                _ => {}
            }
        }
        assert!(started && completed);
        assert!(progress >= 1);
    }

    #[tokio::test]
    async fn test_hash_mismatch_removes_file() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/bad.tar");
            then.status(200).body("corrupted");
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("bad.tar");
        let expected = Hash::from_data(HashAlgorithm::Sha256, b"original");
        let request = DownloadRequest::new(server.url("/bad.tar"), &dest).with_hash(expected);

        let err = downloader()
            .download(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::HashMismatch { .. })
        ));
        assert!(!dest.exists());
        // A damaged transfer is retried once
        assert_eq!(mock.hits(), 2);
    }

    #[tokio::test]
    async fn test_matching_hash_is_accepted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/good.tar");
            then.status(200).body("original");
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("good.tar");
        let expected = Hash::from_data(HashAlgorithm::Blake3, b"original");
        let request =
            DownloadRequest::new(server.url("/good.tar"), &dest).with_hash(expected.clone());

        let result = downloader()
            .download(&request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.hash, expected);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_once() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let temp = tempdir().unwrap();
        let request = DownloadRequest::new(server.url("/flaky"), temp.path().join("flaky"));
        let err = downloader()
            .download(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpError { status: 503, .. })
        ));
        assert_eq!(mock.hits(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("missing");
        let request = DownloadRequest::new(server.url("/missing"), &dest);
        let err = downloader()
            .download(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpError { status: 404, .. })
        ));
        assert_eq!(mock.hits(), 1);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_cancel_removes_partial_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_secs(5))
                .body("never seen");
        });

        let (tx, mut rx) = channel();
        let temp = tempdir().unwrap();
        let dest = temp.path().join("slow");
        let request = DownloadRequest::new(server.url("/slow"), &dest);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = downloader()
            .with_events(tx)
            .download(&request, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!dest.exists());
        assert!(!temp.path().join("slow.lock").exists());

        let mut saw_cancelled = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, AppEvent::Download(DownloadEvent::Cancelled { .. })) {
                saw_cancelled = true;
            }
        }
        assert!(saw_cancelled);
    }

    #[tokio::test]
    async fn test_file_and_plain_path_sources() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("repo").join("Updates.xml");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "<Updates/>").unwrap();

        let file_url = url::Url::from_file_path(&source).unwrap().to_string();
        let dest = temp.path().join("out").join("Updates.xml");
        let result = downloader()
            .download(&DownloadRequest::new(file_url, &dest), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.size, 10);

        let text = fetch_text(
            &downloader(),
            source.to_str().unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(text, "<Updates/>");
    }

    #[tokio::test]
    async fn test_resource_source() {
        let mut data = HashMap::new();
        data.insert("app.core/1.0data.tar".to_string(), vec![7u8; 200_000]);
        let downloader = downloader().with_resources(Arc::new(MapResources(data)));

        let temp = tempdir().unwrap();
        let dest = temp.path().join("embedded.tar");
        let result = downloader
            .download(
                &DownloadRequest::new("resource:/app.core/1.0data.tar", &dest),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.size, 200_000);

        let err = downloader
            .download(
                &DownloadRequest::new("resource:absent", temp.path().join("absent")),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_all_keeps_order_and_stops_on_failure() {
        let server = MockServer::start();
        for name in ["a", "b", "c"] {
            server.mock(move |when, then| {
                when.method(GET).path(format!("/{name}"));
                then.status(200).body(name);
            });
        }
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404);
        });

        let temp = tempdir().unwrap();
        let requests: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| DownloadRequest::new(server.url(format!("/{n}")), temp.path().join(n)))
            .collect();

        let results = downloader()
            .download_all(requests.clone(), &CancellationToken::new())
            .await
            .unwrap();
        let names: Vec<_> = results
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let mut failing = requests;
        failing.push(DownloadRequest::new(
            server.url("/gone"),
            temp.path().join("gone"),
        ));
        let err = downloader()
            .download_all(failing, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpError { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_streams_progress() {
        use futures::StreamExt;

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/big");
            then.status(200).body(vec![1u8; 300_000]);
        });

        let temp = tempdir().unwrap();
        let mut stream = downloader().fetch(
            DownloadRequest::new(server.url("/big"), temp.path().join("big")),
            CancellationToken::new(),
        );
        let mut last = None;
        while let Some(progress) = stream.next().await {
            last = Some(progress);
        }
        let result = stream.finish().await.unwrap();
        assert_eq!(result.size, 300_000);
        assert_eq!(last.unwrap().bytes_received, 300_000);
    }

    #[tokio::test]
    async fn test_locked_destination() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("src.bin");
        std::fs::write(&source, b"data").unwrap();
        let dest = temp.path().join("dest.bin");
        std::fs::write(temp.path().join("dest.bin.lock"), b"").unwrap();

        let err = downloader()
            .download(
                &DownloadRequest::new(source.to_str().unwrap(), &dest),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::DestinationLocked { .. })
        ));
    }

    #[tokio::test]
    async fn test_basic_auth_via_provider() {
        let server = MockServer::start();
        let authorized = server.mock(|when, then| {
            when.method(GET)
                .path("/private/Updates.xml")
                .header("authorization", "Basic dXNlcjpzZWNyZXQ=");
            then.status(200).body("<Updates/>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/private/Updates.xml");
            then.status(401)
                .header("www-authenticate", "Basic realm=\"repo\"");
        });

        let url = server.url("/private/Updates.xml");

        let anonymous = downloader();
        let err = fetch_text(&anonymous, &url, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::AuthenticationRequired { .. })
        ));

        let client = NetClient::with_defaults()
            .unwrap()
            .with_credentials(Arc::new(StaticCredentials(Credentials::new("user", "secret"))));
        let downloader = Downloader::new(client, fast_config());
        let text = fetch_text(&downloader, &url, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "<Updates/>");
        authorized.assert();
    }
}
