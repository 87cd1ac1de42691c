//! Integration tests for backfill + live stream ingestion over real HTTP
//!
//! Each test serves a canned response from a local TcpListener and drives the
//! ingestion path through reqwest, the same way the binary does.

#[cfg(test)]
mod ingest_tests {
    use reqwest::StatusCode;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use wikiflow::edit_core::AggregateEntry;
    use wikiflow::ingest::{
        consume_stream, load_backfill, run_live_with_reconnect, ChannelSink, EventStream,
        ExponentialBackoff,
    };
    use wikiflow::{AggregateStore, Observation, TrackerError, USER_AGENT};

    const DOMAIN: &str = "en.wikipedia.org";

    /// Serve one connection with the given status line and body chunks, then close.
    async fn serve_once(status: &'static str, content_type: &'static str, chunks: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
                status, content_type
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            for chunk in chunks {
                socket.write_all(chunk.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            socket.shutdown().await.ok();
        });

        format!("http://{}/", addr)
    }

    /// Announce a 1000-byte body, send `body` (shorter), then close the socket.
    async fn serve_truncated(body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();

            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: 1000\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            socket.shutdown().await.ok();
        });

        format!("http://{}/", addr)
    }

    /// Local-only client; ignores any proxy configured in the environment
    fn test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .unwrap()
    }

    /// URL of a port nothing listens on
    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/", addr)
    }

    fn data_line(domain: &str, title: &str, old: i64, new: i64) -> String {
        format!(
            "data: {{\"$schema\":\"/mediawiki/recentchange/1.0.0\",\"meta\":{{\"domain\":\"{}\",\"stream\":\"mediawiki.recentchange\"}},\"type\":\"edit\",\"namespace\":0,\"title\":\"{}\",\"length\":{{\"old\":{},\"new\":{}}}}}\n",
            domain, title, old, new
        )
    }

    #[tokio::test]
    async fn test_backfill_scenario() {
        let url = serve_once(
            "200 OK",
            "application/json",
            vec![r#"[{"title":"Cat","lengthOld":100,"lengthNew":120}, {"title":"Talk:Cat","lengthOld":10,"lengthNew":5}]"#.to_string()],
        )
        .await;

        let client = test_client();
        let mut store = AggregateStore::new();
        let report = load_backfill(&client, &url, &mut store, DOMAIN).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.folded, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("Cat"),
            Some(&AggregateEntry { edit_count: 1, cumulative_abs_byte_delta: 20 })
        );
    }

    #[tokio::test]
    async fn test_backfill_non_success_status() {
        let url = serve_once("500 Internal Server Error", "text/plain", vec!["boom".to_string()]).await;

        let client = test_client();
        let mut store = AggregateStore::new();
        let err = load_backfill(&client, &url, &mut store, DOMAIN).await.unwrap_err();

        match err {
            TrackerError::Fetch { status, .. } => {
                assert_eq!(status, Some(StatusCode::INTERNAL_SERVER_ERROR))
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_backfill_wrong_shape() {
        let url = serve_once(
            "200 OK",
            "application/json",
            vec![r#"{"edits":[{"title":"Cat","lengthOld":1,"lengthNew":2}]}"#.to_string()],
        )
        .await;

        let client = test_client();
        let mut store = AggregateStore::new();
        let err = load_backfill(&client, &url, &mut store, DOMAIN).await.unwrap_err();

        assert!(matches!(err, TrackerError::Decode(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_backfill_unreachable() {
        let url = dead_url().await;

        let client = test_client();
        let mut store = AggregateStore::new();
        let err = load_backfill(&client, &url, &mut store, DOMAIN).await.unwrap_err();

        assert!(matches!(err, TrackerError::Fetch { status: None, .. }));
    }

    #[tokio::test]
    async fn test_stream_scenario() {
        let url = serve_once(
            "200 OK",
            "text/event-stream",
            vec![
                "event: message\n".to_string(),
                data_line("en.wikipedia.org", "Dog", 50, 40),
                "\n".to_string(),
                ":ok\n".to_string(),
                data_line("de.wikipedia.org", "Dog", 40, 30),
            ],
        )
        .await;

        let client = test_client();
        let mut store = AggregateStore::new();
        let (tx, mut rx) = mpsc::channel(16);
        let mut sink = ChannelSink::new(tx);

        let mut stream = EventStream::connect(&client, &url).await.unwrap();
        let report = consume_stream(&mut stream, &mut store, DOMAIN, &mut sink).await;
        drop(sink);

        assert!(matches!(report.termination, TrackerError::StreamClosed));
        assert_eq!(report.events_decoded, 2);
        assert_eq!(report.events_folded, 1);

        let mut observations = Vec::new();
        while let Some(observation) = rx.recv().await {
            observations.push(observation);
        }
        assert_eq!(
            observations,
            vec![Observation {
                title: "Dog".to_string(),
                edit_count: 1,
                cumulative_abs_byte_delta: 10,
            }]
        );
    }

    #[tokio::test]
    async fn test_stream_payload_split_across_writes() {
        let line = data_line("en.wikipedia.org", "Rust", 0, 300);
        let (head, tail) = line.split_at(25);
        let url = serve_once(
            "200 OK",
            "text/event-stream",
            vec![head.to_string(), tail.replace('\n', "\r\n")],
        )
        .await;

        let client = test_client();
        let mut stream = EventStream::connect(&client, &url).await.unwrap();

        let change = stream.next_change().await.unwrap();
        assert_eq!(change.title, "Rust");
        assert_eq!(change.length.new, 300);
        assert!(matches!(stream.next_change().await, Err(TrackerError::StreamClosed)));
    }

    #[tokio::test]
    async fn test_stream_truncated_body_is_stream_error() {
        let url = serve_truncated(data_line("en.wikipedia.org", "Cat", 10, 4)).await;

        let client = test_client();
        let mut store = AggregateStore::new();
        let (tx, _rx) = mpsc::channel(16);
        let mut sink = ChannelSink::new(tx);

        let mut stream = EventStream::connect(&client, &url).await.unwrap();
        let report = consume_stream(&mut stream, &mut store, DOMAIN, &mut sink).await;

        assert_eq!(report.events_folded, 1);
        assert_eq!(
            store.get("Cat"),
            Some(&AggregateEntry { edit_count: 1, cumulative_abs_byte_delta: 6 })
        );
        assert!(matches!(report.termination, TrackerError::Stream(_)));
        assert!(report.termination.is_terminal());
    }

    #[tokio::test]
    async fn test_stream_connect_status() {
        let url = serve_once("503 Service Unavailable", "text/plain", vec![]).await;

        let client = test_client();
        let err = EventStream::connect(&client, &url).await.err().unwrap();

        match err {
            TrackerError::Connect { status, .. } => {
                assert_eq!(status, Some(StatusCode::SERVICE_UNAVAILABLE))
            }
            other => panic!("expected connect error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_connect_refused() {
        let url = dead_url().await;

        let client = test_client();
        let err = EventStream::connect(&client, &url).await.err().unwrap();

        assert!(matches!(err, TrackerError::Connect { status: None, .. }));
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn test_backfill_seeds_live_counts() {
        let backfill_url = serve_once(
            "200 OK",
            "application/json",
            vec![r#"[{"title":"Dog","lengthOld":10,"lengthNew":30},{"title":"Dog","lengthOld":30,"lengthNew":25}]"#.to_string()],
        )
        .await;
        let stream_url = serve_once(
            "200 OK",
            "text/event-stream",
            vec![data_line("en.wikipedia.org", "Dog", 25, 20)],
        )
        .await;

        let client = test_client();
        let mut store = AggregateStore::new();
        load_backfill(&client, &backfill_url, &mut store, DOMAIN).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let mut sink = ChannelSink::new(tx);
        let mut backoff = ExponentialBackoff::new(1, 1, 0);
        let report = run_live_with_reconnect(
            &client,
            &stream_url,
            &mut store,
            DOMAIN,
            &mut sink,
            &mut backoff,
        )
        .await;

        assert_eq!(report.connections, 1);
        assert_eq!(report.events_folded, 1);
        assert!(matches!(report.termination, TrackerError::StreamClosed));
        assert_eq!(
            rx.recv().await,
            Some(Observation {
                title: "Dog".to_string(),
                edit_count: 3,
                cumulative_abs_byte_delta: 30,
            })
        );
    }

    #[tokio::test]
    async fn test_supervisor_gives_up_without_retries() {
        let url = dead_url().await;

        let client = test_client();
        let mut store = AggregateStore::new();
        let (tx, _rx) = mpsc::channel(1);
        let mut sink = ChannelSink::new(tx);
        let mut backoff = ExponentialBackoff::new(1, 1, 0);

        let report =
            run_live_with_reconnect(&client, &url, &mut store, DOMAIN, &mut sink, &mut backoff).await;

        assert_eq!(report.connections, 0);
        assert!(matches!(report.termination, TrackerError::Connect { .. }));
    }
}
