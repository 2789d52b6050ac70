use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use vacancy_engine::{FailureKind, FetchSettings, Fetcher, ReqwestFetcher};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(settings: FetchSettings) -> ReqwestFetcher {
    ReqwestFetcher::new(settings).expect("client")
}

const CHUNK: usize = 1024;

async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// Serve one chunked response without a Content-Length header.
///
/// Sends `chunks` chunks of `CHUNK` bytes. With `stall_after_first`, the
/// sender fires after the first chunk and the connection then hangs open.
async fn chunked_server(
    chunks: usize,
    stall_after_first: Option<oneshot::Sender<()>>,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        read_request_head(&mut socket).await;
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let mut first_sent = stall_after_first;
        for _ in 0..chunks {
            let mut frame = format!("{CHUNK:x}\r\n").into_bytes();
            frame.extend(std::iter::repeat(b'a').take(CHUNK));
            frame.extend_from_slice(b"\r\n");
            if socket.write_all(&frame).await.is_err() {
                return;
            }
            if let Some(signal) = first_sent.take() {
                let _ = signal.send(());
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });
    format!("http://{addr}/stream")
}

#[tokio::test]
async fn fetcher_returns_decoded_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .and(header_exists("user-agent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/doc", server.uri());
    let html = fetcher(FetchSettings::default())
        .fetch(&url, &CancellationToken::new())
        .await
        .expect("fetch ok");
    assert_eq!(html, "<html>ok</html>");
}

#[tokio::test]
async fn fetcher_uses_declared_charset() {
    let server = MockServer::start().await;
    // "Тест" in windows-1251
    let body: Vec<u8> = vec![0xD2, 0xE5, 0xF1, 0xF2];
    Mock::given(method("GET"))
        .and(path("/cp1251"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=windows-1251"))
        .mount(&server)
        .await;

    let url = format!("{}/cp1251", server.uri());
    let html = fetcher(FetchSettings::default())
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(html, "Тест");
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'o', b'k', 0xFF], "text/html"))
        .mount(&server)
        .await;

    let url = format!("{}/broken", server.uri());
    let html = fetcher(FetchSettings::default())
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(html, "ok\u{FFFD}");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    let err = fetcher(FetchSettings::default())
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_rejects_declared_length_over_ceiling() {
    let server = MockServer::start().await;
    let ten_mib = 10 * 1024 * 1024;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'a'; ten_mib], "text/html"))
        .mount(&server)
        .await;

    let url = format!("{}/large", server.uri());
    let err = fetcher(FetchSettings::default())
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 5 * 1024 * 1024,
            actual: Some(ten_mib as u64)
        }
    );
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let url = format!("{}/slow", server.uri());
    let err = fetcher(settings)
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn cancellation_is_reported_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hang"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_string("late"),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let url = format!("{}/hang", server.uri());
    let err = fetcher(FetchSettings::default())
        .fetch(&url, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn invalid_url_is_rejected() {
    let err = fetcher(FetchSettings::default())
        .fetch("not a url", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn undeclared_length_stops_once_ceiling_is_passed() {
    let url = chunked_server(100, None).await;
    let max_bytes = 10 * CHUNK as u64;
    let settings = FetchSettings {
        max_bytes,
        ..FetchSettings::default()
    };

    let err = fetcher(settings)
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap_err();
    let (limit, actual) = match err.kind {
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        } => (max_bytes, actual),
        other => panic!("expected TooLarge, got {other:?}"),
    };
    assert_eq!(limit, max_bytes);
    assert!(actual > max_bytes, "read {actual} bytes");
    assert!(actual <= max_bytes + CHUNK as u64, "read {actual} bytes");
}

#[tokio::test]
async fn cancellation_during_body_read_is_reported() {
    let (first_sent, first_received) = oneshot::channel();
    let url = chunked_server(2, Some(first_sent)).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        let _ = first_received.await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = fetcher(FetchSettings::default())
        .fetch(&url, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
}
