//! Integration tests for the API client.
//!
//! These tests run a minimal HTTP server on a local socket that answers each
//! connection with a canned response and records the request line.

#![allow(clippy::unwrap_used)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

use mailfang_api::{ApiClient, Error};

/// Local server answering one canned response per connection, in order.
struct MockServer {
    url: Url,
    requests: mpsc::UnboundedReceiver<String>,
}

impl MockServer {
    async fn start(responses: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                let head = String::from_utf8_lossy(&head);
                let request_line = head.lines().next().unwrap_or_default().to_string();
                let _ = tx.send(request_line);
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        Self {
            url: Url::parse(&format!("http://{addr}")).unwrap(),
            requests,
        }
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(self.url.clone())
    }

    async fn request_line(&mut self) -> String {
        self.requests.recv().await.unwrap()
    }
}

fn respond(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn json(body: &str) -> String {
    respond("200 OK", "application/json", body)
}

fn no_content() -> String {
    "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_string()
}

const LIST: &str = r#"{
    "emails": [{
        "id": "m1",
        "subject": "=?UTF-8?B?SGVsbG8=?=",
        "date": "2024-05-01T10:30:00",
        "created_at": "2024-05-01T10:30:01",
        "from": "sender@example.com",
        "recipients": ["a@x.com"],
        "read": false,
        "has_attachments": true
    }],
    "counts": {"inbox": 1, "unread": 1, "recipients": [{"recipient": "a@x.com", "count": 1}]},
    "pagination": {"page": 1, "per_page": 50, "total_pages": 1}
}"#;

const EMPTY_LIST: &str = r#"{
    "emails": [],
    "counts": {"inbox": 0, "unread": 0, "recipients": []},
    "pagination": {"page": 1, "per_page": 50, "total_pages": 0}
}"#;

#[tokio::test]
async fn test_inbox() {
    let mut server = MockServer::start(vec![json(LIST)]).await;

    let page = server.client().inbox(1, None).await.unwrap().unwrap();

    assert_eq!(server.request_line().await, "GET /api/emails?page=1 HTTP/1.1");
    assert_eq!(page.emails.len(), 1);
    assert_eq!(page.emails[0].decoded_subject().as_deref(), Some("Hello"));
    assert!(page.emails[0].has_attachments);
    assert_eq!(page.counts.unread, 1);
    assert_eq!(page.pagination.per_page, 50);
}

#[tokio::test]
async fn test_list_variants_and_search() {
    let mut server = MockServer::start(vec![json(LIST), json(LIST), json(LIST)]).await;
    let client = server.client();

    client.unread(2, Some("a&b")).await.unwrap();
    assert_eq!(
        server.request_line().await,
        "GET /api/emails/unread?page=2&search=a%26b HTTP/1.1"
    );

    client.with_attachments(1, Some("")).await.unwrap();
    assert_eq!(
        server.request_line().await,
        "GET /api/emails/with-attachments?page=1 HTTP/1.1"
    );

    client
        .inbox_for_recipient("a@x.com", 3, Some("report"))
        .await
        .unwrap();
    assert_eq!(
        server.request_line().await,
        "GET /api/emails/inbox/a@x.com?page=3&search=report HTTP/1.1"
    );
}

#[tokio::test]
async fn test_sidebar_and_counts() {
    let body = r#"{"inbox": 4, "unread": 2, "recipients": [{"recipient": "b@y.com", "count": 4}]}"#;
    let mut server = MockServer::start(vec![json(body), json(r#"{"inbox": 4, "recipients": []}"#)]).await;
    let client = server.client();

    let sidebar = client.sidebar().await.unwrap().unwrap();
    assert_eq!(server.request_line().await, "GET /api/emails/sidebar HTTP/1.1");
    assert_eq!(sidebar.inbox, 4);
    assert_eq!(sidebar.recipients[0].count, 4);

    let counts = client.counts().await.unwrap().unwrap();
    assert_eq!(server.request_line().await, "GET /api/counts HTTP/1.1");
    assert_eq!(counts.unread, 0);
}

#[tokio::test]
async fn test_email() {
    let body = r#"{
        "id": "m1",
        "message_id": null,
        "subject": "Hi",
        "date": null,
        "headers": {"To": ["\"Doe, John\" <john@example.com>, jane@example.com"]},
        "created_at": "2024-05-01T10:30:01",
        "from": "sender@example.com",
        "recipients": ["john@example.com", "jane@example.com"],
        "size": 512,
        "body_text": "hello",
        "body_html": null,
        "read": true,
        "attachments": []
    }"#;
    let mut server = MockServer::start(vec![json(body)]).await;

    let email = server.client().email("m1").await.unwrap().unwrap();

    assert_eq!(server.request_line().await, "GET /api/emails/m1 HTTP/1.1");
    assert!(email.read);
    assert_eq!(
        email.header_addresses("to"),
        ["\"Doe, John\" <john@example.com>", "jane@example.com"]
    );
}

#[tokio::test]
async fn test_first_email() {
    let mut server = MockServer::start(vec![json(LIST), json(EMPTY_LIST)]).await;
    let client = server.client();

    let first = client.first_email().await.unwrap();
    assert_eq!(first.map(|e| e.id).as_deref(), Some("m1"));
    assert_eq!(server.request_line().await, "GET /api/emails?page=1 HTTP/1.1");

    assert!(client.first_email().await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_no_content() {
    let zero_length = respond("200 OK", "text/plain", "");
    let mut server = MockServer::start(vec![no_content(), zero_length]).await;
    let client = server.client();

    client.delete_email("m1").await.unwrap();
    assert_eq!(server.request_line().await, "DELETE /api/emails/m1 HTTP/1.1");

    client.delete_all().await.unwrap();
    assert_eq!(server.request_line().await, "DELETE /api/emails HTTP/1.1");
}

#[tokio::test]
async fn test_json_endpoint_with_no_content() {
    let zero_length = respond("200 OK", "application/json", "");
    let mut server = MockServer::start(vec![no_content(), zero_length, no_content()]).await;
    let client = server.client();

    assert_eq!(client.sidebar().await.unwrap(), None);
    assert_eq!(server.request_line().await, "GET /api/emails/sidebar HTTP/1.1");

    assert_eq!(client.email("m1").await.unwrap(), None);
    assert_eq!(server.request_line().await, "GET /api/emails/m1 HTTP/1.1");

    assert!(client.first_email().await.unwrap().is_none());
}

#[tokio::test]
async fn test_status_errors() {
    let server = MockServer::start(vec![
        respond("404 Not Found", "text/plain", "missing"),
        respond("500 Internal Server Error", "text/plain", "boom"),
    ])
    .await;
    let client = server.client();

    let err = client.email("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "API request failed: Not Found");

    let err = client.delete_all().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Status { status: 500, ref reason } if reason == "Internal Server Error"
    ));
}

#[tokio::test]
async fn test_malformed_json() {
    let server = MockServer::start(vec![json("{not json")]).await;

    let err = server.client().inbox(1, None).await.unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn test_raw_and_rendered() {
    let raw = "From: a@x.com\r\nSubject: Hi\r\n\r\nbody";
    let html = "<p>hello</p>";
    let mut server = MockServer::start(vec![
        respond("200 OK", "message/rfc822", raw),
        respond("200 OK", "text/html", html),
        respond("200 OK", "text/html", html),
    ])
    .await;
    let client = server.client();

    assert_eq!(client.raw_email("m1").await.unwrap(), raw);
    assert_eq!(server.request_line().await, "GET /api/emails/m1/raw HTTP/1.1");

    assert_eq!(client.rendered_email("m1", false).await.unwrap(), html);
    assert_eq!(
        server.request_line().await,
        "GET /api/emails/m1/rendered?allow_remote_content=false HTTP/1.1"
    );

    client.rendered_email("m1", true).await.unwrap();
    assert_eq!(
        server.request_line().await,
        "GET /api/emails/m1/rendered?allow_remote_content=true HTTP/1.1"
    );
}
