//! Client tests against a one-shot HTTP responder on a local socket.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use pitchside_core::{
  attempt::AttemptRecord,
  gateway::{LinkCheck, LinkValidator, SyncRemote},
};
use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  net::TcpListener,
  task::JoinHandle,
};
use uuid::Uuid;

use crate::{Error, RemoteClient, RemoteConfig};

/// Serve exactly one request with `status` and `body`; the task yields the
/// raw request text.
async fn respond_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let base = format!("http://{}", listener.local_addr().unwrap());

  let task = tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
      let n = socket.read(&mut buf).await.unwrap();
      request.extend_from_slice(&buf[..n]);
      let text = String::from_utf8_lossy(&request).to_string();
      if let Some(split) = text.find("\r\n\r\n") {
        let length = text[..split]
          .lines()
          .find_map(|line| line.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_owned()))
          .and_then(|v| v.parse::<usize>().ok())
          .unwrap_or(0);
        if request.len() >= split + 4 + length {
          break;
        }
      }
      if n == 0 {
        break;
      }
    }

    let response = format!(
      "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
      body.len()
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.unwrap();
    String::from_utf8_lossy(&request).to_string()
  });

  (base, task)
}

fn client(base: &str, api_key: Option<&str>) -> RemoteClient {
  RemoteClient::new(RemoteConfig {
    base_url: base.to_owned(),
    api_key:  api_key.map(str::to_owned),
    timeout:  Duration::from_secs(5),
  })
  .unwrap()
}

fn finished_attempt() -> AttemptRecord {
  let started_at = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();
  AttemptRecord {
    id: Uuid::new_v4(),
    puzzle_id: "recall-istanbul".into(),
    completed: true,
    score: Some(17),
    score_display: Some("5/5".into()),
    metadata: "{}".into(),
    started_at,
    completed_at: Some(started_at + chrono::Duration::seconds(75)),
    synced: false,
    revision: 6,
  }
}

// ─── Construction ────────────────────────────────────────────────────────────

#[test]
fn urls_tolerate_trailing_slashes() {
  let c = client("https://pitchside.example/", None);
  assert_eq!(c.url("/links"), "https://pitchside.example/api/links");
  assert_eq!(c.config().timeout, Duration::from_secs(5));
}

#[test]
fn base_url_must_be_http() {
  let err = RemoteClient::new(RemoteConfig::new("pitchside.example")).err().unwrap();
  assert!(matches!(err, Error::Url(url) if url == "pitchside.example"));
}

#[test]
fn link_check_reads_camel_case() {
  let check: LinkCheck = serde_json::from_str(
    r#"{"isLinked":true,"sharedContextName":"Liverpool","sharedContextId":"club-liv","overlapStart":2005,"overlapEnd":2009}"#,
  )
  .unwrap();
  assert!(check.is_linked);
  assert_eq!(check.shared_context_name.as_deref(), Some("Liverpool"));
  assert_eq!(check.overlap_end, Some(2009));

  let negative: LinkCheck = serde_json::from_str(
    r#"{"isLinked":false,"sharedContextName":null,"sharedContextId":null,"overlapStart":null,"overlapEnd":null}"#,
  )
  .unwrap();
  assert_eq!(negative, LinkCheck::default());
}

// ─── Round trips ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn check_linked_sends_both_players_and_token() {
  let (base, server) = respond_once(
    "200 OK",
    r#"{"isLinked":true,"sharedContextName":"Liverpool","sharedContextId":"club-liv","overlapStart":2005,"overlapEnd":2006}"#,
  )
  .await;

  let check = client(&base, Some("s3cret")).check_linked("crouch", "alonso").await.unwrap();
  assert!(check.is_linked);
  assert_eq!(check.overlap_start, Some(2005));

  let request = server.await.unwrap();
  assert!(request.starts_with("GET /api/links?a=crouch&b=alonso "));
  assert!(request.to_ascii_lowercase().contains("authorization: bearer s3cret"));
}

#[tokio::test]
async fn push_attempt_posts_the_record() {
  let (base, server) = respond_once("201 Created", "{}").await;
  let record = finished_attempt();

  client(&base, None).push_attempt(&record).await.unwrap();

  let request = server.await.unwrap();
  assert!(request.starts_with("POST /api/attempts "));
  assert!(!request.to_ascii_lowercase().contains("authorization:"));
  assert!(request.contains(&format!("\"id\":\"{}\"", record.id)));
  assert!(request.contains("\"scoreDisplay\":\"5/5\""));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
  let (base, server) = respond_once("503 Service Unavailable", r#"{"error":"maintenance"}"#).await;

  let err = client(&base, None).check_linked("crouch", "kaka").await.unwrap_err();
  assert!(matches!(err, Error::Status(503, ref body) if body.contains("maintenance")));
  server.await.unwrap();
}
