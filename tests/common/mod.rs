//! Shared helpers for router tests: an in-memory store and request plumbing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt; // For oneshot()

use events_api::config::Config;
use events_api::models::{Event, EventChanges, PageRequest};
use events_api::routes::create_routes;
use events_api::state::AppState;
use events_api::store::{EventStore, Result, StoreError, UpdateOutcome};

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
    failing: AtomicBool,
    failing_writes: AtomicBool,
    deleted_during_update: AtomicBool,
}

impl MemoryEventStore {
    /// Makes every following call fail as if the database were unreachable.
    pub fn fail_requests(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Reads keep working; inserts, updates and deletes fail.
    pub fn fail_writes(&self) {
        self.failing_writes.store(true, Ordering::SeqCst);
    }

    /// The next update finds its document already deleted by another request.
    pub fn delete_during_update(&self) {
        self.deleted_during_update.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<()> {
        self.check()?;
        if self.failing_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("write interrupted".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: &Event) -> Result<()> {
        self.check_write()?;
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Event>> {
        self.check()?;
        let events = self.events.lock().unwrap();
        Ok(events.iter().find(|e| e.id == *id).cloned())
    }

    async fn list_latest(&self, page: &PageRequest) -> Result<Vec<Event>> {
        self.check()?;
        let mut events = self.events.lock().unwrap().clone();
        events.sort_by(|a, b| b.schedule.cmp(&a.schedule));
        Ok(events
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn update(&self, id: &ObjectId, changes: &EventChanges) -> Result<UpdateOutcome> {
        self.check_write()?;
        let mut events = self.events.lock().unwrap();
        if self.deleted_during_update.swap(false, Ordering::SeqCst) {
            events.retain(|e| e.id != *id);
        }
        match events.iter_mut().find(|e| e.id == *id) {
            Some(event) => {
                changes.apply_to(event);
                Ok(UpdateOutcome {
                    matched: 1,
                    modified: 1,
                })
            }
            None => Ok(UpdateOutcome::default()),
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<u64> {
        self.check_write()?;
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != *id);
        Ok((before - events.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryEventStore>,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    pub fn with_vars(vars: &[(&str, &str)]) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let upload_path = upload_dir.path().to_string_lossy().into_owned();

        let config = Config::from_lookup(|name| match name {
            "MONGODB_URI" => Some("mongodb://localhost:27017".to_string()),
            "UPLOAD_DIR" => Some(upload_path.clone()),
            other => vars
                .iter()
                .find(|(k, _)| *k == other)
                .map(|(_, v)| v.to_string()),
        })
        .unwrap();

        let store = Arc::new(MemoryEventStore::default());
        let state = AppState::new(store.clone(), &config);

        Self {
            router: create_routes(state, &config),
            store,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Names of the files currently in the upload directory.
    pub fn uploaded_files(&self) -> Vec<String> {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Creates an event through the API and returns its id.
    pub async fn create(&self, body: Value) -> String {
        let (status, body) = self.json("POST", EVENTS, body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

pub const EVENTS: &str = "/api/v3/app/events";

pub const BOUNDARY: &str = "events-test-boundary";

/// A multipart body of text parts plus an optional `image` file part.
pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
