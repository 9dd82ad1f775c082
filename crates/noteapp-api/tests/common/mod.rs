//! Shared helpers for router tests over the in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use noteapp_api::{config::parse_allowed_origins, router, AppState};
use noteapp_core::InMemoryStore;

/// Router plus a handle on the store behind it.
pub struct TestApp {
    pub router: Router,
    pub store: InMemoryStore,
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), Arc::new(store.clone()));
        Self {
            router: router(state, parse_allowed_origins(None)),
            store,
        }
    }

    /// Send one request and return the status and raw body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    /// Send a request and parse the body as JSON.
    ///
    /// Plain-text bodies (error responses) come back as `Value::String`.
    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Send a request and read the body as text.
    pub async fn send_text(&self, method: Method, uri: &str) -> (StatusCode, String) {
        let (status, bytes) = self.send(method, uri, None).await;
        (status, String::from_utf8(bytes).unwrap())
    }

    /// Create a category through the API and return its id.
    pub async fn create_category(&self, name: &str) -> String {
        let (status, body) = self
            .send_json(
                Method::POST,
                "/categories",
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    /// Create a note through the API and return the response body.
    pub async fn create_note(&self, title: &str, category_ids: &[&str]) -> Value {
        let (status, body) = self
            .send_json(
                Method::POST,
                "/notes",
                Some(serde_json::json!({
                    "title": title,
                    "content": format!("{} body", title),
                    "categoryIds": category_ids,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }
}

/// Ids of the notes in a JSON list response.
pub fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_string())
        .collect()
}

/// Category ids of a note in a JSON response.
pub fn category_ids(note: &Value) -> Vec<String> {
    note["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}
