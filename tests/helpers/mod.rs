//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Request};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use plant_health::storage::{ObjectStore, StoreError, StoredObject};
use plant_health::vision::{ModelError, PlantModel};
use plant_health::AppState;

pub const BOUNDARY: &str = "plant-health-test-boundary";

pub const PLANT_JSON: &str = r#"{
    "name": "Fiddle Leaf Fig",
    "scientificName": "Ficus lyrata",
    "description": "Large violin-shaped leaves on an upright trunk.",
    "careInstructions": {
        "water": "When the top 5cm of soil is dry",
        "light": "Bright, filtered light",
        "soil": "Well-draining potting mix",
        "temperature": "16-24C"
    },
    "healthAssessment": {
        "status": "moderate",
        "issues": ["Brown spots on lower leaves", "Leaf drop"],
        "recommendations": ["Water less often", "Move away from drafts"]
    }
}"#;

#[derive(Debug, Clone, PartialEq)]
pub struct PutCall {
    pub pathname: String,
    pub content_type: String,
    pub size: usize,
}

/// Records every put; optionally fails.
#[derive(Default)]
pub struct FakeStore {
    pub calls: Mutex<Vec<PutCall>>,
    pub fail: bool,
    /// Overrides the URL handed back.
    pub url: Option<String>,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn returning_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PutCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StoreError> {
        self.calls.lock().unwrap().push(PutCall {
            pathname: pathname.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        if self.fail {
            return Err(StoreError::Api(503, "store unavailable".to_string()));
        }
        Ok(StoredObject {
            url: self
                .url
                .clone()
                .unwrap_or_else(|| format!("https://blob.test/{pathname}")),
            pathname: pathname.to_string(),
            content_type: Some(content_type.to_string()),
        })
    }
}

/// Replies with fixed text, or fails; records the prompts it saw.
pub struct FakeModel {
    pub reply: Result<String, u16>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl FakeModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl PlantModel for FakeModel {
    async fn complete(&self, prompt: &str, image_url: &str) -> Result<String, ModelError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), image_url.to_string()));
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ModelError::Api(*status, "upstream error".to_string())),
        }
    }
}

pub fn app_state(store: Arc<FakeStore>, model: Arc<FakeModel>) -> AppState {
    AppState::new(store, model)
}

pub fn multipart_request(parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match filename {
            Some(filename) => {
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
            }
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/plants")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
