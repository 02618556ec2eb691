//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, Router};
use offline_sync::{
    cache::CacheStorage, create_router, App, Config, FetchError, Fetcher, InterceptedRequest,
    StoredResponse,
};
use serde_json::Value;

pub const ORIGIN: &str = "http://app.test";

// == Stub Network ==
/// In-process network: answers routed URLs, fails everything else, and can
/// be switched off entirely.
#[derive(Debug, Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, StoredResponse>>,
    hanging: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    down: AtomicBool,
}

impl StubNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, url: &str, response: StoredResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn hang(&self, url: &str) {
        self.hanging.lock().unwrap().push(url.to_string());
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for StubNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let hangs = self.hanging.lock().unwrap().contains(&url);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(FetchError::Network("network unreachable".into()));
        }
        let routed = self.routes.lock().unwrap().get(&url).cloned();
        routed.ok_or_else(|| FetchError::Network(format!("no route to {}", url)))
    }
}

// == App Helpers ==

pub fn url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

pub fn test_config() -> Config {
    Config {
        app_origin: ORIGIN.to_string(),
        ..Config::default()
    }
}

/// App over fresh in-memory storage plus its router.
pub async fn test_app(network: Arc<StubNetwork>) -> (App, Router) {
    test_app_with(network, Arc::new(CacheStorage::in_memory())).await
}

pub async fn test_app_with(network: Arc<StubNetwork>, storage: Arc<CacheStorage>) -> (App, Router) {
    let app = App::with_storage(test_config(), storage, network)
        .await
        .unwrap();
    let router = create_router(app.state());
    (app, router)
}

pub async fn body_to_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_to_bytes(body).await).unwrap()
}

pub async fn body_to_text(body: Body) -> String {
    String::from_utf8(body_to_bytes(body).await).unwrap()
}
