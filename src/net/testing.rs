//! Scripted fetcher for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Fetcher, InterceptedRequest, StoredResponse};
use crate::error::FetchError;

/// How the fetcher answers a given URL.
#[derive(Debug, Clone)]
pub enum Script {
    Respond(StoredResponse),
    Delayed(Duration, StoredResponse),
    Fail,
    Hang,
}

/// Answers each URL according to its script; unscripted URLs fail.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, response: StoredResponse) -> Self {
        self.set(url, Script::Respond(response));
        self
    }

    pub fn ok(self, url: &str, body: &str) -> Self {
        self.respond(url, StoredResponse::new(200, body))
    }

    pub fn hang(self, url: &str) -> Self {
        self.set(url, Script::Hang);
        self
    }

    pub fn set(&self, url: &str, script: Script) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());
        let script = self.routes.lock().unwrap().get(&url).cloned();

        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Fail) | None => Err(FetchError::Network(format!("unreachable: {url}"))),
        }
    }
}
