//! Strategy Module
//!
//! Per-request caching strategies and the interception entry point.
//!
//! # Strategies
//! - Cache-first with background refresh: static assets
//! - Network-first with timeout and fallback: API data and everything unclassified
//! - Stale-while-revalidate with offline page: app pages
//!
//! Every strategy terminates in a concrete response (cached, network, or a
//! synthetic fallback); none of them can fail.

mod cache_first;
mod classifier;
mod engine;
mod network_first;
mod stale_revalidate;

use serde::Serialize;

use crate::net::StoredResponse;

pub use classifier::{Classifier, RequestClass};
pub use engine::{Interception, StrategyEngine};

/// Caching strategy applied to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn for_class(class: RequestClass) -> Self {
        match class {
            RequestClass::Api | RequestClass::Other => Strategy::NetworkFirst,
            RequestClass::StaticAsset => Strategy::CacheFirst,
            RequestClass::Page => Strategy::StaleWhileRevalidate,
        }
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Fallback => "fallback",
        }
    }
}

/// A strategy's answer.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: StoredResponse,
    pub source: ResponseSource,
}

impl Served {
    pub fn network(response: StoredResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
        }
    }

    pub fn cache(response: StoredResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
        }
    }

    pub fn fallback(response: StoredResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Fallback,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_for_class() {
        assert_eq!(Strategy::for_class(RequestClass::Api), Strategy::NetworkFirst);
        assert_eq!(Strategy::for_class(RequestClass::Other), Strategy::NetworkFirst);
        assert_eq!(
            Strategy::for_class(RequestClass::StaticAsset),
            Strategy::CacheFirst
        );
        assert_eq!(
            Strategy::for_class(RequestClass::Page),
            Strategy::StaleWhileRevalidate
        );
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ResponseSource::Fallback).unwrap(),
            "\"fallback\""
        );
    }
}
