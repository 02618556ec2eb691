//! Network Module
//!
//! Request and response snapshots plus the `Fetcher` seam every strategy
//! goes through to reach the network.

mod fetcher;
mod request;
mod response;

pub use fetcher::{Fetcher, HttpFetcher};
pub use request::{Destination, InterceptedRequest, RequestKey};
pub use response::StoredResponse;

#[cfg(test)]
pub(crate) mod testing;
