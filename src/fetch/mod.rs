//! Event retrieval.
//!
//! Events come either from the live FDSN service or from a GeoJSON file
//! saved by an earlier run; both go through the same decoder.

pub mod client;
pub mod geojson;

pub use client::{EventFetcher, FetchConfig};
pub use geojson::decode_event_set;

use crate::error::QuakeResult;
use crate::models::EventSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the events for a run come from.
pub enum EventSource {
    Remote(EventFetcher),
    File(PathBuf),
}

impl EventSource {
    /// Human-readable origin, recorded in the summary metadata.
    pub fn describe(&self) -> String {
        match self {
            EventSource::Remote(fetcher) => fetcher.endpoint().to_string(),
            EventSource::File(path) => path.display().to_string(),
        }
    }

    /// Load and decode the event set.
    ///
    /// When `save_response` is set, the raw body received from the service
    /// is written there before decoding.
    pub async fn load(&self, save_response: Option<&Path>) -> QuakeResult<EventSet> {
        let body = match self {
            EventSource::Remote(fetcher) => {
                let body = fetcher.fetch_body().await?;
                if let Some(path) = save_response {
                    tokio::fs::write(path, &body).await?;
                    info!("Saved raw response to {}", path.display());
                }
                body
            }
            EventSource::File(path) => {
                info!("Reading events from {}", path.display());
                tokio::fs::read_to_string(path).await?
            }
        };

        decode_event_set(&body)
    }
}
