//! GeoJSON decoding for the FDSN event feed.
//!
//! The wire structs below mirror only the fields the pipeline reads;
//! everything else in the response is ignored. Decoding fails fast with
//! [`QuakeError::Decode`] when a required field is missing or mistyped.

use crate::error::{QuakeError, QuakeResult};
use crate::models::{EventRecord, EventSet, Location};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    metadata: FeedMetadata,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct FeedMetadata {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Properties {
    mag: f64,
    time: i64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[longitude, latitude, depth]`
    coordinates: Vec<f64>,
}

/// Decode a GeoJSON response body into an [`EventSet`].
pub fn decode_event_set(body: &str) -> QuakeResult<EventSet> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| QuakeError::Decode(e.to_string()))?;

    let events = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| to_record(index, feature))
        .collect::<QuakeResult<Vec<_>>>()?;

    let set = EventSet::new(collection.metadata.count, events);
    if !set.count_matches() {
        warn!(
            "Feed declared {} events but contained {}",
            set.declared_count,
            set.len()
        );
    }
    debug!("Decoded {} events", set.len());

    Ok(set)
}

fn to_record(index: usize, feature: Feature) -> QuakeResult<EventRecord> {
    let coords = &feature.geometry.coordinates;
    if coords.len() < 2 {
        return Err(QuakeError::Decode(format!(
            "feature {} has {} coordinate(s), expected at least 2",
            index,
            coords.len()
        )));
    }

    let time_ms = feature.properties.time;
    if DateTime::<Utc>::from_timestamp_millis(time_ms).is_none() {
        return Err(QuakeError::Decode(format!(
            "feature {} has out-of-range time {}",
            index, time_ms
        )));
    }

    Ok(EventRecord {
        time_ms,
        magnitude: feature.properties.mag,
        location: Location::new(coords[0], coords[1]),
    })
}
