//! Event aggregation and statistics.
//!
//! This module turns a decoded [`EventSet`] into the figures the reporters
//! show: the declared total, the strongest event(s) and per-year counts
//! and average magnitudes.

use crate::config::AnalysisConfig;
use crate::error::{QuakeError, QuakeResult};
use crate::models::{
    Analysis, EventRecord, EventSet, MaxMagnitudeResult, MaxSeed, YearBucket, YearStat, YearZone,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Run every aggregation over a decoded event set.
///
/// A set with no events fails with [`QuakeError::EmptyData`], so nothing is
/// reported for a query that matched nothing.
pub fn analyze(set: &EventSet, config: &AnalysisConfig) -> QuakeResult<Analysis> {
    if set.is_empty() {
        return Err(QuakeError::EmptyData);
    }

    let total_count = count_events(set);
    let strongest = max_magnitude(set, config.max_seed);
    let years = summarize_years(set, config.year_zone);
    debug!(
        "Strongest magnitude {} shared by {} event(s) across {} year(s)",
        strongest.max_magnitude,
        strongest.tie_count(),
        years.len()
    );

    if strongest.locations.is_empty() {
        warn!(
            "No event reached the search seed of {}; strongest magnitude is degenerate",
            strongest.max_magnitude
        );
    }

    Ok(Analysis {
        total_count,
        strongest,
        years,
    })
}

/// Total number of events, as declared by the provider.
///
/// This is the response's `metadata.count`, not the length of the event list.
pub fn count_events(set: &EventSet) -> u64 {
    set.declared_count
}

/// Find the strongest magnitude and the location of every event sharing it.
///
/// The running maximum starts at `seed.initial()`. With [`MaxSeed::Zero`] a
/// set whose magnitudes are all negative reports 0.0 and no locations; an
/// empty set reports the seed value and no locations. Ties are compared with
/// exact floating-point equality.
pub fn max_magnitude(set: &EventSet, seed: MaxSeed) -> MaxMagnitudeResult {
    let mut max = seed.initial();
    for event in &set.events {
        if event.magnitude >= max {
            max = event.magnitude;
        }
    }

    let locations = set
        .events
        .iter()
        .filter(|e| e.magnitude == max)
        .map(|e| e.location)
        .collect();

    MaxMagnitudeResult {
        max_magnitude: max,
        locations,
    }
}

/// Partition magnitudes by calendar year.
///
/// Buckets are sorted by year; magnitudes keep their input order.
pub fn group_by_year(set: &EventSet, zone: YearZone) -> Vec<YearBucket> {
    let mut grouped: BTreeMap<i32, Vec<f64>> = BTreeMap::new();

    for event in &set.events {
        grouped
            .entry(event.year(zone))
            .or_default()
            .push(event.magnitude);
    }

    grouped
        .into_iter()
        .map(|(year, magnitudes)| YearBucket { year, magnitudes })
        .collect()
}

/// Event counts of each bucket, in bucket order.
pub fn bucket_sizes(buckets: &[YearBucket]) -> Vec<usize> {
    buckets.iter().map(YearBucket::count).collect()
}

/// Mean magnitude of each year.
///
/// Events are stably sorted by time and cut into consecutive slices whose
/// lengths are `bucket_sizes`; each slice's mean is returned in order. Sizes
/// that run past the end of the events yield shorter (possibly empty)
/// slices, and an empty slice averages to `NaN`.
pub fn average_magnitude_per_year(set: &EventSet, bucket_sizes: &[usize]) -> Vec<f64> {
    let mut sorted: Vec<&EventRecord> = set.events.iter().collect();
    sorted.sort_by_key(|e| e.time_ms);

    let mut averages = Vec::with_capacity(bucket_sizes.len());
    let mut start = 0;
    for &size in bucket_sizes {
        let end = (start + size).min(sorted.len());
        let slice = &sorted[start.min(end)..end];
        averages.push(mean(slice.iter().map(|e| e.magnitude)));
        start = end;
    }

    averages
}

/// Combine buckets and their averages into chart rows.
pub fn year_stats(buckets: &[YearBucket], averages: &[f64]) -> Vec<YearStat> {
    buckets
        .iter()
        .zip(averages)
        .map(|(bucket, &average)| YearStat {
            year: bucket.year,
            count: bucket.count(),
            average_magnitude: average,
        })
        .collect()
}

/// Group, average and tabulate in one step.
pub fn summarize_years(set: &EventSet, zone: YearZone) -> Vec<YearStat> {
    let buckets = group_by_year(set, zone);
    let averages = average_magnitude_per_year(set, &bucket_sizes(&buckets));
    year_stats(&buckets, &averages)
}

/// Round for display.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::decode_event_set;
    use crate::models::Location;

    const YEAR_2010: i64 = 1_262_304_000_000; // 2010-01-01T00:00:00Z
    const YEAR_2011: i64 = 1_293_840_000_000; // 2011-01-01T00:00:00Z
    const DAY: i64 = 86_400_000;

    fn event(time_ms: i64, magnitude: f64, lon: f64, lat: f64) -> EventRecord {
        EventRecord {
            time_ms,
            magnitude,
            location: Location::new(lon, lat),
        }
    }

    fn tie_set() -> EventSet {
        EventSet::new(
            3,
            vec![
                event(YEAR_2010, 2.0, -1.0, 55.0),
                event(YEAR_2010 + DAY, 4.5, -2.0, 56.0),
                event(YEAR_2010 + 2 * DAY, 4.5, -3.0, 57.0),
            ],
        )
    }

    fn two_year_set() -> EventSet {
        EventSet::new(
            3,
            vec![
                event(YEAR_2010 + DAY, 3.0, 0.0, 51.0),
                event(YEAR_2010 + 2 * DAY, 5.0, 0.0, 52.0),
                event(YEAR_2011 + DAY, 2.0, 0.0, 53.0),
            ],
        )
    }

    #[test]
    fn test_count_events_uses_declared_count() {
        assert_eq!(count_events(&tie_set()), 3);

        let mut set = tie_set();
        set.declared_count = 10;
        assert_eq!(count_events(&set), 10);

        assert_eq!(count_events(&EventSet::default()), 0);
    }

    #[test]
    fn test_max_magnitude_ties() {
        let result = max_magnitude(&tie_set(), MaxSeed::Zero);
        assert_eq!(result.max_magnitude, 4.5);
        assert_eq!(
            result.locations,
            vec![Location::new(-2.0, 56.0), Location::new(-3.0, 57.0)]
        );
        assert_eq!(result.tie_count(), 2);
    }

    #[test]
    fn test_max_magnitude_single() {
        let mut set = tie_set();
        set.events[2].magnitude = 4.4;
        let result = max_magnitude(&set, MaxSeed::Zero);
        assert_eq!(result.max_magnitude, 4.5);
        assert_eq!(result.locations, vec![Location::new(-2.0, 56.0)]);
    }

    #[test]
    fn test_max_magnitude_idempotent() {
        let set = tie_set();
        assert_eq!(
            max_magnitude(&set, MaxSeed::Zero),
            max_magnitude(&set, MaxSeed::Zero)
        );
    }

    #[test]
    fn test_max_magnitude_empty_set() {
        let result = max_magnitude(&EventSet::default(), MaxSeed::Zero);
        assert_eq!(result.max_magnitude, 0.0);
        assert!(result.locations.is_empty());

        let result = max_magnitude(&EventSet::default(), MaxSeed::Unbounded);
        assert_eq!(result.max_magnitude, f64::NEG_INFINITY);
        assert!(result.locations.is_empty());
    }

    #[test]
    fn test_max_magnitude_all_negative() {
        let set = EventSet::new(
            2,
            vec![event(YEAR_2010, -0.5, 1.0, 50.0), event(YEAR_2010, -0.2, 1.5, 50.5)],
        );

        // Zero seed ignores negative magnitudes entirely
        let zero = max_magnitude(&set, MaxSeed::Zero);
        assert_eq!(zero.max_magnitude, 0.0);
        assert!(zero.locations.is_empty());

        let unbounded = max_magnitude(&set, MaxSeed::Unbounded);
        assert_eq!(unbounded.max_magnitude, -0.2);
        assert_eq!(unbounded.locations, vec![Location::new(1.5, 50.5)]);
    }

    #[test]
    fn test_group_by_year() {
        let buckets = group_by_year(&two_year_set(), YearZone::Utc);
        assert_eq!(
            buckets,
            vec![
                YearBucket {
                    year: 2010,
                    magnitudes: vec![3.0, 5.0]
                },
                YearBucket {
                    year: 2011,
                    magnitudes: vec![2.0]
                },
            ]
        );
    }

    #[test]
    fn test_group_by_year_partitions_unordered_input() {
        let set = EventSet::new(
            5,
            vec![
                event(YEAR_2011 + DAY, 1.0, 0.0, 0.0),
                event(YEAR_2010 + DAY, 2.0, 0.0, 0.0),
                event(YEAR_2011 + 2 * DAY, 3.0, 0.0, 0.0),
                event(YEAR_2010 - DAY, 4.0, 0.0, 0.0),
                event(YEAR_2010 + 3 * DAY, 5.0, 0.0, 0.0),
            ],
        );
        let buckets = group_by_year(&set, YearZone::Utc);

        let years: Vec<i32> = buckets.iter().map(|b| b.year).collect();
        assert_eq!(years, vec![2009, 2010, 2011]);
        assert!(years.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(bucket_sizes(&buckets).iter().sum::<usize>(), set.len());

        // Input order kept within a year
        assert_eq!(buckets[1].magnitudes, vec![2.0, 5.0]);
        assert_eq!(buckets[2].magnitudes, vec![1.0, 3.0]);
    }

    #[test]
    fn test_group_by_year_empty() {
        assert!(group_by_year(&EventSet::default(), YearZone::Utc).is_empty());
    }

    #[test]
    fn test_average_magnitude_per_year() {
        let set = two_year_set();
        let buckets = group_by_year(&set, YearZone::Utc);
        let averages = average_magnitude_per_year(&set, &bucket_sizes(&buckets));
        assert_eq!(averages, vec![4.0, 2.0]);
    }

    #[test]
    fn test_average_sorts_by_time() {
        let mut set = two_year_set();
        set.events.reverse();
        let buckets = group_by_year(&set, YearZone::Utc);
        let averages = average_magnitude_per_year(&set, &bucket_sizes(&buckets));
        assert_eq!(averages, vec![4.0, 2.0]);
    }

    #[test]
    fn test_average_matches_direct_grouping() {
        let set = EventSet::new(
            6,
            vec![
                event(YEAR_2010 + 5 * DAY, 1.2, 0.0, 0.0),
                event(YEAR_2011 + DAY, 2.7, 0.0, 0.0),
                event(YEAR_2010 + DAY, 3.3, 0.0, 0.0),
                event(YEAR_2011 + 9 * DAY, 1.1, 0.0, 0.0),
                event(YEAR_2010 + 7 * DAY, 2.4, 0.0, 0.0),
                event(YEAR_2011 + 3 * DAY, 4.0, 0.0, 0.0),
            ],
        );
        let buckets = group_by_year(&set, YearZone::Utc);
        let averages = average_magnitude_per_year(&set, &bucket_sizes(&buckets));

        for (bucket, average) in buckets.iter().zip(&averages) {
            let direct = bucket.magnitudes.iter().sum::<f64>() / bucket.count() as f64;
            assert!((direct - average).abs() < 1e-12);
        }
    }

    #[test]
    fn test_average_with_oversized_buckets() {
        let set = two_year_set();
        let averages = average_magnitude_per_year(&set, &[2, 5, 1]);
        assert_eq!(averages[0], 4.0);
        assert_eq!(averages[1], 2.0);
        assert!(averages[2].is_nan());
    }

    #[test]
    fn test_summarize_years() {
        let stats = summarize_years(&two_year_set(), YearZone::Utc);
        assert_eq!(
            stats,
            vec![
                YearStat {
                    year: 2010,
                    count: 2,
                    average_magnitude: 4.0
                },
                YearStat {
                    year: 2011,
                    count: 1,
                    average_magnitude: 2.0
                },
            ]
        );
    }

    #[test]
    fn test_analyze_rejects_empty_set() {
        let set = decode_event_set(r#"{"metadata":{"count":0},"features":[]}"#).unwrap();
        let err = analyze(&set, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, QuakeError::EmptyData));
    }

    #[test]
    fn test_analyze() {
        let analysis = analyze(&tie_set(), &AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.total_count, 3);
        assert_eq!(analysis.strongest.max_magnitude, 4.5);
        assert_eq!(analysis.strongest.tie_count(), 2);
        assert_eq!(
            analysis.years,
            vec![YearStat {
                year: 2010,
                count: 3,
                average_magnitude: 11.0 / 3.0
            }]
        );
    }

    #[test]
    fn test_analyze_uses_configured_seed() {
        let set = EventSet::new(1, vec![event(YEAR_2010, -0.4, 1.0, 50.0)]);
        let config = AnalysisConfig {
            max_seed: MaxSeed::Unbounded,
            ..AnalysisConfig::default()
        };
        let analysis = analyze(&set, &config).unwrap();
        assert_eq!(analysis.strongest.max_magnitude, -0.4);
        assert_eq!(analysis.strongest.locations, vec![Location::new(1.0, 50.0)]);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.123456, 4), 2.1235);
        assert_eq!(round_to(4.0, 4), 4.0);
        assert_eq!(round_to(1.0 / 3.0, 2), 0.33);
    }
}
