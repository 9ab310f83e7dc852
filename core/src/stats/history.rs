// Hourly aggregation of poll samples for the health chart

use crate::types::StatSample;
use chrono::{DateTime, Datelike, Local, Timelike};
use std::collections::HashMap;

/// Bucket accumulator keyed by local-time (year, month, day, hour).
struct HourBucket {
    total_nodes: u64,
    online_nodes: u64,
    score: u64,
    count: u64,
    timestamp: i64,
}

/// Aggregate samples from the last `hours` hours into hourly means.
///
/// Each bucket keeps the timestamp of its first (oldest) sample so the
/// chart can place it on the time axis. When the window holds fewer than
/// two buckets but raw samples exist, the raw samples are returned
/// unchanged, so a freshly started deployment still draws a line.
pub fn aggregate_hourly(samples: &[StatSample], hours: i64, now_ms: i64) -> Vec<StatSample> {
    let cutoff = now_ms - hours * 60 * 60 * 1000;
    let raw: Vec<&StatSample> = samples.iter().filter(|s| s.timestamp > cutoff).collect();

    let mut buckets: HashMap<(i32, u32, u32, u32), HourBucket> = HashMap::new();

    for sample in &raw {
        let local = match DateTime::from_timestamp_millis(sample.timestamp) {
            Some(utc) => utc.with_timezone(&Local),
            None => continue,
        };
        let key = (local.year(), local.month(), local.day(), local.hour());

        let bucket = buckets.entry(key).or_insert(HourBucket {
            total_nodes: 0,
            online_nodes: 0,
            score: 0,
            count: 0,
            timestamp: sample.timestamp,
        });
        bucket.total_nodes += sample.total_nodes as u64;
        bucket.online_nodes += sample.online_nodes as u64;
        bucket.score += sample.score as u64;
        bucket.count += 1;
    }

    let mut aggregated: Vec<StatSample> = buckets
        .into_values()
        .map(|b| StatSample {
            timestamp: b.timestamp,
            total_nodes: round_div(b.total_nodes, b.count) as u32,
            online_nodes: round_div(b.online_nodes, b.count) as u32,
            score: round_div(b.score, b.count) as u32,
        })
        .collect();
    aggregated.sort_by_key(|s| s.timestamp);

    if aggregated.len() < 2 && !raw.is_empty() {
        return raw.into_iter().cloned().collect();
    }

    aggregated
}

/// Integer mean with round-half-up.
fn round_div(sum: u64, count: u64) -> u64 {
    (sum + count / 2) / count
}
