// Seed the stats store with synthetic history for local development
//
// Writes 24 hours of samples with a day-shaped score curve plus noise,
// enough for the hourly aggregator to draw a full chart on first load.

use chrono::{DateTime, Local, Timelike};
use pulse_core::store::{NetworkDb, StatsDb};
use pulse_core::types::StatSample;
use rand::Rng;

const WINDOW_HOURS: i64 = 24;
// One sample every two minutes keeps a full day inside the store's
// 1000-sample bound.
const STEP_MINUTES: i64 = 2;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().compact().init();

    let db = StatsDb::from_env();
    let mut rng = rand::thread_rng();

    let now_ms = Local::now().timestamp_millis();
    let points = WINDOW_HOURS * 60 / STEP_MINUTES;

    let mut stats = Vec::new();
    for i in (0..=points).rev() {
        let time = now_ms - i * STEP_MINUTES * 60 * 1000;
        let hour = match DateTime::from_timestamp_millis(time) {
            Some(utc) => utc.with_timezone(&Local).hour(),
            None => 0,
        };

        // Day-shaped baseline: slight dip overnight, peak in the evening
        let base_score: i32 = match hour {
            2..=6 => 85,
            18..=22 => 94,
            _ => 90,
        };
        let noise: i32 = rng.gen_range(-2..=2);
        let score = (base_score + noise).clamp(60, 100) as u32;

        let total_nodes: u32 = 200 + rng.gen_range(0..10);
        let online_nodes = ((score as f64 / 100.0) * total_nodes as f64).round() as u32;

        stats.push(StatSample {
            timestamp: time,
            total_nodes,
            online_nodes,
            score,
        });
    }

    let count = stats.len();
    db.replace(&NetworkDb {
        stats,
        logs: Vec::new(),
    })
    .await;

    println!(
        "Generated {} history points covering the last {} hours.",
        count, WINDOW_HOURS
    );
}
