use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use reqwest::Client;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

const DURATION_SECS: u64 = 20;
const BASE_URL: &str = "http://localhost:3000";
const BENCH_DATE: &str = "2030-06-03";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Conflict,
    TryAgain,
    Failed,
}

#[tokio::main]
async fn main() {
    println!("{}", "🚀 Reservation Engine Benchmark".bold().green());
    println!("Target URL: {}", BASE_URL);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    if client.get(format!("{}/health", BASE_URL)).send().await.is_err() {
        eprintln!("{}", "❌ Server is NOT reachable at localhost:3000. Please start it first.".red().bold());
        return;
    }

    println!("\n{}", "⚙️  Setting up benchmark data...".yellow());
    let (venue_id, court_id) = setup_catalog(&client).await;
    println!("{}", "✅ Data created successfully.".green());
    println!("   Venue ID: {}", venue_id);
    println!("   Court ID: {}", court_id);

    let rps_stages = vec![10, 50, 200];

    println!("\n{}", "=".repeat(70));
    println!("Stage 1: {}", "Same-window contention (at most one success expected)".cyan().bold());
    println!("{}", "=".repeat(70));
    println!("{:<10} | {:<12} | {:<12} | {:<12} | {:<12} | {:<10}", "RPS", "Mean (ms)", "P99 (ms)", "Created", "Conflict", "Failed");
    println!("{:-<10}-+-{:-<12}-+-{:-<12}-+-{:-<12}-+-{:-<12}-+-{:-<10}", "", "", "", "", "", "");
    for &rps in &rps_stages {
        run_stage(&client, &venue_id, &court_id, rps, true).await;
    }

    println!("\n{}", "=".repeat(70));
    println!("Stage 2: {}", "Disjoint-window throughput (every attempt distinct)".cyan().bold());
    println!("{}", "=".repeat(70));
    println!("{:<10} | {:<12} | {:<12} | {:<12} | {:<12} | {:<10}", "RPS", "Mean (ms)", "P99 (ms)", "Created", "Conflict", "Failed");
    println!("{:-<10}-+-{:-<12}-+-{:-<12}-+-{:-<12}-+-{:-<12}-+-{:-<10}", "", "", "", "", "", "");
    for &rps in &rps_stages {
        run_stage(&client, &venue_id, &court_id, rps, false).await;
    }
}

async fn setup_catalog(client: &Client) -> (String, String) {
    let res = client.post(format!("{}/api/v1/venues", BASE_URL))
        .json(&json!({
            "name": format!("Benchmark Venue {}", Uuid::new_v4()),
            "owner_name": "Benchmark Bot"
        }))
        .send()
        .await
        .expect("Failed to send venue create request");

    if !res.status().is_success() {
        panic!("Failed to create venue: status {}", res.status());
    }
    let body: Value = res.json().await.expect("Failed to parse venue response");
    let venue_id = body["id"].as_str().expect("No venue id").to_string();

    let res = client.post(format!("{}/api/v1/venues/{}/courts", BASE_URL, venue_id))
        .json(&json!({ "name": "Court 1" }))
        .send()
        .await
        .expect("Failed to send court create request");

    if !res.status().is_success() {
        panic!("Failed to create court: status {}", res.status());
    }
    let body: Value = res.json().await.expect("Failed to parse court response");
    let court_id = body["id"].as_str().expect("No court id").to_string();

    (venue_id, court_id)
}

/// Contended mode fires every request at the same window; disjoint mode
/// gives each request a unique one-minute window so all should succeed.
async fn run_stage(client: &Client, venue_id: &str, court_id: &str, rps: u32, contended: bool) {
    let limiter = Arc::new(RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(rps).unwrap())
    ));

    let (tx, mut rx) = mpsc::channel(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(DURATION_SECS);
    let counter = Arc::new(AtomicU64::new(0));

    loop {
        if start_time.elapsed() > duration {
            break;
        }

        if limiter.check().is_ok() {
            let client = client.clone();
            let url = format!("{}/api/v1/venues/{}/reservations", BASE_URL, venue_id);
            let court_id = court_id.to_string();
            let tx = tx.clone();
            let seq = counter.fetch_add(1, Ordering::Relaxed);

            tokio::spawn(async move {
                let (date, start, end) = if contended {
                    (BENCH_DATE.to_string(), "10:00".to_string(), "11:00".to_string())
                } else {
                    // Spread unique windows over distinct dates to keep them disjoint.
                    let day_offset = seq / (12 * 60);
                    let minute = (seq % (12 * 60)) as u32;
                    let date = chrono::NaiveDate::parse_from_str(BENCH_DATE, "%Y-%m-%d").unwrap()
                        + chrono::Duration::days(1 + day_offset as i64);
                    (
                        date.format("%Y-%m-%d").to_string(),
                        format!("{:02}:{:02}", 8 + minute / 60, minute % 60),
                        format!("{:02}:{:02}", 8 + (minute + 1) / 60, (minute + 1) % 60),
                    )
                };

                let body = json!({
                    "date": date,
                    "windows": [{ "court_id": court_id, "start": start, "end": end }],
                    "name": "Bench User",
                    "email": format!("bench-{}@example.com", seq),
                    "total_price": 300000,
                    "currency": "VND"
                });

                let req_start = Instant::now();
                let res = client.post(&url).json(&body).send().await;
                let latency = req_start.elapsed();

                let outcome = match res {
                    Ok(r) if r.status().as_u16() == 200 => Outcome::Created,
                    Ok(r) if r.status().as_u16() == 409 => Outcome::Conflict,
                    Ok(r) if r.status().as_u16() == 503 => Outcome::TryAgain,
                    _ => Outcome::Failed,
                };

                let _ = tx.send((latency, outcome)).await;
            });
        } else {
            tokio::task::yield_now().await;
        }
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let mut created = 0u64;
    let mut conflicts = 0u64;
    let mut try_again = 0u64;
    let mut failed = 0u64;

    while let Some((latency, outcome)) = rx.recv().await {
        histogram.record(latency.as_micros() as u64).unwrap();
        match outcome {
            Outcome::Created => created += 1,
            Outcome::Conflict => conflicts += 1,
            Outcome::TryAgain => try_again += 1,
            Outcome::Failed => failed += 1,
        }
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;

    println!(
        "{:<10} | {:<12.2} | {:<12.2} | {:<12} | {:<12} | {:<10}",
        rps,
        mean_ms,
        p99_ms,
        created,
        conflicts,
        failed + try_again,
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
}
