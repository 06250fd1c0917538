// Query engine tests: window token parsing, cutoff resolution, aggregation

use std::sync::Arc;

use fleetmon::error::MetricsError;
use fleetmon::metrics_repo::MetricsRepo;
use fleetmon::models::SampleOutcome;
use fleetmon::query::{QueryEngine, TimeWindow, WindowUnit};
use tempfile::TempDir;

// --- token parsing ---

#[test]
fn valid_tokens_resolve_to_magnitude_times_unit_seconds() {
    let cases = [
        ("1s", 1),
        ("30s", 30),
        ("1m", 60),
        ("5m", 300),
        ("1h", 3_600),
        ("2h", 7_200),
        ("1d", 86_400),
        ("7d", 604_800),
        ("1w", 604_800),
        ("4w", 2_419_200),
    ];
    for (token, seconds) in cases {
        let window: TimeWindow = token.parse().unwrap();
        assert_eq!(window.duration().as_secs(), seconds, "token {token}");
    }
}

#[test]
fn zero_magnitude_is_valid_and_cuts_off_at_now() {
    let window: TimeWindow = "0s".parse().unwrap();
    assert_eq!(window.magnitude, 0);
    assert_eq!(window.duration().as_secs(), 0);
    assert_eq!(window.cutoff_ms(1_700_000_000_000), 1_700_000_000_000);
}

#[test]
fn five_minutes_cuts_off_three_hundred_seconds_back() {
    let window: TimeWindow = "5m".parse().unwrap();
    assert_eq!(window.unit, WindowUnit::Minute);
    assert_eq!(window.cutoff_ms(1_700_000_000_000), 1_700_000_000_000 - 300_000);
}

#[test]
fn oversized_windows_saturate_instead_of_overflowing() {
    let window: TimeWindow = "18446744073709551615w".parse().unwrap();
    // A window wider than all of history resolves to a cutoff before the
    // epoch without panicking, so it simply qualifies every sample.
    assert!(window.cutoff_ms(1_700_000_000_000) < 0);
}

#[test]
fn malformed_tokens_fail_with_invalid_window_format() {
    let malformed = [
        "", "5", "m", "5x", "1y", "1M", "1.5h", "1h30m", "invalid", "abc", "1hour", "1 hour",
        "h5", "-5m", "+5m", " 5m", "5m ", "٥m",
    ];
    for token in malformed {
        match token.parse::<TimeWindow>() {
            Err(MetricsError::InvalidWindowFormat(t)) => assert_eq!(t, token),
            other => panic!("token {token:?} should be invalid, got {other:?}"),
        }
    }
}

// --- aggregation ---

async fn engine_in(dir: &TempDir) -> (Arc<MetricsRepo>, QueryEngine) {
    let path = dir.path().join("metrics.db");
    let repo = Arc::new(MetricsRepo::connect(path.to_str().unwrap(), 2).await.unwrap());
    repo.init().await.unwrap();
    (repo.clone(), QueryEngine::new(repo))
}

fn cpu_only(cpu: f64) -> SampleOutcome {
    SampleOutcome {
        cpu_percent: Some(cpu),
        ..Default::default()
    }
}

#[tokio::test]
async fn averages_are_the_arithmetic_mean_per_host() {
    let dir = TempDir::new().unwrap();
    let (repo, engine) = engine_in(&dir).await;

    let now = chrono::Utc::now().timestamp_millis();
    for (offset, cpu) in [(3_000, 10.0), (2_000, 20.0), (1_000, 30.0)] {
        repo.insert_sample("web1", now - offset, &cpu_only(cpu)).await.unwrap();
    }

    let stats = engine.averages(Some("1h".parse().unwrap()), None).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert!((stats["web1"].cpu - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn host_with_only_memory_reports_zero_for_the_rest() {
    let dir = TempDir::new().unwrap();
    let (repo, engine) = engine_in(&dir).await;

    let memory_only = SampleOutcome {
        memory_percent: Some(42.0),
        ..Default::default()
    };
    let now = chrono::Utc::now().timestamp_millis();
    repo.insert_sample("db1", now, &memory_only).await.unwrap();

    let stats = engine.averages(None, None).await.unwrap();
    let db1 = &stats["db1"];
    assert!((db1.memory - 42.0).abs() < 1e-9);
    assert_eq!(db1.cpu, 0.0);
    assert_eq!(db1.disk_read, 0.0);
    assert_eq!(db1.disk_write, 0.0);
    assert_eq!(db1.network_read, 0.0);
    assert_eq!(db1.network_write, 0.0);
}

#[tokio::test]
async fn zero_window_returns_zero_valued_entries_not_an_error() {
    let dir = TempDir::new().unwrap();
    let (repo, engine) = engine_in(&dir).await;

    let now = chrono::Utc::now().timestamp_millis();
    repo.insert_sample("web1", now - 10_000, &cpu_only(50.0)).await.unwrap();

    let stats = engine.averages(Some("0s".parse().unwrap()), None).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats["web1"].cpu, 0.0);
}

#[tokio::test]
async fn narrow_window_excludes_older_samples() {
    let dir = TempDir::new().unwrap();
    let (repo, engine) = engine_in(&dir).await;

    let now = chrono::Utc::now().timestamp_millis();
    // Two minutes old: outside a 1m window, inside a 1h window.
    repo.insert_sample("web1", now - 120_000, &cpu_only(80.0)).await.unwrap();
    repo.insert_sample("web1", now - 5_000, &cpu_only(20.0)).await.unwrap();

    let wide = engine.averages(Some("1h".parse().unwrap()), None).await.unwrap();
    assert!((wide["web1"].cpu - 50.0).abs() < 1e-9);

    let narrow = engine.averages(Some("1m".parse().unwrap()), None).await.unwrap();
    assert!((narrow["web1"].cpu - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn host_filter_restricts_and_zero_fills_unknown_hosts() {
    let dir = TempDir::new().unwrap();
    let (repo, engine) = engine_in(&dir).await;

    let now = chrono::Utc::now().timestamp_millis();
    repo.insert_sample("web1", now, &cpu_only(10.0)).await.unwrap();
    repo.insert_sample("db1", now, &cpu_only(30.0)).await.unwrap();

    let filter = vec!["web1".to_string(), "ghost".to_string()];
    let stats = engine.averages(None, Some(&filter)).await.unwrap();
    assert_eq!(
        stats.keys().cloned().collect::<Vec<_>>(),
        vec!["ghost".to_string(), "web1".to_string()]
    );
    assert!((stats["web1"].cpu - 10.0).abs() < 1e-9);
    assert_eq!(stats["ghost"].cpu, 0.0);
}

#[tokio::test]
async fn repeated_queries_over_an_unchanged_store_are_identical() {
    let dir = TempDir::new().unwrap();
    let (repo, engine) = engine_in(&dir).await;

    let now = chrono::Utc::now().timestamp_millis();
    repo.insert_sample("web1", now - 1_000, &cpu_only(33.0)).await.unwrap();

    let first = engine.averages(Some("1d".parse().unwrap()), None).await.unwrap();
    let second = engine.averages(Some("1d".parse().unwrap()), None).await.unwrap();
    assert_eq!(first, second);
}
