// MetricsRepo tests: connect, init, insert, averages, host discovery

use fleetmon::metrics_repo::MetricsRepo;
use fleetmon::models::{DiskRate, NetworkRate, SampleOutcome};
use tempfile::TempDir;

async fn repo_in(dir: &TempDir) -> MetricsRepo {
    let path = dir.path().join("metrics.db");
    let repo = MetricsRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    repo
}

fn full_outcome(cpu: f64) -> SampleOutcome {
    SampleOutcome {
        cpu_percent: Some(cpu),
        memory_percent: Some(50.0),
        disk: Some(DiskRate {
            read: 100.0,
            write: 200.0,
        }),
        network: Some(NetworkRate {
            received: 1000.0,
            sent: 500.0,
        }),
    }
}

#[tokio::test]
async fn connect_and_init_twice_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;
    repo.init().await.unwrap();
}

#[tokio::test]
async fn insert_writes_one_row_per_kind() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;

    let rows = repo.insert_sample("web1", 1000, &full_outcome(25.0)).await.unwrap();
    assert_eq!(rows, 4);

    let cpu = repo.cpu_averages(None).await.unwrap();
    assert_eq!(cpu, vec![("web1".to_string(), 25.0)]);
    let memory = repo.memory_averages(None).await.unwrap();
    assert_eq!(memory, vec![("web1".to_string(), 50.0)]);
    let disk = repo.disk_averages(None).await.unwrap();
    assert_eq!(disk, vec![("web1".to_string(), 100.0, 200.0)]);
    let network = repo.network_averages(None).await.unwrap();
    assert_eq!(network, vec![("web1".to_string(), 1000.0, 500.0)]);
}

#[tokio::test]
async fn insert_empty_outcome_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;

    let rows = repo
        .insert_sample("web1", 1000, &SampleOutcome::default())
        .await
        .unwrap();
    assert_eq!(rows, 0);
    assert!(repo.known_hosts().await.unwrap().is_empty());
}

#[tokio::test]
async fn partial_outcome_only_touches_its_tables() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;

    let memory_only = SampleOutcome {
        memory_percent: Some(42.0),
        ..Default::default()
    };
    let rows = repo.insert_sample("db1", 1000, &memory_only).await.unwrap();
    assert_eq!(rows, 1);

    assert_eq!(
        repo.memory_averages(None).await.unwrap(),
        vec![("db1".to_string(), 42.0)]
    );
    assert!(repo.cpu_averages(None).await.unwrap().is_empty());
    assert!(repo.disk_averages(None).await.unwrap().is_empty());
    assert!(repo.network_averages(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn known_hosts_spans_all_record_sets() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;

    let cpu_only = SampleOutcome {
        cpu_percent: Some(10.0),
        ..Default::default()
    };
    let memory_only = SampleOutcome {
        memory_percent: Some(42.0),
        ..Default::default()
    };
    repo.insert_sample("web1", 1000, &cpu_only).await.unwrap();
    repo.insert_sample("db1", 1000, &memory_only).await.unwrap();

    assert_eq!(
        repo.known_hosts().await.unwrap(),
        vec!["db1".to_string(), "web1".to_string()]
    );
}

#[tokio::test]
async fn cutoff_excludes_older_samples() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;

    repo.insert_sample("web1", 1_000, &full_outcome(10.0)).await.unwrap();
    repo.insert_sample("web1", 5_000, &full_outcome(30.0)).await.unwrap();

    // Unbounded scan averages both.
    assert_eq!(
        repo.cpu_averages(None).await.unwrap(),
        vec![("web1".to_string(), 20.0)]
    );
    // Cutoff at the second sample's timestamp keeps it (>=) and drops the first.
    assert_eq!(
        repo.cpu_averages(Some(5_000)).await.unwrap(),
        vec![("web1".to_string(), 30.0)]
    );
    // Cutoff past every sample yields no rows.
    assert!(repo.cpu_averages(Some(9_000)).await.unwrap().is_empty());
}
