//! Catalog loading from a directory on disk, as configured by SPLITS_SOURCE.

use std::fs;

use splitclock::catalog::Catalog;
use splitclock::config::{SourceLocation, TimerConfig};
use splitclock::error::SessionError;

fn config_for(dir: &std::path::Path) -> TimerConfig {
    TimerConfig {
        source: SourceLocation::Dir(dir.to_path_buf()),
        ..TimerConfig::default()
    }
}

#[tokio::test]
async fn lists_and_loads_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("index.csv"),
        "name,file\r\nWorld Record,wr.csv\r\nPersonal Best,pb.csv\r\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("wr.csv"),
        "split,time\nTutorial,12.345\nGate,30.5\nFinal Climb,61.155\n",
    )
    .unwrap();

    let mut catalog = Catalog::from_config(&config_for(dir.path())).unwrap();
    let listing = catalog.list_comparisons().await.unwrap().to_vec();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[1].display_name, "Personal Best");

    let set = catalog.load_comparison("wr.csv").await.unwrap();
    let cumulative: Vec<u64> = set.splits().iter().map(|s| s.cumulative_ms).collect();
    assert_eq!(cumulative, vec![12_345, 42_845, 104_000]);
    assert_eq!(set.meta().display_name, "World Record");
}

#[tokio::test]
async fn listed_but_missing_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.csv"), "name,file\nPersonal Best,pb.csv\n").unwrap();

    let mut catalog = Catalog::from_config(&config_for(dir.path())).unwrap();
    let err = catalog.load_comparison("pb.csv").await.unwrap_err();
    assert!(matches!(err, SessionError::Unavailable { ref key, .. } if key == "pb.csv"));
}

#[tokio::test]
async fn index_is_fetched_once() {
    let dir = tempfile::tempdir().unwrap();
    let index = dir.path().join("index.csv");
    fs::write(&index, "name,file\nWorld Record,wr.csv\n").unwrap();

    let mut catalog = Catalog::from_config(&config_for(dir.path())).unwrap();
    assert_eq!(catalog.list_comparisons().await.unwrap().len(), 1);
    fs::remove_file(&index).unwrap();
    assert_eq!(catalog.list_comparisons().await.unwrap().len(), 1);
}

#[tokio::test]
async fn fingerprint_tracks_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.csv"), "name,file\nWR,wr.csv\n").unwrap();
    fs::write(dir.path().join("wr.csv"), "split,time\nA,1\n").unwrap();

    let mut catalog = Catalog::from_config(&config_for(dir.path())).unwrap();
    let first = catalog.load_comparison("wr.csv").await.unwrap();
    let again = catalog.load_comparison("wr.csv").await.unwrap();
    assert_eq!(first, again);

    fs::write(dir.path().join("wr.csv"), "split,time\nA,1.5\n").unwrap();
    let changed = catalog.load_comparison("wr.csv").await.unwrap();
    assert_ne!(first.meta().fingerprint, changed.meta().fingerprint);
}
