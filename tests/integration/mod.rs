//! Comprehensive integration tests for ucd-mirror
//!
//! Exercises full mirror/clean/verify cycles against a real temporary
//! directory, with an in-memory bridge standing in for the remote dataset
//! and a static manifest source supplying version manifests.

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use ucd_mirror::bridge::FileSystemBridge;
use ucd_mirror::lockfile::is_content_hash;
use ucd_mirror::manifest::StaticManifestSource;
use ucd_mirror::*;

/// Test harness wiring a local temp store to an in-memory remote
pub struct MirrorTestHarness {
    pub local_dir: TempDir,
    pub remote: Arc<MemoryBridge>,
    pub manifests: Arc<StaticManifestSource>,
    pub store: MirrorStore,
}

impl MirrorTestHarness {
    /// Create a harness with default store settings
    pub async fn new() -> Self {
        Self::with_builder(MirrorStoreBuilder::new()).await
    }

    /// Create a harness with custom store settings
    pub async fn with_builder(builder: MirrorStoreBuilder) -> Self {
        let local_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryBridge::new("/Public"));
        let manifests = Arc::new(StaticManifestSource::new());
        let store = builder
            .local_bridge(Arc::new(LocalBridge::new(local_dir.path()).unwrap()))
            .remote_bridge(remote.clone())
            .build(manifests.clone())
            .await
            .unwrap();
        MirrorTestHarness {
            local_dir,
            remote,
            manifests,
            store,
        }
    }

    /// Register a version remotely and in its manifest
    pub fn seed_version(&self, version: &str, files: &[(&str, &[u8])]) {
        let paths: Vec<&str> = files.iter().map(|(p, _)| *p).collect();
        self.manifests.insert(version, &paths);
        for (path, content) in files {
            self.remote
                .seed(&[(format!("{}/{}", version, path).as_str(), *content)])
                .unwrap();
        }
    }

    /// Read a file straight from the local directory, bypassing the store
    pub fn read_local(&self, store_path: &str) -> Option<Vec<u8>> {
        fs::read(self.local_dir.path().join(store_path)).ok()
    }
}

const V16: &str = "16.0.0";
const V15: &str = "15.1.0";

fn v16_files() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("ReadMe.txt", b"Unicode 16.0.0 release" as &[u8]),
        ("ucd/UnicodeData.txt", b"0000;<control>;Cc;0;BN;;;;;N;NULL;;;;"),
        ("ucd/emoji/emoji-data.txt", b"231A..231B    ; Emoji"),
    ]
}

#[tokio::test]
async fn test_mirror_writes_expected_files() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());

    let result = harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    assert_eq!(result.mirrored.len(), 3);
    assert!(result.failed.is_empty());
    assert!(result.skipped.is_empty());
    assert!(result.bytes_written > 0);
    assert_eq!(
        harness.read_local("16.0.0/ucd/UnicodeData.txt").unwrap(),
        b"0000;<control>;Cc;0;BN;;;;;N;NULL;;;;"
    );
}

#[tokio::test]
async fn test_mirror_updates_lockfile_and_snapshot_together() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());
    harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    let status = harness.store.status().await;
    assert_eq!(status.lockfile_version, 1);
    assert_eq!(status.schema, "unicode-mirror-index@1");
    let entry = status.versions.get(V16).unwrap();
    assert_eq!(entry.file_count, 3);
    assert_eq!(entry.path, V16);

    // Snapshot on disk, hashes well-formed
    let snapshot_raw = harness.read_local(".snapshots/16.0.0.json").unwrap();
    let snapshot: serde_json::Value = serde_json::from_slice(&snapshot_raw).unwrap();
    assert_eq!(snapshot["schema"], "unicode-snapshot@1");
    assert_eq!(snapshot["unicodeVersion"], V16);
    let hash = snapshot["files"]["ucd/UnicodeData.txt"]["hash"].as_str().unwrap();
    assert!(is_content_hash(hash));
}

#[tokio::test]
async fn test_dry_run_plans_without_writing() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());

    let result = harness
        .store
        .mirror(
            V16,
            &MirrorOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(result.mirrored.is_empty());
    assert_eq!(result.planned.len(), 3);
    assert!(result.planned.contains(&"16.0.0/ucd/UnicodeData.txt".to_string()));
    assert!(harness.read_local("16.0.0/ReadMe.txt").is_none());
    assert!(harness.store.status().await.versions.is_empty());
}

#[tokio::test]
async fn test_incremental_mirror_fetches_only_missing() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());
    harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    // Drop one file locally and mirror again
    fs::remove_file(harness.local_dir.path().join("16.0.0/ReadMe.txt")).unwrap();
    let result = harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    assert_eq!(result.mirrored, vec!["16.0.0/ReadMe.txt".to_string()]);
    assert_eq!(result.skipped.len(), 2);
    // The snapshot keeps tracking all three
    assert_eq!(harness.store.status().await.versions[V16].file_count, 3);
}

#[tokio::test]
async fn test_force_refetches_everything() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());
    harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    let result = harness
        .store
        .mirror(
            V16,
            &MirrorOptions {
                force: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(result.mirrored.len(), 3);
    assert!(result.skipped.is_empty());
}

#[tokio::test]
async fn test_one_failure_never_aborts_siblings() {
    let harness = MirrorTestHarness::new().await;
    // Manifest expects a file the remote does not serve
    harness.seed_version(V16, &v16_files());
    harness.manifests.insert(
        V16,
        &[
            "ReadMe.txt",
            "ucd/UnicodeData.txt",
            "ucd/emoji/emoji-data.txt",
            "ucd/Missing.txt",
        ],
    );

    let result = harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    assert_eq!(result.mirrored.len(), 3);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].path, "16.0.0/ucd/Missing.txt");
    assert!(!result.is_complete());
    // Successful siblings are tracked
    assert_eq!(harness.store.status().await.versions[V16].file_count, 3);
}

#[tokio::test]
async fn test_mirror_all_covers_every_known_version() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());
    harness.seed_version(V15, &[("ReadMe.txt", b"Unicode 15.1.0" as &[u8])]);

    let results = harness
        .store
        .mirror_all(&MirrorOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    for (version, outcome) in &results {
        let result = outcome.as_ref().unwrap();
        assert!(result.is_complete(), "version {} had failures", version);
    }

    let status = harness.store.status().await;
    assert_eq!(status.versions.len(), 2);
    assert_eq!(status.versions[V15].file_count, 1);
}

#[tokio::test]
async fn test_round_trip_mirror_then_clean_leaves_nothing() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());
    harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    let results = harness.store.clean(&CleanOptions::default()).await;
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.deleted.len(), 3);
    assert!(result.failed.is_empty());

    // Version directory pruned, lockfile entry and snapshot gone
    assert!(!harness.local_dir.path().join("16.0.0").exists());
    assert!(harness.store.status().await.versions.is_empty());
    assert!(harness.read_local(".snapshots/16.0.0.json").is_none());
}

#[tokio::test]
async fn test_clean_removes_orphans_by_default() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V15, &[("a.txt", b"a" as &[u8]), ("b.txt", b"b" as &[u8])]);
    harness
        .store
        .mirror(V15, &MirrorOptions::default())
        .await
        .unwrap();

    // An untracked file appears under the version directory
    fs::write(harness.local_dir.path().join("15.1.0/orphan.txt"), b"stray").unwrap();

    let results = harness
        .store
        .clean(&CleanOptions {
            versions: Some(vec![V15.to_string()]),
            ..Default::default()
        })
        .await;

    let result = &results[0];
    assert_eq!(result.deleted.len(), 3);
    assert_eq!(result.orphans, vec!["15.1.0/orphan.txt".to_string()]);
    assert!(!harness.local_dir.path().join("15.1.0").exists());
}

#[tokio::test]
async fn test_orphan_removal_can_be_disabled() {
    let harness =
        MirrorTestHarness::with_builder(MirrorStoreBuilder::new().remove_orphans(false)).await;
    harness.seed_version(V15, &[("a.txt", b"a" as &[u8])]);
    harness
        .store
        .mirror(V15, &MirrorOptions::default())
        .await
        .unwrap();
    fs::write(harness.local_dir.path().join("15.1.0/orphan.txt"), b"stray").unwrap();

    let results = harness.store.clean(&CleanOptions::default()).await;
    assert_eq!(results[0].deleted, vec!["15.1.0/a.txt".to_string()]);
    assert!(results[0].orphans.is_empty());
    assert!(harness.local_dir.path().join("15.1.0/orphan.txt").exists());
}

#[tokio::test]
async fn test_clean_dry_run_reports_without_deleting() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());
    harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    let results = harness
        .store
        .clean(&CleanOptions {
            dry_run: true,
            ..Default::default()
        })
        .await;

    assert_eq!(results[0].deleted.len(), 3);
    assert!(results[0].dry_run);
    assert!(harness.local_dir.path().join("16.0.0/ReadMe.txt").exists());
    assert!(harness.store.status().await.versions.contains_key(V16));
}

#[tokio::test]
async fn test_clean_records_missing_tracked_file() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V15, &[("a.txt", b"a" as &[u8]), ("b.txt", b"b" as &[u8])]);
    harness
        .store
        .mirror(V15, &MirrorOptions::default())
        .await
        .unwrap();

    fs::remove_file(harness.local_dir.path().join("15.1.0/a.txt")).unwrap();
    let results = harness.store.clean(&CleanOptions::default()).await;
    let result = &results[0];
    assert_eq!(result.deleted, vec!["15.1.0/b.txt".to_string()]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].path, "15.1.0/a.txt");
    assert_eq!(result.failed[0].error, "File not found");
    // Everything on disk is gone regardless, so tracking is dropped
    assert!(harness.store.status().await.versions.is_empty());
}

#[tokio::test]
async fn test_verify_round_trip_and_corruption() {
    let harness = MirrorTestHarness::new().await;
    harness.seed_version(V16, &v16_files());
    harness
        .store
        .mirror(V16, &MirrorOptions::default())
        .await
        .unwrap();

    let report = harness.store.verify(V16).await.unwrap();
    assert!(report.is_valid());
    assert_eq!(report.verified.len(), 3);

    // Flip a byte and verify again
    fs::write(
        harness.local_dir.path().join("16.0.0/ReadMe.txt"),
        b"tampered",
    )
    .unwrap();
    fs::remove_file(harness.local_dir.path().join("16.0.0/ucd/UnicodeData.txt")).unwrap();

    let report = harness.store.verify(V16).await.unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.verified.len(), 1);
    assert_eq!(report.mismatched.len(), 1);
    assert!(report.mismatched[0].error.contains("Integrity error"));
    assert_eq!(report.missing, vec!["16.0.0/ucd/UnicodeData.txt".to_string()]);
}

#[tokio::test]
async fn test_store_state_survives_reopen() {
    let local_dir = TempDir::new().unwrap();
    let remote = Arc::new(MemoryBridge::new("/Public"));
    let manifests = Arc::new(StaticManifestSource::new());
    manifests.insert(V16, &["ReadMe.txt"]);
    remote.seed(&[("16.0.0/ReadMe.txt", b"release" as &[u8])]).unwrap();

    {
        let store = MirrorStoreBuilder::new()
            .local_bridge(Arc::new(LocalBridge::new(local_dir.path()).unwrap()))
            .remote_bridge(remote.clone())
            .build(manifests.clone())
            .await
            .unwrap();
        store.mirror(V16, &MirrorOptions::default()).await.unwrap();
    }

    let reopened = MirrorStoreBuilder::new()
        .local_bridge(Arc::new(LocalBridge::new(local_dir.path()).unwrap()))
        .remote_bridge(remote)
        .build(manifests)
        .await
        .unwrap();
    let status = reopened.status().await;
    assert_eq!(status.versions[V16].file_count, 1);

    // And the reopened handle mirrors incrementally: nothing is missing
    let result = reopened.mirror(V16, &MirrorOptions::default()).await.unwrap();
    assert!(result.mirrored.is_empty());
    assert_eq!(result.skipped.len(), 1);
}

/// The identical boundary-semantics suite, parametrized across backends
async fn assert_bridge_contract(bridge: &dyn FileSystemBridge) {
    // Identity inputs resolve to the boundary
    for input in ["", ".", "./", "/"] {
        assert!(bridge.resolve(input).unwrap().is_boundary());
    }

    // Escapes fail before I/O, encoded or not
    for attack in [
        "../escape.txt",
        "..%2fescape.txt",
        "%2e%2e/escape.txt",
        "%252e%252e%252fescape.txt",
        "..\\escape.txt",
        "a/../../escape.txt",
    ] {
        let err = bridge.read(attack).await.unwrap_err();
        assert!(err.is_traversal(), "{:?} was not rejected", attack);
    }

    // Contained paths work uniformly
    bridge.write("v1.0.0/sub/../file.txt", b"data").await.unwrap();
    assert!(bridge.exists("v1.0.0/file.txt").await.unwrap());
    assert_eq!(bridge.read("v1.0.0//file.txt").await.unwrap(), b"data");
    assert_eq!(bridge.stat("v1.0.0/file.txt").await.unwrap().size, Some(4));

    let listed = bridge.list_dir("v1.0.0").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].path, "v1.0.0/file.txt");

    bridge.remove("v1.0.0/file.txt").await.unwrap();
    assert!(!bridge.exists("v1.0.0/file.txt").await.unwrap());
    assert!(bridge.read("v1.0.0/file.txt").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_bridge_contract_local() {
    let dir = TempDir::new().unwrap();
    let bridge = LocalBridge::new(dir.path()).unwrap();
    assert_bridge_contract(&bridge).await;
}

#[tokio::test]
async fn test_bridge_contract_memory() {
    let bridge = MemoryBridge::new("/files");
    assert_bridge_contract(&bridge).await;
}
