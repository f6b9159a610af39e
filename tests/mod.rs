//! Main test module for ucd-mirror
//!
//! This module includes all test suites:
//! - Integration tests for full mirror/clean/verify scenarios
//! - Property-based tests for the boundary invariant

pub mod integration;

#[cfg(test)]
mod edge_cases {
    use std::sync::Arc;
    use tempfile::TempDir;
    use ucd_mirror::bridge::FileSystemBridge;
    use ucd_mirror::manifest::StaticManifestSource;
    use ucd_mirror::*;

    async fn empty_store(dir: &TempDir) -> (Arc<MemoryBridge>, Arc<StaticManifestSource>, MirrorStore) {
        let remote = Arc::new(MemoryBridge::new("/Public"));
        let manifests = Arc::new(StaticManifestSource::new());
        let store = MirrorStoreBuilder::new()
            .local_bridge(Arc::new(LocalBridge::new(dir.path()).unwrap()))
            .remote_bridge(remote.clone())
            .build(manifests.clone())
            .await
            .unwrap();
        (remote, manifests, store)
    }

    #[tokio::test]
    async fn test_empty_manifest_version() {
        let dir = TempDir::new().unwrap();
        let (_remote, manifests, store) = empty_store(&dir).await;
        manifests.insert::<&str>("16.0.0", &[]);

        let result = store.mirror("16.0.0", &MirrorOptions::default()).await.unwrap();
        assert!(result.mirrored.is_empty());
        assert!(result.planned.is_empty());
        // A version that tracked nothing leaves no lockfile entry
        assert!(store.status().await.versions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_version_fails_whole_version() {
        let dir = TempDir::new().unwrap();
        let (_remote, _manifests, store) = empty_store(&dir).await;
        let err = store.mirror("99.0.0", &MirrorOptions::default()).await.unwrap_err();
        assert!(matches!(err, MirrorError::Manifest { .. }));
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected_before_io() {
        let dir = TempDir::new().unwrap();
        let (_remote, manifests, store) = empty_store(&dir).await;
        manifests.insert("16.0.0", &["a.txt"]);

        let options = MirrorOptions {
            concurrency: Some(Concurrency::Bounded(0)),
            ..Default::default()
        };
        let err = store.mirror("16.0.0", &options).await.unwrap_err();
        assert!(matches!(err, MirrorError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_special_filenames_survive_the_boundary_check() {
        let dir = TempDir::new().unwrap();
        let bridge = LocalBridge::new(dir.path()).unwrap();

        let names = [
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.with.dots.txt",
            "100%.txt",
            "file(with)parens.txt",
        ];
        for name in names {
            let path = format!("v16.0.0/{}", name);
            bridge.write(&path, b"content").await.unwrap();
            assert!(bridge.exists(&path).await.unwrap(), "lost {:?}", name);
        }
    }

    #[tokio::test]
    async fn test_clean_of_untracked_version_is_a_version_failure() {
        let dir = TempDir::new().unwrap();
        let (_remote, _manifests, store) = empty_store(&dir).await;

        let results = store
            .clean(&CleanOptions {
                versions: Some(vec!["3.1.0".to_string()]),
                ..Default::default()
            })
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].failed.len(), 1);
        assert_eq!(results[0].failed[0].path, "3.1.0");
        assert!(results[0].deleted.is_empty());
    }
}
