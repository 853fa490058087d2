use std::fs;
use std::sync::Arc;

use access_control::MockAccessResetter;
use core_types::DeletionTarget;
use file_system::StdFileSystemOps;
use process_locks::killer::MockProcessKiller;
use process_locks::resolver::MockLockResolver;
use service::cache_clearing::CacheClearingService;
use service::cancellation::CancellationFlag;
use service::forced_deletion::ForcedDeletionService;
use service::forced_deletion::context::DeletionOps;
use service::settings::DeletionSettings;
use tempfile::tempdir;

const CACHE_FOLDER: &str = "cache";

fn real_fs_service(resolver: &MockLockResolver) -> Arc<ForcedDeletionService> {
    Arc::new(ForcedDeletionService::new_with_ops(
        Arc::new(DeletionSettings {
            settle_delay_ms: 0,
            ..Default::default()
        }),
        DeletionOps {
            fs_ops: Arc::new(StdFileSystemOps),
            lock_resolver: Arc::new(resolver.clone()),
            process_killer: Arc::new(MockProcessKiller::new()),
            access_resetter: Arc::new(MockAccessResetter::new()),
        },
    ))
}

#[async_std::test]
async fn test_clear_caches_empties_directory_and_keeps_it() {
    let temp_dir = tempdir().unwrap();
    let cache_dir = temp_dir.path().join(CACHE_FOLDER);
    fs::create_dir_all(cache_dir.join("thumbs/large")).unwrap();
    fs::write(cache_dir.join("thumbs/large/1.png"), b"png").unwrap();
    fs::write(cache_dir.join("index.db"), b"db").unwrap();

    let mut readonly = fs::metadata(cache_dir.join("index.db")).unwrap().permissions();
    readonly.set_readonly(true);
    fs::set_permissions(cache_dir.join("index.db"), readonly).unwrap();

    let resolver = MockLockResolver::new();
    let service = CacheClearingService::new(real_fs_service(&resolver));
    let report = service
        .clear_caches(
            &[DeletionTarget::new(&cache_dir).unwrap()],
            CancellationFlag::new(),
            None,
        )
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.deleted.len(), 2);
    assert!(cache_dir.is_dir());
    assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 0);
    assert_eq!(resolver.total_calls(), 0);
}

#[async_std::test]
async fn test_clear_caches_creates_missing_directory() {
    let temp_dir = tempdir().unwrap();
    let cache_dir = temp_dir.path().join("not-yet").join(CACHE_FOLDER);

    let service = CacheClearingService::new(real_fs_service(&MockLockResolver::new()));
    let report = service
        .clear_caches(
            &[DeletionTarget::new(&cache_dir).unwrap()],
            CancellationFlag::new(),
            None,
        )
        .await
        .unwrap();

    assert!(report.deleted.is_empty());
    assert!(cache_dir.is_dir());
}
