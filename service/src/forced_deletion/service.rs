use std::path::PathBuf;
use std::sync::Arc;

use access_control::SetAclAccessResetter;
use async_std::channel::Sender;
use core_types::{DeletionTarget, events::DeletionEvent};
use executable_runner::ops::{DefaultToolRunnerOps, ToolRunnerOps};
use file_system::StdFileSystemOps;
use process_locks::{HandleLockResolver, SysinfoProcessInspector, SysinfoProcessKiller};

use crate::{
    cancellation::CancellationFlag,
    error::Error,
    forced_deletion::{
        context::{DeletionOps, ForcedDeletionContext},
        model::DeletionOutcome,
    },
    pipeline::Pipeline,
    settings::{DeletionSettings, RetryPolicy, ToolSettings},
};

impl DeletionOps {
    /// Wires the real file system, the handle and SetACL tools and the OS process table.
    pub fn production(tools: &ToolSettings) -> Self {
        let mut search_dirs = tools.search_dirs.clone();
        match file_system::get_tools_dir() {
            Ok(tools_dir) => search_dirs.push(tools_dir),
            Err(e) => tracing::debug!("No application tools directory: {}", e),
        }

        let runner: Arc<dyn ToolRunnerOps> = Arc::new(DefaultToolRunnerOps::new());
        Self {
            fs_ops: Arc::new(StdFileSystemOps),
            lock_resolver: Arc::new(HandleLockResolver::new(
                runner.clone(),
                Arc::new(SysinfoProcessInspector),
                tools.handle_path.clone(),
                search_dirs.clone(),
            )),
            process_killer: Arc::new(SysinfoProcessKiller),
            access_resetter: Arc::new(SetAclAccessResetter::new(
                runner,
                tools.set_acl_path.clone(),
                search_dirs,
            )),
        }
    }
}

/// Deletes directory trees that are locked by other processes or protected by their ACLs.
///
/// Busy failures terminate the processes holding the failing entry open, access denied
/// failures reset its ownership and permissions, and every other failure is fatal. After the
/// delete reports success the target is checked again on its own.
///
/// Calls are independent. Two concurrent deletions of the same tree are not coordinated and
/// may both remediate the same failure.
pub struct ForcedDeletionService {
    ops: DeletionOps,
    settings: Arc<DeletionSettings>,
}

impl ForcedDeletionService {
    pub fn new(settings: Arc<DeletionSettings>, tools: &ToolSettings) -> Self {
        Self::new_with_ops(settings, DeletionOps::production(tools))
    }

    pub fn new_with_ops(settings: Arc<DeletionSettings>, ops: DeletionOps) -> Self {
        Self { ops, settings }
    }

    pub fn ops(&self) -> &DeletionOps {
        &self.ops
    }

    pub fn settings(&self) -> &DeletionSettings {
        &self.settings
    }

    pub async fn delete(&self, target: &DeletionTarget) -> Result<DeletionOutcome, Error> {
        self.delete_with_progress(
            target,
            self.settings.retry_policy(),
            CancellationFlag::new(),
            None,
        )
        .await
    }

    /// Deletes `target`, retrying within `retry_policy` until it is gone.
    ///
    /// A missing target succeeds immediately without touching any collaborator.
    pub async fn delete_with_progress(
        &self,
        target: &DeletionTarget,
        retry_policy: RetryPolicy,
        cancellation: CancellationFlag,
        progress_tx: Option<Sender<DeletionEvent>>,
    ) -> Result<DeletionOutcome, Error> {
        if !self.ops.fs_ops.exists(target.path()) {
            tracing::info!("{} does not exist, nothing to delete", target);
            return Ok(DeletionOutcome::already_absent(target.path()));
        }

        let mut context = ForcedDeletionContext::new(
            target.clone(),
            self.ops.clone(),
            self.settings.clone(),
            retry_policy,
            cancellation,
            progress_tx,
        );

        let pipeline = Pipeline::<ForcedDeletionContext>::new();
        while !context.deleted {
            pipeline.execute(&mut context).await?;
        }

        if self.ops.fs_ops.exists(target.path()) {
            tracing::error!(
                "{} still exists after {} attempt(s)",
                target,
                context.outcome.attempts
            );
            return Err(Error::PostconditionFailed(PathBuf::from(target.path())));
        }

        tracing::info!(
            "Deleted {} after {} attempt(s)",
            target,
            context.outcome.attempts
        );
        context
            .send_progress(DeletionEvent::Completed {
                path: target.path().to_path_buf(),
                attempts: context.outcome.attempts,
            })
            .await;
        Ok(context.outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::{Duration, Instant};

    use access_control::{AccessResetError, MockAccessResetter, ResetCall};
    use core_types::{ErrorClass, LockingProcessInfo};
    use file_system::ops::mock::{MockFileSystemOps, ScriptedRemoval};
    use process_locks::killer::MockProcessKiller;
    use process_locks::{LockResolverError, ProcessLockResolver};
    use process_locks::resolver::MockLockResolver;
    use tempfile::tempdir;

    use super::*;

    struct Fixture {
        fs: MockFileSystemOps,
        resolver: MockLockResolver,
        killer: MockProcessKiller,
        resetter: MockAccessResetter,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_resetter(MockAccessResetter::new())
        }

        fn with_resetter(resetter: MockAccessResetter) -> Self {
            Self {
                fs: MockFileSystemOps::new(),
                resolver: MockLockResolver::new(),
                killer: MockProcessKiller::new(),
                resetter,
            }
        }

        fn service(&self) -> ForcedDeletionService {
            self.service_with(DeletionSettings {
                settle_delay_ms: 0,
                ..Default::default()
            })
        }

        fn service_with(&self, settings: DeletionSettings) -> ForcedDeletionService {
            ForcedDeletionService::new_with_ops(
                Arc::new(settings),
                DeletionOps {
                    fs_ops: Arc::new(self.fs.clone()),
                    lock_resolver: Arc::new(self.resolver.clone()),
                    process_killer: Arc::new(self.killer.clone()),
                    access_resetter: Arc::new(self.resetter.clone()),
                },
            )
        }
    }

    fn target(path: &str) -> DeletionTarget {
        DeletionTarget::new(path).unwrap()
    }

    fn notepad(pid: u32, locked_path: &str) -> LockingProcessInfo {
        LockingProcessInfo {
            process_id: pid,
            executable_name: "notepad.exe".to_string(),
            executable_path: "C:\\Windows\\notepad.exe".to_string(),
            handle_type: "File".to_string(),
            locked_path: locked_path.to_string(),
            ..Default::default()
        }
    }

    #[async_std::test]
    async fn test_missing_target_is_noop() {
        let f = Fixture::new();

        let outcome = f.service().delete(&target("/data/gone")).await.unwrap();

        assert!(outcome.already_absent);
        assert_eq!(outcome.attempts, 0);
        assert!(f.fs.remove_calls().is_empty());
        assert_eq!(f.resolver.total_calls(), 0);
        assert!(f.killer.terminated_names().is_empty());
        assert_eq!(f.resetter.total_calls(), 0);
    }

    #[async_std::test]
    async fn test_unlocked_tree_is_deleted_in_one_attempt() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/a.txt");
        f.fs.add_path("/data/cache/sub/b.txt");

        let outcome = f.service().delete(&target("/data/cache")).await.unwrap();

        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.already_absent);
        assert!(outcome.terminated_processes.is_empty());
        assert_eq!(f.fs.remove_calls(), vec![PathBuf::from("/data/cache")]);
        assert_eq!(f.resolver.total_calls(), 0);
    }

    #[async_std::test]
    async fn test_busy_file_terminates_locker_and_well_known_process() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        f.resolver
            .push_processes(vec![notepad(100, "/data/cache/locked.txt")]);

        let outcome = f.service().delete(&target("/data/cache")).await.unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            f.resolver.queried_paths(),
            vec![PathBuf::from("/data/cache/locked.txt")]
        );
        assert_eq!(
            f.killer.terminated_names(),
            vec!["notepad.exe", "SearchProtocolHost.exe"]
        );
        assert_eq!(
            outcome.terminated_processes,
            vec!["notepad.exe", "SearchProtocolHost.exe"]
        );
        assert_eq!(f.resetter.total_calls(), 0);
    }

    #[async_std::test]
    async fn test_two_lockers_of_same_executable_are_terminated_once() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/a.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/a.txt"));
        f.resolver.push_processes(vec![
            notepad(100, "/data/cache/a.txt"),
            notepad(101, "/data/cache/b.txt"),
        ]);

        f.service().delete(&target("/data/cache")).await.unwrap();

        let notepad_kills = f
            .killer
            .terminated_names()
            .into_iter()
            .filter(|name| name == "notepad.exe")
            .count();
        assert_eq!(notepad_kills, 1);
    }

    #[async_std::test]
    async fn test_busy_with_no_lockers_still_terminates_well_known_process() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/index.db");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/index.db"));

        let outcome = f.service().delete(&target("/data/cache")).await.unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(f.killer.terminated_names(), vec!["SearchProtocolHost.exe"]);
    }

    #[async_std::test]
    async fn test_refused_termination_does_not_stop_retry() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        f.resolver
            .push_processes(vec![notepad(100, "/data/cache/locked.txt")]);
        f.killer.refuse("notepad.exe");

        let outcome = f.service().delete(&target("/data/cache")).await.unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.terminated_processes, vec!["SearchProtocolHost.exe"]);
    }

    #[async_std::test]
    async fn test_failed_lock_query_still_retries() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        f.resolver
            .push_error(LockResolverError::ToolFailed("crashed".to_string()));

        let outcome = f.service().delete(&target("/data/cache")).await.unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(f.killer.terminated_names(), vec!["SearchProtocolHost.exe"]);
    }

    #[async_std::test]
    async fn test_missing_handle_tool_is_fatal() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        f.resolver.push_error(LockResolverError::ToolUnavailable {
            tool: "handle".to_string(),
            searched: "PATH".to_string(),
        });

        let result = f.service().delete(&target("/data/cache")).await;

        assert!(matches!(result, Err(Error::ToolUnavailable(_))));
        assert_eq!(f.fs.remove_calls().len(), 1);
        assert!(f.killer.terminated_names().is_empty());
    }

    #[async_std::test]
    async fn test_access_denied_resets_acl_once_for_administrators() {
        let f = Fixture::new();
        f.fs.add_path("/data/protected/secret.txt");
        f.fs.push_removal(ScriptedRemoval::access_denied("/data/protected/secret.txt"));

        let outcome = f.service().delete(&target("/data/protected")).await.unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            f.resetter.calls(),
            vec![ResetCall {
                path: PathBuf::from("/data/protected/secret.txt"),
                principal: "Administrators".to_string(),
            }]
        );
        assert_eq!(
            outcome.acl_resets,
            vec![PathBuf::from("/data/protected/secret.txt")]
        );
        assert_eq!(f.resolver.total_calls(), 0);
        assert!(f.killer.terminated_names().is_empty());
    }

    #[async_std::test]
    async fn test_failed_acl_reset_keeps_retrying() {
        let f = Fixture::with_resetter(MockAccessResetter::with_failure(
            AccessResetError::AclResetFailed("exit 1".to_string()),
        ));
        f.fs.add_path("/data/protected/secret.txt");
        f.fs.push_removal(ScriptedRemoval::access_denied("/data/protected/secret.txt"));
        f.fs.push_removal(ScriptedRemoval::access_denied("/data/protected/secret.txt"));

        let outcome = f.service().delete(&target("/data/protected")).await.unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(f.resetter.total_calls(), 2);
        assert!(outcome.acl_resets.is_empty());
    }

    #[async_std::test]
    async fn test_missing_acl_tool_is_fatal() {
        let f = Fixture::with_resetter(MockAccessResetter::with_failure(
            AccessResetError::ToolUnavailable {
                tool: "SetACL".to_string(),
                searched: "PATH".to_string(),
            },
        ));
        f.fs.add_path("/data/protected/secret.txt");
        f.fs.push_removal(ScriptedRemoval::access_denied("/data/protected/secret.txt"));

        let result = f.service().delete(&target("/data/protected")).await;

        assert!(matches!(result, Err(Error::ToolUnavailable(_))));
        assert_eq!(f.fs.remove_calls().len(), 1);
    }

    #[async_std::test]
    async fn test_mixed_failures_use_matching_remediation() {
        let f = Fixture::new();
        f.fs.add_path("/data/mixed/a.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/mixed/a.txt"));
        f.fs.push_removal(ScriptedRemoval::access_denied("/data/mixed/b.txt"));

        let outcome = f.service().delete(&target("/data/mixed")).await.unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(f.resolver.total_calls(), 1);
        assert_eq!(f.resetter.total_calls(), 1);
    }

    #[async_std::test]
    async fn test_other_failure_is_fatal_without_remediation() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/file.txt");
        f.fs.push_removal(ScriptedRemoval::fatal("/data/cache/file.txt"));

        let result = f.service().delete(&target("/data/cache")).await;

        match result {
            Err(Error::FatalIo { path, .. }) => {
                assert_eq!(path, PathBuf::from("/data/cache/file.txt"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(f.fs.remove_calls().len(), 1);
        assert_eq!(f.resolver.total_calls(), 0);
        assert!(f.killer.terminated_names().is_empty());
        assert_eq!(f.resetter.total_calls(), 0);
    }

    #[async_std::test]
    async fn test_reported_success_with_tree_left_is_postcondition_failure() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/file.txt");
        f.fs.push_removal(ScriptedRemoval::SucceedWithoutRemoving);

        let result = f.service().delete(&target("/data/cache")).await;

        assert_eq!(
            result,
            Err(Error::PostconditionFailed(PathBuf::from("/data/cache")))
        );
        assert_eq!(f.fs.remove_calls().len(), 1);
    }

    #[async_std::test]
    async fn test_retry_limit_reports_last_failure() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        for _ in 0..5 {
            f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        }
        let service = f.service_with(DeletionSettings {
            settle_delay_ms: 0,
            max_attempts: Some(3),
            ..Default::default()
        });

        let result = service.delete(&target("/data/cache")).await;

        assert_eq!(
            result,
            Err(Error::RetryLimitReached {
                path: PathBuf::from("/data/cache/locked.txt"),
                attempts: 3,
                last_error: ErrorClass::Busy,
            })
        );
        assert_eq!(f.fs.remove_calls().len(), 3);
        assert_eq!(f.resolver.total_calls(), 2);
        assert_eq!(f.killer.terminated_names().len(), 2);
    }

    #[async_std::test]
    async fn test_deadline_stops_retrying() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        for _ in 0..5 {
            f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        }
        let service = f.service();
        let policy = RetryPolicy {
            max_attempts: None,
            deadline: Some(Duration::ZERO),
        };

        let result = service
            .delete_with_progress(&target("/data/cache"), policy, CancellationFlag::new(), None)
            .await;

        assert!(matches!(
            result,
            Err(Error::DeadlineExceeded { attempts: 1, .. })
        ));
        assert_eq!(f.resolver.total_calls(), 0);
        assert!(f.killer.terminated_names().is_empty());
    }

    #[async_std::test]
    async fn test_single_attempt_limit_skips_remediation() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        let service = f.service_with(DeletionSettings {
            settle_delay_ms: 2000,
            max_attempts: Some(1),
            ..Default::default()
        });

        let started = Instant::now();
        let result = service.delete(&target("/data/cache")).await;

        assert_eq!(
            result,
            Err(Error::RetryLimitReached {
                path: PathBuf::from("/data/cache/locked.txt"),
                attempts: 1,
                last_error: ErrorClass::Busy,
            })
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(f.resolver.total_calls(), 0);
        assert!(f.killer.terminated_names().is_empty());
    }

    #[async_std::test]
    async fn test_busy_failure_waits_settle_delay_before_retry() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        let service = f.service_with(DeletionSettings {
            settle_delay_ms: 50,
            ..Default::default()
        });

        let started = Instant::now();
        let outcome = service.delete(&target("/data/cache")).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(outcome.attempts, 2);
    }

    #[async_std::test]
    async fn test_access_denied_retry_does_not_wait_settle_delay() {
        let f = Fixture::new();
        f.fs.add_path("/data/protected/secret.txt");
        f.fs.push_removal(ScriptedRemoval::access_denied("/data/protected/secret.txt"));
        let service = f.service_with(DeletionSettings {
            settle_delay_ms: 2000,
            ..Default::default()
        });

        let started = Instant::now();
        let outcome = service.delete(&target("/data/protected")).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.acl_resets.len(), 1);
    }

    /// Resolver that cancels the running deletion while it is being queried.
    struct CancellingResolver(CancellationFlag);

    #[async_trait::async_trait]
    impl ProcessLockResolver for CancellingResolver {
        async fn find_locking_processes(
            &self,
            _path: &Path,
        ) -> Result<Vec<LockingProcessInfo>, LockResolverError> {
            self.0.cancel();
            Ok(Vec::new())
        }
    }

    #[async_std::test]
    async fn test_cancelled_between_attempts() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        let cancellation = CancellationFlag::new();
        let service = ForcedDeletionService::new_with_ops(
            Arc::new(DeletionSettings {
                settle_delay_ms: 0,
                ..Default::default()
            }),
            DeletionOps {
                fs_ops: Arc::new(f.fs.clone()),
                lock_resolver: Arc::new(CancellingResolver(cancellation.clone())),
                process_killer: Arc::new(f.killer.clone()),
                access_resetter: Arc::new(f.resetter.clone()),
            },
        );

        let result = service
            .delete_with_progress(
                &target("/data/cache"),
                RetryPolicy::default(),
                cancellation,
                None,
            )
            .await;

        assert_eq!(result, Err(Error::OperationCancelled));
        assert_eq!(f.fs.remove_calls().len(), 1);
    }

    #[async_std::test]
    async fn test_cancelled_before_start() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/file.txt");
        let cancellation = CancellationFlag::new();
        cancellation.cancel();

        let result = f
            .service()
            .delete_with_progress(
                &target("/data/cache"),
                RetryPolicy::default(),
                cancellation,
                None,
            )
            .await;

        assert_eq!(result, Err(Error::OperationCancelled));
        assert!(f.fs.remove_calls().is_empty());
    }

    #[async_std::test]
    async fn test_progress_events_follow_attempts() {
        let f = Fixture::new();
        f.fs.add_path("/data/protected/secret.txt");
        f.fs.push_removal(ScriptedRemoval::access_denied("/data/protected/secret.txt"));
        let (tx, rx) = async_std::channel::unbounded();

        f.service()
            .delete_with_progress(
                &target("/data/protected"),
                RetryPolicy::default(),
                CancellationFlag::new(),
                Some(tx),
            )
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 5);
        assert!(matches!(
            events[0],
            DeletionEvent::AttemptStarted { attempt: 1, .. }
        ));
        assert!(matches!(
            events[1],
            DeletionEvent::AttemptFailed {
                error_class: ErrorClass::AccessDenied,
                ..
            }
        ));
        assert!(matches!(events[2], DeletionEvent::AccessReset { .. }));
        assert!(matches!(
            events[3],
            DeletionEvent::AttemptStarted { attempt: 2, .. }
        ));
        assert_eq!(
            events[4],
            DeletionEvent::Completed {
                path: PathBuf::from("/data/protected"),
                attempts: 2,
            }
        );
    }

    #[async_std::test]
    async fn test_empty_always_terminate_list() {
        let f = Fixture::new();
        f.fs.add_path("/data/cache/locked.txt");
        f.fs.push_removal(ScriptedRemoval::busy("/data/cache/locked.txt"));
        let service = f.service_with(DeletionSettings {
            settle_delay_ms: 0,
            always_terminate: Vec::new(),
            ..Default::default()
        });

        service.delete(&target("/data/cache")).await.unwrap();
        assert!(f.killer.terminated_names().is_empty());
    }

    #[async_std::test]
    async fn test_deletes_real_tree() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("cache");
        std::fs::create_dir_all(root.join("nested/deeper")).unwrap();
        std::fs::write(root.join("nested/deeper/file.bin"), b"data").unwrap();
        std::fs::write(root.join("top.txt"), b"data").unwrap();

        let resolver = MockLockResolver::new();
        let service = ForcedDeletionService::new_with_ops(
            Arc::new(DeletionSettings::default()),
            DeletionOps {
                fs_ops: Arc::new(StdFileSystemOps),
                lock_resolver: Arc::new(resolver.clone()),
                process_killer: Arc::new(MockProcessKiller::new()),
                access_resetter: Arc::new(MockAccessResetter::new()),
            },
        );

        let outcome = service
            .delete(&DeletionTarget::new(&root).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert!(!root.exists());
        assert!(temp_dir.path().exists());
        assert_eq!(resolver.total_calls(), 0);
    }
}
