use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::archive::{Archive, ArchiveClient, ArchiveSettings, Repository};
use crate::error::{Result, SnapborgError};
use crate::mount::{BindMounter, MountOps};
use crate::snapshot::{SnapshotBackend, SnapshotHandle, SnapshotSource};
use crate::types::RunMode;

#[derive(Debug, Clone)]
pub struct BackupReport {
    pub repository: String,
    pub snapshot: u32,
    pub source: PathBuf,
    pub archive: Option<Archive>,
}

pub struct Orchestrator<'a, B: SnapshotBackend, M: MountOps> {
    source: SnapshotSource<B>,
    binder: BindMounter<M>,
    settings: &'a ArchiveSettings,
    run_mode: RunMode,
}

impl<'a, B: SnapshotBackend, M: MountOps> Orchestrator<'a, B, M> {
    pub fn new(
        source: SnapshotSource<B>,
        binder: BindMounter<M>,
        settings: &'a ArchiveSettings,
        run_mode: RunMode,
    ) -> Self {
        Self {
            source,
            binder,
            settings,
            run_mode,
        }
    }

    pub fn source(&self) -> &SnapshotSource<B> {
        &self.source
    }

    pub fn binder(&self) -> &BindMounter<M> {
        &self.binder
    }

    pub fn recover(&self) {
        for err in self.binder.recover_stale() {
            warn!(error = %err, "stale mount recovery");
        }
    }

    /// Archives the latest snapshot; both mounts are torn down before this returns.
    pub fn backup(&self, repo: &Repository) -> Result<BackupReport> {
        info!(repository = %repo.name(), config = %repo.snapper_config(), "backup start");
        let mut handle = match self.source.latest(repo.snapper_config()) {
            Ok(handle) => handle,
            Err(err) => {
                error!(repository = %repo.name(), error = %err, "no snapshot to back up");
                return Err(err);
            }
        };

        let client = ArchiveClient::new(repo, self.settings, self.run_mode);
        let outcome = self.archive_snapshot(&client, &mut handle);
        for err in self.cleanup(&mut handle) {
            warn!(repository = %repo.name(), error = %err, "cleanup");
        }

        match outcome {
            Ok((source, archive)) => {
                info!(repository = %repo.name(), snapshot = handle.id(), "backup done");
                Ok(BackupReport {
                    repository: repo.name().to_string(),
                    snapshot: handle.id(),
                    source,
                    archive,
                })
            }
            Err(err) => {
                error!(repository = %repo.name(), snapshot = handle.id(), error = %err, "backup failed");
                Err(err)
            }
        }
    }

    fn archive_snapshot(
        &self,
        client: &ArchiveClient<'_>,
        handle: &mut SnapshotHandle,
    ) -> Result<(PathBuf, Option<Archive>)> {
        self.source.mount(handle)?;
        let bound = self.binder.bind(handle)?;
        if !client.exists() {
            info!(
                repository = %client.repository().name(),
                path = %client.repository().path().display(),
                "repository missing; initializing"
            );
            client.init()?;
        }
        let archive = client.create(handle.id(), &bound)?;
        Ok((bound, archive))
    }

    fn cleanup(&self, handle: &mut SnapshotHandle) -> Vec<SnapborgError> {
        let mut errors = Vec::new();
        if let Err(err) = self.binder.release(handle) {
            errors.push(err);
        }
        if let Err(err) = self.source.unmount(handle) {
            errors.push(err);
        }
        errors
    }
}

pub fn prune(repo: &Repository, settings: &ArchiveSettings, run_mode: RunMode) -> Result<()> {
    let client = ArchiveClient::new(repo, settings, run_mode);
    info!(repository = %repo.name(), glob = %client.prune_glob(), "prune start");
    client.prune()?;
    if settings.compact_after_prune {
        client.compact()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::{calls, fake_borg, repo_in, settings_for};
    use crate::error::EXIT_RUN_FAILED;
    use crate::mount::bind::tests::FakeMounts;
    use crate::snapshot::tests::FakeSnapper;
    use crate::snapshot::MountState;
    use std::fs;
    use tempfile::TempDir;

    const CREATED: &str =
        "echo '{\"archive\":{\"name\":\"host-root-snap-3-2026-10-18T01:00:00\",\"start\":\"2026-10-18T01:00:00.000000\"}}'";

    fn orchestrator<'a>(
        snapper: FakeSnapper,
        mounts: FakeMounts,
        prefix: &std::path::Path,
        settings: &'a ArchiveSettings,
    ) -> Orchestrator<'a, FakeSnapper, FakeMounts> {
        Orchestrator::new(
            SnapshotSource::new(snapper),
            BindMounter::new(mounts, prefix),
            settings,
            RunMode::default(),
        )
    }

    #[test]
    fn backup_archives_latest_snapshot_and_tears_down() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), CREATED);
        let repo = repo_in(dir.path());
        fs::create_dir_all(repo.path()).expect("repo dir");
        let settings = settings_for(&borg);
        let prefix = dir.path().canonicalize().expect("canonical").join("bind");
        let orch = orchestrator(
            FakeSnapper::with("root", &[0, 1, 3]),
            FakeMounts::default(),
            &prefix,
            &settings,
        );

        let report = orch.backup(&repo).expect("backup");
        let bound = prefix.join("root").join("3");
        assert_eq!(report.snapshot, 3);
        assert_eq!(report.source, bound);
        assert_eq!(
            report.archive.map(|a| a.name),
            Some("host-root-snap-3-2026-10-18T01:00:00".to_string())
        );

        let log = calls(dir.path());
        assert!(log.contains(&format!(
            "{}::host-root-snap-3-{{now:%Y-%m-%dT%H:%M:%S}} {}",
            repo.path().display(),
            bound.display()
        )));
        assert!(!log.contains("init --log-json"));
        assert_eq!(
            orch.source().backend().calls(),
            vec!["list root", "mount root 3", "umount root 3"]
        );
        assert_eq!(
            orch.binder().ops().calls(),
            vec![
                format!("bind /.snapshots/3/snapshot {}", bound.display()),
                format!("umount {}", bound.display()),
            ]
        );
        assert!(orch.binder().ops().mounted.borrow().is_empty());
        assert!(!bound.exists());
    }

    #[test]
    fn archive_failure_still_unbinds_and_unmounts() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(
            dir.path(),
            "echo '{\"message\":\"repository does not exist\"}' >&2\nexit 2",
        );
        let repo = repo_in(dir.path());
        fs::create_dir_all(repo.path()).expect("repo dir");
        let settings = settings_for(&borg);
        let prefix = dir.path().canonicalize().expect("canonical").join("bind");
        let orch = orchestrator(
            FakeSnapper::with("root", &[3]),
            FakeMounts::default(),
            &prefix,
            &settings,
        );

        let err = orch.backup(&repo).expect_err("create fails");
        match &err {
            SnapborgError::ArchiveToolFailed { diagnostics, .. } => {
                assert_eq!(diagnostics[0].to_string(), "repository does not exist")
            }
            other => panic!("expected ArchiveToolFailed, got {:?}", other),
        }
        assert_eq!(err.exit_code(), EXIT_RUN_FAILED);
        assert_eq!(
            orch.source().backend().calls(),
            vec!["list root", "mount root 3", "umount root 3"]
        );
        assert!(orch.binder().ops().mounted.borrow().is_empty());
        assert_eq!(orch.binder().ops().calls().len(), 2);
    }

    #[test]
    fn no_snapshots_means_no_mounts_and_no_borg() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), CREATED);
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let orch = orchestrator(
            FakeSnapper::with("root", &[]),
            FakeMounts::default(),
            &dir.path().join("bind"),
            &settings,
        );

        assert!(matches!(
            orch.backup(&repo),
            Err(SnapborgError::NoSnapshotsFound(_))
        ));
        assert_eq!(orch.source().backend().calls(), vec!["list root"]);
        assert!(orch.binder().ops().calls().is_empty());
        assert!(calls(dir.path()).is_empty());
    }

    #[test]
    fn bind_failure_unmounts_snapshot_without_archiving() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), CREATED);
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let mounts = FakeMounts {
            fail_bind: true,
            ..FakeMounts::default()
        };
        let orch = orchestrator(
            FakeSnapper::with("root", &[4]),
            mounts,
            &dir.path().join("bind"),
            &settings,
        );

        assert!(matches!(
            orch.backup(&repo),
            Err(SnapborgError::MountFailed(_))
        ));
        assert_eq!(
            orch.source().backend().calls(),
            vec!["list root", "mount root 4", "umount root 4"]
        );
        assert!(calls(dir.path()).is_empty());
    }

    #[test]
    fn unbind_failure_is_logged_not_returned() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), CREATED);
        let repo = repo_in(dir.path());
        fs::create_dir_all(repo.path()).expect("repo dir");
        let settings = settings_for(&borg);
        let mounts = FakeMounts {
            fail_unmount: true,
            ..FakeMounts::default()
        };
        let orch = orchestrator(
            FakeSnapper::with("root", &[3]),
            mounts,
            &dir.path().join("bind"),
            &settings,
        );

        let report = orch.backup(&repo).expect("create outcome decides");
        assert_eq!(report.snapshot, 3);
        // snapper unmount is still attempted
        assert_eq!(
            orch.source().backend().calls().last().map(String::as_str),
            Some("umount root 3")
        );
    }

    #[test]
    fn missing_repository_is_initialized_before_create() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), CREATED);
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let orch = orchestrator(
            FakeSnapper::with("root", &[3]),
            FakeMounts::default(),
            &dir.path().join("bind"),
            &settings,
        );

        orch.backup(&repo).expect("backup");
        let log = calls(dir.path());
        let init = log.find("init --log-json").expect("init called");
        let create = log.find("create --log-json").expect("create called");
        assert!(init < create);
    }

    #[test]
    fn prune_never_touches_snapshots() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), "exit 0");
        let repo = repo_in(dir.path());
        let mut settings = settings_for(&borg);
        settings.compact_after_prune = true;
        prune(&repo, &settings, RunMode::default()).expect("prune");
        let log = calls(dir.path());
        assert!(log.contains("prune --log-json --keep-within 1d --glob-archives host-root-snap-*"));
        assert!(log.contains(&format!("compact --log-json {}", repo.path().display())));
    }

    #[test]
    fn handle_state_is_unmounted_after_run() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), "exit 1");
        let repo = repo_in(dir.path());
        fs::create_dir_all(repo.path()).expect("repo dir");
        let settings = settings_for(&borg);
        let orch = orchestrator(
            FakeSnapper::with("root", &[8]),
            FakeMounts::default(),
            &dir.path().join("bind"),
            &settings,
        );
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());
        let mut handle = orch.source().latest("root").expect("latest");
        assert!(orch.archive_snapshot(&client, &mut handle).is_err());
        assert!(matches!(handle.state(), MountState::BindMounted { .. }));
        assert!(orch.cleanup(&mut handle).is_empty());
        assert_eq!(handle.state(), &MountState::Unmounted);
    }
}
