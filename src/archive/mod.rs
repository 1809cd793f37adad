pub mod diagnostics;
pub mod invoke;
pub mod model;
pub mod repository;
pub mod settings;

use std::ffi::OsString;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, SnapborgError};
use crate::types::RunMode;
use crate::util::command::niced_command;

pub use invoke::CommandResult;
pub use model::Archive;
pub use repository::Repository;
pub use settings::{ArchiveSettings, SecretEnv};

pub const NOW_PLACEHOLDER: &str = "{now:%Y-%m-%dT%H:%M:%S}";

pub struct ArchiveClient<'a> {
    repo: &'a Repository,
    settings: &'a ArchiveSettings,
    run_mode: RunMode,
}

impl<'a> ArchiveClient<'a> {
    pub fn new(repo: &'a Repository, settings: &'a ArchiveSettings, run_mode: RunMode) -> Self {
        Self {
            repo,
            settings,
            run_mode,
        }
    }

    pub fn repository(&self) -> &Repository {
        self.repo
    }

    pub fn archive_prefix(&self) -> String {
        format!(
            "{}-{}{}",
            self.settings.hostname,
            self.repo.name(),
            self.settings.archive_suffix
        )
    }

    pub fn archive_name(&self, snapshot_id: u32) -> String {
        format!("{}{}-{}", self.archive_prefix(), snapshot_id, NOW_PLACEHOLDER)
    }

    pub fn prune_glob(&self) -> String {
        self.settings
            .prune_glob
            .clone()
            .unwrap_or_else(|| format!("{}*", self.archive_prefix()))
    }

    pub fn exists(&self) -> bool {
        self.repo.path().exists()
    }

    pub fn init(&self) -> Result<()> {
        if self.run_mode.dry_run {
            println!("dry-run: borg init {}", self.repo.path().display());
            return Ok(());
        }
        let args = vec![
            OsString::from("--encryption"),
            self.repo.encryption().into(),
            self.repo.path().into(),
        ];
        self.invoke("init", args)?;
        info!(repository = %self.repo.name(), path = %self.repo.path().display(), "repository initialized");
        Ok(())
    }

    /// `Ok(None)` on a dry run or an unreadable JSON summary.
    pub fn create(&self, snapshot_id: u32, source: &Path) -> Result<Option<Archive>> {
        let mut args: Vec<OsString> = Vec::new();
        if self.run_mode.dry_run {
            args.push("--dry-run".into());
        } else {
            args.push("--json".into());
        }
        args.push("--compression".into());
        args.push(self.repo.compression().into());
        for flag in &self.settings.create_flags {
            // borg rejects --stats together with --dry-run
            if self.run_mode.dry_run && (flag == "-s" || flag == "--stats") {
                continue;
            }
            args.push(flag.into());
        }
        args.push(self.repo.location(&self.archive_name(snapshot_id)).into());
        args.push(source.into());

        let result = self.invoke("create", args)?;
        if self.run_mode.dry_run {
            return Ok(None);
        }
        match model::parse_create(&result.stdout, source.to_path_buf()) {
            Some(archive) => {
                info!(repository = %self.repo.name(), archive = %archive.name, "archive created");
                Ok(Some(archive))
            }
            None => {
                warn!(
                    error = %SnapborgError::MalformedResponse(result.command),
                    "archive created but summary unreadable"
                );
                Ok(None)
            }
        }
    }

    pub fn list(&self) -> Result<Vec<Archive>> {
        let args = vec![OsString::from("--json"), self.repo.path().into()];
        let result = self.invoke("list", args)?;
        match model::parse_list(&result.stdout) {
            Some(archives) => Ok(archives),
            None => {
                warn!(
                    error = %SnapborgError::MalformedResponse(result.command),
                    "treating listing as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    pub fn prune(&self) -> Result<()> {
        let mut args: Vec<OsString> = Vec::new();
        if self.run_mode.dry_run {
            args.push("--dry-run".into());
            args.push("--list".into());
        }
        args.extend(self.repo.prune_flags().iter().map(OsString::from));
        args.push("--glob-archives".into());
        args.push(self.prune_glob().into());
        args.push(self.repo.path().into());
        self.invoke("prune", args)?;
        info!(repository = %self.repo.name(), "pruned");
        Ok(())
    }

    pub fn compact(&self) -> Result<()> {
        if self.run_mode.dry_run {
            println!("dry-run: borg compact {}", self.repo.path().display());
            return Ok(());
        }
        self.invoke("compact", vec![self.repo.path().into()])?;
        info!(repository = %self.repo.name(), "compacted");
        Ok(())
    }

    pub fn command_args(&self, subcommand: &str, args: Vec<OsString>) -> Vec<OsString> {
        let mut argv = vec![OsString::from(subcommand), OsString::from("--log-json")];
        argv.extend(args);
        argv
    }

    fn invoke(&self, subcommand: &str, args: Vec<OsString>) -> Result<CommandResult> {
        let argv = self.command_args(subcommand, args);
        let mut cmd = niced_command(
            &self.settings.program,
            &argv,
            self.settings.niceness,
            self.settings.io_niceness,
        );
        self.settings.secrets.apply(&mut cmd);
        let result = invoke::execute(cmd, self.settings.timeout)?;
        for diagnostic in result.diagnostics.iter().filter(|d| !d.is_noise()) {
            if diagnostic.is_error() || diagnostic.is_warning() {
                warn!(repository = %self.repo.name(), "borg {}: {}", subcommand, diagnostic);
            } else {
                debug!(repository = %self.repo.name(), "borg {}: {}", subcommand, diagnostic);
            }
        }
        result.into_checked()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    pub(crate) fn fake_borg(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("borg");
        let log = dir.join("calls.log");
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> '{log}'\necho \"env BORG_PASSPHRASE=${{BORG_PASSPHRASE-unset}} BORG_PASSCOMMAND=${{BORG_PASSCOMMAND-unset}}\" >> '{log}'\n{body}\n",
            log = log.display(),
            body = body
        );
        fs::write(&path, script).expect("write fake borg");
        let mut perms = fs::metadata(&path).expect("stat").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    pub(crate) fn calls(dir: &Path) -> String {
        fs::read_to_string(dir.join("calls.log")).unwrap_or_default()
    }

    pub(crate) fn repo_in(dir: &Path) -> Repository {
        Repository::new(
            "root",
            "root",
            dir.join("repo"),
            "repokey-blake2",
            "auto,zstd",
            vec!["--keep-within".to_string(), "1d".to_string()],
        )
    }

    pub(crate) fn settings_for(program: &Path) -> ArchiveSettings {
        let mut settings = ArchiveSettings::new(program.to_string_lossy(), "host");
        settings.create_flags = vec!["-x".to_string(), "-s".to_string()];
        settings.archive_suffix = "-snap-".to_string();
        settings
    }

    #[test]
    fn archive_name_uses_host_repo_suffix_and_borg_timestamp() {
        let dir = TempDir::new().expect("tempdir");
        let repo = repo_in(dir.path());
        let settings = settings_for(Path::new("borg"));
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());
        assert_eq!(
            client.archive_name(3),
            "host-root-snap-3-{now:%Y-%m-%dT%H:%M:%S}"
        );
        assert_eq!(client.prune_glob(), "host-root-snap-*");
    }

    #[test]
    fn archive_names_differ_per_repository_and_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let root = repo_in(dir.path());
        let home = Repository::new("home", "home", dir.path().join("home"), "none", "lz4", Vec::new());
        let settings = settings_for(Path::new("borg"));
        let a = ArchiveClient::new(&root, &settings, RunMode::default());
        let b = ArchiveClient::new(&home, &settings, RunMode::default());
        assert_ne!(a.archive_name(3), a.archive_name(4));
        assert_ne!(a.archive_name(3), b.archive_name(3));
        assert_ne!(a.archive_name(1), a.archive_name(11));
    }

    #[test]
    fn create_passes_flags_and_location_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), "echo '{\"archive\":{\"name\":\"host-root-snap-3-x\",\"start\":\"2026-10-18T01:00:00.000000\"}}'");
        let repo = repo_in(dir.path());
        let mut settings = settings_for(&borg);
        settings.secrets = SecretEnv::new(None, None, Some("cat /root/.borg_password"));
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());

        let archive = client
            .create(3, Path::new("/tmp/borg/root/3"))
            .expect("create")
            .expect("archive");
        assert_eq!(archive.name, "host-root-snap-3-x");

        let log = calls(dir.path());
        let expected = format!(
            "create --log-json --json --compression auto,zstd -x -s {}::host-root-snap-3-{{now:%Y-%m-%dT%H:%M:%S}} /tmp/borg/root/3",
            repo.path().display()
        );
        assert!(log.contains(&expected), "{}", log);
        assert!(log.contains("BORG_PASSPHRASE=unset"));
        assert!(log.contains("BORG_PASSCOMMAND=cat /root/.borg_password"));
    }

    #[test]
    fn dry_run_create_drops_json_and_stats() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), "exit 0");
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let run_mode = RunMode {
            dry_run: true,
            verbose: false,
        };
        let client = ArchiveClient::new(&repo, &settings, run_mode);
        assert!(client.create(7, Path::new("/tmp/borg/root/7")).expect("create").is_none());
        let log = calls(dir.path());
        assert!(log.contains("create --log-json --dry-run --compression auto,zstd -x "));
        assert!(!log.contains(" -s "));
        assert!(!log.contains("--json "));
    }

    #[test]
    fn malformed_create_summary_is_not_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), "echo 'Archive created'");
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());
        let archive = client.create(3, Path::new("/tmp/borg/root/3")).expect("create");
        assert!(archive.is_none());
    }

    #[test]
    fn malformed_listing_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), "echo '{not json'");
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());
        assert!(client.list().expect("list").is_empty());
    }

    #[test]
    fn listing_returns_archives() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(
            dir.path(),
            "echo '{\"archives\":[{\"archive\":\"a\",\"name\":\"a\",\"time\":\"2026-10-18T01:00:00.000000\"}]}'",
        );
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());
        let archives = client.list().expect("list");
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].name, "a");
        assert!(calls(dir.path()).contains(&format!("list --log-json --json {}", repo.path().display())));
    }

    #[test]
    fn failed_prune_carries_diagnostics() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(
            dir.path(),
            "echo '{\"type\":\"log_message\",\"levelname\":\"ERROR\",\"message\":\"Repository does not exist.\"}' >&2\nexit 2",
        );
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());
        match client.prune() {
            Err(SnapborgError::ArchiveToolFailed { diagnostics, status, .. }) => {
                assert_eq!(status, "exit code 2");
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].to_string(), "ERROR: Repository does not exist.");
            }
            other => panic!("expected ArchiveToolFailed, got {:?}", other),
        }
        let log = calls(dir.path());
        assert!(log.contains(&format!(
            "prune --log-json --keep-within 1d --glob-archives host-root-snap-* {}",
            repo.path().display()
        )));
    }

    #[test]
    fn failed_init_is_archive_tool_failure() {
        let dir = TempDir::new().expect("tempdir");
        let borg = fake_borg(dir.path(), "echo 'A repository already exists' >&2\nexit 2");
        let repo = repo_in(dir.path());
        let settings = settings_for(&borg);
        let client = ArchiveClient::new(&repo, &settings, RunMode::default());
        let err = client.init().expect_err("init must fail");
        assert!(matches!(err, SnapborgError::ArchiveToolFailed { .. }));
        assert!(err.to_string().contains("A repository already exists"));
        assert!(calls(dir.path()).contains("init --log-json --encryption repokey-blake2 "));
    }
}
