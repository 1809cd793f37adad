use std::collections::HashMap;
use std::path::PathBuf;

use chrono::DateTime;
use zbus::blocking::Connection;
use zbus::dbus_proxy;

use crate::error::{Result, SnapborgError};
use crate::snapshot::{SnapshotBackend, SnapshotRecord};

pub type RawSnapshot = (u32, u16, u32, i64, u32, String, String, HashMap<String, String>);

pub type RawConfig = (String, String, HashMap<String, String>);

#[dbus_proxy(
    interface = "org.opensuse.Snapper",
    default_service = "org.opensuse.Snapper",
    default_path = "/org/opensuse/Snapper"
)]
trait Snapper {
    fn list_configs(&self) -> zbus::Result<Vec<RawConfig>>;

    fn list_snapshots(&self, config_name: &str) -> zbus::Result<Vec<RawSnapshot>>;

    fn mount_snapshot(&self, config_name: &str, number: u32, user_request: bool)
        -> zbus::Result<String>;

    fn umount_snapshot(&self, config_name: &str, number: u32, user_request: bool)
        -> zbus::Result<()>;
}

pub struct SnapperDbus {
    proxy: SnapperProxyBlocking<'static>,
}

impl SnapperDbus {
    pub fn connect() -> Result<Self> {
        let conn = Connection::system().map_err(backend_error)?;
        let proxy = SnapperProxyBlocking::new(&conn).map_err(backend_error)?;
        Ok(Self { proxy })
    }
}

impl SnapshotBackend for SnapperDbus {
    fn list_configs(&self) -> Result<Vec<String>> {
        let configs = self.proxy.list_configs().map_err(backend_error)?;
        Ok(configs.into_iter().map(|(name, _, _)| name).collect())
    }

    fn list_snapshots(&self, config: &str) -> Result<Vec<SnapshotRecord>> {
        let raw = self.proxy.list_snapshots(config).map_err(backend_error)?;
        Ok(raw.into_iter().map(record_from_raw).collect())
    }

    fn mount_snapshot(&self, config: &str, number: u32) -> Result<PathBuf> {
        let path = self
            .proxy
            .mount_snapshot(config, number, false)
            .map_err(|e| SnapborgError::MountFailed(format!("snapper {} {}: {}", config, number, e)))?;
        Ok(PathBuf::from(path))
    }

    fn umount_snapshot(&self, config: &str, number: u32) -> Result<()> {
        self.proxy
            .umount_snapshot(config, number, false)
            .map_err(|e| SnapborgError::UnmountFailed(format!("snapper {} {}: {}", config, number, e)))
    }
}

fn backend_error(err: zbus::Error) -> SnapborgError {
    SnapborgError::Backend(err.to_string())
}

pub fn record_from_raw(raw: RawSnapshot) -> SnapshotRecord {
    let (number, kind, pre_number, date, uid, description, cleanup, userdata) = raw;
    SnapshotRecord {
        number,
        kind: kind.into(),
        pre_number,
        date: if date < 0 {
            None
        } else {
            DateTime::from_timestamp(date, 0)
        },
        uid,
        description,
        cleanup,
        userdata,
    }
}
