use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Result, bail};
use campground_scan::NotifyLimit;
use validator::Validate;

/// Directory name used under the XDG data and config roots
const APP_DIR: &str = "campsite-checker";

/// Where the campground index and credential file live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Campground index CSV written by `init`
    pub index: PathBuf,
    /// Two-line Pushsafer credential file
    pub credentials: PathBuf,
}

impl AppPaths {
    /// Resolve paths from command-line overrides and the environment.
    pub fn resolve(data_dir: Option<PathBuf>, index: Option<PathBuf>) -> Result<Self> {
        Self::from_env_values(
            data_dir,
            index,
            std::env::var_os("XDG_DATA_HOME"),
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        )
    }

    fn from_env_values(
        data_dir: Option<PathBuf>,
        index: Option<PathBuf>,
        xdg_data: Option<OsString>,
        xdg_config: Option<OsString>,
        home: Option<OsString>,
    ) -> Result<Self> {
        let index = match (index, data_dir) {
            (Some(index), _) => index,
            (None, Some(dir)) => dir.join("campgrounds.csv"),
            (None, None) => xdg_dir(xdg_data, home.clone(), ".local/share")?.join("campgrounds.csv"),
        };
        let credentials = xdg_dir(xdg_config, home, ".config")?.join("auth.txt");

        Ok(Self { index, credentials })
    }
}

fn xdg_dir(xdg: Option<OsString>, home: Option<OsString>, fallback: &str) -> Result<PathBuf> {
    let root = match (xdg.filter(|v| !v.is_empty()), home) {
        (Some(xdg), _) => PathBuf::from(xdg),
        (None, Some(home)) => PathBuf::from(home).join(fallback),
        (None, None) => bail!("neither the XDG base directory nor HOME is set"),
    };
    Ok(root.join(APP_DIR))
}

/// Daemon settings that are range-checked before polling starts.
#[derive(Debug, Clone, Validate)]
pub struct DaemonSettings {
    #[validate(range(min = 30, message = "Interval must be at least 30 seconds"))]
    pub interval_secs: u64,

    #[validate(range(min = 1, message = "Notify limit must be at least 1"))]
    pub notify_limit: u32,

    #[validate(range(min = -2, max = 2, message = "Priority must be between -2 and 2"))]
    pub priority: Option<i8>,

    #[validate(length(min = 1, message = "Device is required"))]
    pub device: String,

    pub forever: bool,
}

impl DaemonSettings {
    /// Notification limit for the poll session.
    pub fn limit(&self) -> NotifyLimit {
        if self.forever {
            NotifyLimit::Unlimited
        } else {
            NotifyLimit::Count(self.notify_limit)
        }
    }
}
