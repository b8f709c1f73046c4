use anyhow::Context;
use crowdsafe_core::dashboard::DEFAULT_WINDOW;
use crowdsafe_core::upload::{UploadPolicy, DEFAULT_MAX_UPLOAD_BYTES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    /// Directory holding the storage buckets.
    pub storage_root: PathBuf,
    pub bucket: String,
    /// JSON-lines table file; rows stay in memory when unset.
    pub store_path: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub dashboard_window: usize,
    pub page_limit: usize,
    /// Fixed analyzer seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            storage_root: PathBuf::from("data/storage"),
            bucket: "crowd-videos".into(),
            store_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            dashboard_window: DEFAULT_WINDOW,
            page_limit: 100,
            seed: None,
        }
    }
}

impl ServiceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading service config {}", path_ref.display()))?;
        let config: ServiceConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing service config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        bind: SocketAddr,
        storage_root: PathBuf,
        store_path: Option<PathBuf>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            bind,
            storage_root,
            store_path,
            seed,
            ..Default::default()
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.max_upload_bytes)
    }

    /// Clamps a requested page size to `1..=page_limit`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.dashboard_window)
            .clamp(1, self.page_limit.max(1))
    }
}
