//! One-call setup: open the dual sink, make it the default, start housekeeping.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dual_sink::DualSink;
use crate::error::{LogError, Result};
use crate::housekeeping::{self, HousekeepingPolicy, MAX_JSON_BYTES};
use crate::logger::Logger;
use crate::record::kv;
use crate::retention::{HUMAN_RETENTION_CEILING, JSON_RETENTION_CEILING};
use crate::severity::Severity;

pub const ENV_FOLDER: &str = "RUNELOG_FOLDER";
pub const ENV_PREFIX: &str = "RUNELOG_PREFIX";
pub const ENV_LEVEL: &str = "RUNELOG_LEVEL";
pub const ENV_SCOPES: &str = "RUNELOG_SCOPES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub folder: PathBuf,
    pub prefix: String,
    /// Minimum severity written to the files.
    pub level: Severity,
    /// Scope override file, watched for changes.
    pub scope_config: Option<PathBuf>,
    pub rotation: RotationConfig,
    pub retention: RetentionConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("./log"),
            prefix: "app".to_string(),
            level: Severity::INFO,
            scope_config: None,
            rotation: RotationConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub max_json_bytes: u64,
    pub size_check_interval_ms: u64,
    pub daily: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_json_bytes: MAX_JSON_BYTES,
            size_check_interval_ms: 1000,
            daily: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub interval_ms: u64,
    pub human_files: usize,
    pub json_files: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            human_files: HUMAN_RETENTION_CEILING,
            json_files: JSON_RETENTION_CEILING,
        }
    }
}

impl LogConfig {
    /// Housekeeping timers and ceilings. Zero intervals are raised to 1ms.
    pub fn policy(&self) -> HousekeepingPolicy {
        let millis = |ms: u64| Duration::from_millis(ms.max(1));
        HousekeepingPolicy {
            size_check_interval: millis(self.rotation.size_check_interval_ms),
            max_json_bytes: self.rotation.max_json_bytes,
            daily: self.rotation.daily,
            prune_interval: millis(self.retention.interval_ms),
            human_ceiling: self.retention.human_files,
            json_ceiling: self.retention.json_files,
        }
    }

    /// Override fields from `RUNELOG_*` environment variables.
    pub fn apply_env(&mut self) {
        let vars: HashMap<String, String> = std::env::vars().collect();
        self.apply_env_with(&vars);
    }

    pub fn apply_env_with(&mut self, vars: &HashMap<String, String>) {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        if let Some(folder) = get(ENV_FOLDER) {
            self.folder = PathBuf::from(folder);
        }
        if let Some(prefix) = get(ENV_PREFIX) {
            self.prefix = prefix.to_string();
        }
        if let Some(level) = get(ENV_LEVEL) {
            self.level = Severity::parse(level);
        }
        if let Some(scopes) = get(ENV_SCOPES) {
            self.scope_config = Some(PathBuf::from(scopes));
        }
    }
}

/// Keeps housekeeping alive. Dropping it stops the background task;
/// [`LogGuard::shutdown`] also waits for it and closes the files.
#[derive(Debug)]
pub struct LogGuard {
    sink: Arc<DualSink>,
    logger: Logger,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LogGuard {
    pub fn sink(&self) -> &Arc<DualSink> {
        &self.sink
    }

    /// The logger installed as the process default.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                self.logger
                    .with_error(Some(e))
                    .error("housekeeping task failed", &[]);
            }
        }
        self.sink.close();
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Open the files described by `config`, install a logger on them as the
/// process default and start background rotation and pruning.
///
/// Must be called from within a tokio runtime.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| LogError::NoRuntime)?;

    let sink = Arc::new(DualSink::open(&config.folder, config.prefix.clone())?);
    sink.set_level(config.level);
    let logger = Logger::new(sink.clone());
    if let Some(path) = &config.scope_config {
        logger.scopes().attach(path)?;
    }
    logger.set_default();

    let cancel = CancellationToken::new();
    let task = runtime.spawn(housekeeping::run(
        Arc::clone(&sink),
        config.policy(),
        cancel.clone(),
    ));

    logger.debug(
        "logging initialised",
        &[
            kv("folder", config.folder.display().to_string()),
            kv("prefix", config.prefix.as_str()),
            kv("level", config.level.to_string()),
        ],
    );
    Ok(LogGuard {
        sink,
        logger,
        cancel,
        task: Some(task),
    })
}
