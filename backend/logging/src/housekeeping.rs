//! Background rotation and retention for a [`DualSink`].
//!
//! One task owns three timers (size check, UTC day boundary, prune) and
//! handles their events one at a time, so rotation and pruning never overlap
//! each other. Foreground writes keep going concurrently.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dual_sink::DualSink;
use crate::error::{LogError, Result};
use crate::global;
use crate::record::kv;
use crate::retention::{self, HUMAN_RETENTION_CEILING, JSON_RETENTION_CEILING};

const MIB: u64 = 1 << 20;

/// JSON file size that triggers a rotation.
pub const MAX_JSON_BYTES: u64 = 24 * MIB;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HousekeepingPolicy {
    pub size_check_interval: Duration,
    pub max_json_bytes: u64,
    /// Rotate at every UTC midnight.
    pub daily: bool,
    pub prune_interval: Duration,
    pub human_ceiling: usize,
    pub json_ceiling: usize,
}

impl Default for HousekeepingPolicy {
    fn default() -> Self {
        Self {
            size_check_interval: Duration::from_secs(1),
            max_json_bytes: MAX_JSON_BYTES,
            daily: true,
            prune_interval: Duration::from_secs(5),
            human_ceiling: HUMAN_RETENTION_CEILING,
            json_ceiling: JSON_RETENTION_CEILING,
        }
    }
}

/// Time left until the next UTC midnight after `now`.
pub fn until_next_utc_midnight(now: DateTime<Utc>) -> Duration {
    now.date_naive()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight) - now)
        .and_then(|left| left.to_std().ok())
        .unwrap_or(DAY)
}

/// Spawn the housekeeping loop on the current tokio runtime.
pub fn start_background_rotation(
    sink: Arc<DualSink>,
    policy: HousekeepingPolicy,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| LogError::NoRuntime)?;
    Ok(runtime.spawn(run(sink, policy, cancel)))
}

/// Run until `cancel` fires.
pub async fn run(sink: Arc<DualSink>, policy: HousekeepingPolicy, cancel: CancellationToken) {
    let log = global::internal_logger(module_path!());

    let mut size_tick = time::interval(policy.size_check_interval);
    size_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut prune_tick = time::interval(policy.prune_interval);
    prune_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let first_day = until_next_utc_midnight(Utc::now());
    let day = time::sleep(first_day);
    tokio::pin!(day);

    log.debug(
        "housekeeping timers armed",
        &[kv("next_day_in_secs", first_day.as_secs())],
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                log.debug("housekeeping cancelled", &[]);
                break;
            }
            _ = size_tick.tick() => {
                match sink.json_size() {
                    Ok(size) if size >= policy.max_json_bytes => rotate(&sink).await,
                    Ok(_) => {}
                    Err(e) => {
                        log.with_error(Some(e))
                            .error("unable to get json log file size for rotation", &[]);
                    }
                }
            }
            () = &mut day, if policy.daily => {
                day.as_mut().reset(Instant::now() + DAY);
                rotate(&sink).await;
            }
            _ = prune_tick.tick() => {
                prune(&sink, &policy).await;
            }
        }
    }
}

async fn rotate(sink: &Arc<DualSink>) {
    let sink = Arc::clone(sink);
    let result = tokio::task::spawn_blocking(move || sink.rotate()).await;
    let log = global::internal_logger(module_path!());
    match result {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            log.with_error(Some(e)).error("unable to rotate", &[]);
        }
        Err(e) => {
            log.with_error(Some(e)).error("rotation task failed", &[]);
        }
    }
}

async fn prune(sink: &Arc<DualSink>, policy: &HousekeepingPolicy) {
    let targets = [
        (sink.folder().to_path_buf(), policy.human_ceiling, sink.human_path()),
        (sink.json_folder().to_path_buf(), policy.json_ceiling, sink.json_path()),
    ];
    let result = tokio::task::spawn_blocking(move || {
        targets.map(|(dir, ceiling, live)| {
            let removed = retention::truncate_oldest(&dir, ceiling, Some(&live));
            (dir, removed)
        })
    })
    .await;

    let log = global::internal_logger(module_path!());
    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(e) => {
            log.with_error(Some(e)).error("prune task failed", &[]);
            return;
        }
    };
    for (dir, removed) in outcomes {
        match removed {
            Ok(Some(path)) => {
                log.info(
                    "removed old log file",
                    &[kv("file", path.display().to_string())],
                );
            }
            Ok(None) => {}
            Err(e) => {
                log.with_error(Some(e)).error(
                    "unable to prune log folder",
                    &[kv("folder", dir.display().to_string())],
                );
            }
        }
    }
}
