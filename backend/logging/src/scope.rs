//! Scope-level overrides with hot reload.
//!
//! The config file holds one rule per line:
//!
//! ```text
//! # comment
//! app::db: DEBUG
//! app::http: warning
//! ```
//!
//! Rules are kept sorted by scope in descending byte order and the first
//! rule whose scope is a string prefix of the logger's scope wins. Prefixes
//! are not segment-aware: a rule for `app` also matches `application`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{LogError, Result};
use crate::global;
use crate::record::kv;
use crate::severity::Severity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRule {
    pub scope: String,
    pub level: Severity,
}

impl ScopeRule {
    pub fn new(scope: impl Into<String>, level: Severity) -> Self {
        Self {
            scope: scope.into(),
            level,
        }
    }
}

/// Parse `scope: LEVEL` lines. Blank, comment and colon-less lines are
/// skipped; unknown levels become [`Severity::UNKNOWN`].
pub fn parse_rules(text: &str) -> Vec<ScopeRule> {
    let mut rules: Vec<ScopeRule> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(scope, level)| ScopeRule::new(scope.trim(), Severity::parse(level)))
        .collect();
    sort_rules(&mut rules);
    rules
}

/// Descending by scope; stable, so duplicate scopes keep file order.
fn sort_rules(rules: &mut [ScopeRule]) {
    rules.sort_by(|a, b| b.scope.cmp(&a.scope));
}

pub fn read_rules(path: &Path) -> Result<Vec<ScopeRule>> {
    let text = fs::read_to_string(path).map_err(|source| LogError::ScopeConfig {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_rules(&text))
}

struct ScopeWatch {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

/// Scope-prefix → minimum severity table, swapped wholesale on reload.
#[derive(Default)]
pub struct ScopeRegistry {
    rules: RwLock<Option<Arc<Vec<ScopeRule>>>>,
    watch: Mutex<Option<ScopeWatch>>,
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("rules", &self.rules())
            .field("attached", &self.attached_path())
            .finish()
    }
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active rules. `None` when no override is active.
    pub fn rules(&self) -> Option<Arc<Vec<ScopeRule>>> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the rule list. The list is re-sorted.
    pub fn replace(&self, mut rules: Vec<ScopeRule>) {
        sort_rules(&mut rules);
        let next = Some(Arc::new(rules));
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub fn clear(&self) {
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Minimum severity of the first rule whose scope prefixes `scope`.
    pub fn resolve(&self, scope: &str) -> Option<Severity> {
        let rules = self.rules()?;
        rules
            .iter()
            .find(|rule| scope.starts_with(rule.scope.as_str()))
            .map(|rule| rule.level)
    }

    pub fn attached_path(&self) -> Option<PathBuf> {
        self.watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|w| w.path.clone())
    }

    /// Re-read `path` and swap the rules in. Returns the number of rules.
    pub fn reload(&self, path: &Path) -> Result<usize> {
        let rules = read_rules(path)?;
        let count = rules.len();
        self.replace(rules);
        Ok(count)
    }

    /// Load `path` (created empty if missing) and keep reloading it whenever
    /// it changes. Only one config can be attached at a time.
    pub fn attach(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<()> {
        let log = global::internal_logger(module_path!());
        let mut watch = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = watch.as_ref() {
            let active = active.path.clone();
            drop(watch);
            log.error(
                "trying to attach new dynamic scope configuration",
                &[
                    kv("config", path.as_ref().display().to_string()),
                    kv("active", active.display().to_string()),
                ],
            );
            return Err(LogError::ScopesAlreadyAttached(active));
        }

        let path = create_config(path.as_ref())?;
        let count = self.reload(&path)?;

        let registry = Arc::downgrade(self);
        let watched = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            on_config_event(&registry, &watched, res);
        })?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        *watch = Some(ScopeWatch {
            path: path.clone(),
            _watcher: watcher,
        });
        drop(watch);

        log.info(
            "attached dynamic scope configuration",
            &[kv("config", path.display().to_string()), kv("rules", count)],
        );
        Ok(())
    }

    /// Stop watching and drop all rules.
    pub fn detach(&self) {
        let watch = self
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(watch);
        self.clear();
    }
}

fn create_config(path: &Path) -> Result<PathBuf> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }
    let open_err = |source| LogError::ScopeConfig {
        path: path.to_path_buf(),
        source,
    };
    options.open(path).map_err(open_err)?;
    fs::canonicalize(path).map_err(open_err)
}

fn on_config_event(registry: &Weak<ScopeRegistry>, path: &Path, res: notify::Result<Event>) {
    let log = global::internal_logger(module_path!());
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            log.with_error(Some(e)).warning("scope config watch error", &[]);
            return;
        }
    };
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return;
    }
    if !event.paths.iter().any(|p| p.file_name() == path.file_name()) {
        return;
    }
    let Some(registry) = registry.upgrade() else {
        return;
    };
    log.info(
        "scope config changed, reloading",
        &[kv("config", path.display().to_string())],
    );
    let reloaded = registry.reload(path);
    log.with_result(&reloaded)
        .error("could not reload scope config", &[]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn test_parse_rules_sorted_descending() {
        let rules = parse_rules("a: debug\nb: WARNING\n");
        assert_eq!(
            rules,
            vec![
                ScopeRule::new("b", Severity::WARNING),
                ScopeRule::new("a", Severity::DEBUG),
            ]
        );
    }

    #[test]
    fn test_parse_rules_tolerates_bad_lines() {
        let rules = parse_rules("\n# comment\nno colon here\n  app::db :  trace \nweb: shouty\n");
        assert_eq!(
            rules,
            vec![
                ScopeRule::new("web", Severity::UNKNOWN),
                ScopeRule::new("app::db", Severity::TRACE),
            ]
        );
    }

    #[test]
    fn test_resolve_first_prefix_in_stored_order() {
        let registry = ScopeRegistry::new();
        registry.replace(parse_rules("b: WARNING\na: DEBUG"));
        assert_eq!(registry.resolve("a.sub"), Some(Severity::DEBUG));
        assert_eq!(registry.resolve("b.sub"), Some(Severity::WARNING));
        assert_eq!(registry.resolve("c"), None);
    }

    #[test]
    fn test_resolve_longer_prefix_sorts_first() {
        let registry = ScopeRegistry::new();
        registry.replace(vec![
            ScopeRule::new("app", Severity::ERROR),
            ScopeRule::new("app::net", Severity::DEBUG),
        ]);
        assert_eq!(registry.resolve("app::net::tcp"), Some(Severity::DEBUG));
        assert_eq!(registry.resolve("app::db"), Some(Severity::ERROR));
    }

    #[test]
    fn test_resolve_is_not_segment_aware() {
        // "app" shadows the intended target for "application::*" because
        // matching is on raw string prefixes.
        let registry = ScopeRegistry::new();
        registry.replace(parse_rules("app: FATAL\napplication::worker: DEBUG"));
        assert_eq!(registry.resolve("application::worker"), Some(Severity::DEBUG));
        assert_eq!(registry.resolve("application::api"), Some(Severity::FATAL));
    }

    #[test]
    fn test_duplicate_scopes_keep_file_order() {
        let registry = ScopeRegistry::new();
        registry.replace(parse_rules("svc: DEBUG\nsvc: ERROR"));
        assert_eq!(registry.resolve("svc::x"), Some(Severity::DEBUG));
    }

    #[test]
    fn test_empty_registry_has_no_override() {
        let registry = ScopeRegistry::new();
        assert!(registry.rules().is_none());
        assert_eq!(registry.resolve("anything"), None);
        registry.replace(Vec::new());
        assert_eq!(registry.resolve("anything"), None);
    }

    #[test]
    fn test_attach_creates_missing_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scopes.conf");
        let registry = Arc::new(ScopeRegistry::new());
        registry.attach(&path).unwrap();
        assert!(path.is_file());
        assert_eq!(registry.rules().map(|r| r.len()), Some(0));
        registry.detach();
    }

    #[test]
    fn test_attach_twice_is_refused() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("one.conf");
        let second = tmp.path().join("two.conf");
        fs::write(&first, "app: DEBUG\n").unwrap();
        let registry = Arc::new(ScopeRegistry::new());
        registry.attach(&first).unwrap();

        let err = registry.attach(&second).unwrap_err();
        assert!(matches!(err, LogError::ScopesAlreadyAttached(_)));
        assert_eq!(registry.resolve("app"), Some(Severity::DEBUG));

        registry.detach();
        assert!(registry.rules().is_none());
        registry.attach(&second).unwrap();
        registry.detach();
    }

    #[test]
    fn test_attach_reloads_on_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scopes.conf");
        fs::write(&path, "app: DEBUG\n").unwrap();
        let registry = Arc::new(ScopeRegistry::new());
        registry.attach(&path).unwrap();
        assert_eq!(registry.resolve("app::x"), Some(Severity::DEBUG));

        fs::write(&path, "app: ERROR\n").unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while registry.resolve("app::x") != Some(Severity::ERROR) {
            assert!(Instant::now() < deadline, "config was not reloaded");
            std::thread::sleep(Duration::from_millis(20));
        }
        registry.detach();
    }
}
