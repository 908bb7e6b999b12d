use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScoutConfig: file-based config loader (review-scout.json) with env-var fallback
// ---------------------------------------------------------------------------

/// What to do when the "all results" category tab cannot be located.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabMissingPolicy {
    /// Clear the job and go home.
    #[default]
    Fatal,
    /// Log it and walk whatever listing the search page shows.
    Continue,
}

impl TabMissingPolicy {
    pub fn parse_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fatal" | "error" => Some(TabMissingPolicy::Fatal),
            "continue" | "soft" => Some(TabMissingPolicy::Continue),
            _ => None,
        }
    }
}

/// Top-level config loaded from `review-scout.json`.
///
/// Every field is optional; `resolve_*` accessors apply JSON field → env var →
/// built-in default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    /// Poll interval for container waits. Default: 500.
    pub poll_interval_ms: Option<u64>,
    /// Give-up point for container waits. Default: 10 000.
    pub wait_timeout_ms: Option<u64>,
    /// Search endpoint; the keyword goes into `q`.
    pub search_url: Option<String>,
    /// Locations a job may start from. The first one is "home".
    pub home_locations: Option<Vec<String>>,
    /// Listing `offset` step. Default: 30.
    pub places_per_page: Option<u32>,
    /// Pause after each scroll / in-feed page switch. Default: 500.
    pub dynamic_load_ms: Option<u64>,
    /// Scroll repeats before giving up on lazy loading. Default: 10.
    pub max_scroll_repeat: Option<u32>,
    /// Page-settle budget after a navigation. Default: 15 000.
    pub settle_timeout_ms: Option<u64>,
    /// Relay endpoint for the processor. Default: `ws://localhost:4567`.
    pub relay_url: Option<String>,
    /// Where the fallback `data.json` lands.
    pub export_dir: Option<String>,
    /// Where job documents are kept.
    pub jobs_dir: Option<String>,
    /// `fatal` | `continue`.
    pub tab_missing_policy: Option<TabMissingPolicy>,
}

pub const ENV_CONFIG_PATH: &str = "REVIEW_SCOUT_CONFIG";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

const DEFAULT_SEARCH_URL: &str = "https://www.tripadvisor.in/Search";
const DEFAULT_HOME_LOCATIONS: [&str; 2] =
    ["https://www.tripadvisor.in", "https://www.tripadvisor.com"];
const DEFAULT_RELAY_URL: &str = "ws://localhost:4567";

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Out-of-range values are ignored rather than wrapped.
fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ScoutConfig {
    /// `poll_interval_ms` → `REVIEW_SCOUT_POLL_INTERVAL_MS` → 500 ms.
    pub fn resolve_poll_interval(&self) -> Duration {
        let ms = self
            .poll_interval_ms
            .or_else(|| env_u64("REVIEW_SCOUT_POLL_INTERVAL_MS"))
            .unwrap_or(500);
        Duration::from_millis(ms)
    }

    /// `wait_timeout_ms` → `REVIEW_SCOUT_WAIT_TIMEOUT_MS` → 10 s.
    pub fn resolve_wait_timeout(&self) -> Duration {
        let ms = self
            .wait_timeout_ms
            .or_else(|| env_u64("REVIEW_SCOUT_WAIT_TIMEOUT_MS"))
            .unwrap_or(10_000);
        Duration::from_millis(ms)
    }

    pub fn resolve_search_url(&self) -> String {
        non_empty(&self.search_url)
            .or_else(|| env_string("REVIEW_SCOUT_SEARCH_URL"))
            .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string())
    }

    /// Allowed home locations; `REVIEW_SCOUT_HOME_LOCATIONS` is comma-separated.
    pub fn resolve_home_locations(&self) -> Vec<String> {
        if let Some(list) = &self.home_locations {
            let list: Vec<String> = list
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !list.is_empty() {
                return list;
            }
        }
        if let Some(raw) = env_string("REVIEW_SCOUT_HOME_LOCATIONS") {
            let list: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !list.is_empty() {
                return list;
            }
        }
        DEFAULT_HOME_LOCATIONS.iter().map(|s| s.to_string()).collect()
    }

    pub fn resolve_places_per_page(&self) -> u32 {
        self.places_per_page
            .or_else(|| env_u32("REVIEW_SCOUT_PLACES_PER_PAGE"))
            .filter(|v| *v > 0)
            .unwrap_or(30)
    }

    pub fn resolve_dynamic_load(&self) -> Duration {
        Duration::from_millis(
            self.dynamic_load_ms
                .or_else(|| env_u64("REVIEW_SCOUT_DYNAMIC_LOAD_MS"))
                .unwrap_or(500),
        )
    }

    pub fn resolve_max_scroll_repeat(&self) -> u32 {
        self.max_scroll_repeat
            .or_else(|| env_u32("REVIEW_SCOUT_MAX_SCROLL_REPEAT"))
            .unwrap_or(10)
    }

    pub fn resolve_settle_timeout(&self) -> Duration {
        Duration::from_millis(
            self.settle_timeout_ms
                .or_else(|| env_u64("REVIEW_SCOUT_SETTLE_TIMEOUT_MS"))
                .unwrap_or(15_000),
        )
    }

    pub fn resolve_relay_url(&self) -> String {
        non_empty(&self.relay_url)
            .or_else(|| env_string("REVIEW_SCOUT_RELAY_URL"))
            .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string())
    }

    /// `export_dir` → `REVIEW_SCOUT_EXPORT_DIR` → download dir → cwd.
    pub fn resolve_export_dir(&self) -> PathBuf {
        non_empty(&self.export_dir)
            .or_else(|| env_string("REVIEW_SCOUT_EXPORT_DIR"))
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// `jobs_dir` → `REVIEW_SCOUT_JOBS_DIR` → `~/.review-scout/jobs`.
    pub fn resolve_jobs_dir(&self) -> PathBuf {
        if let Some(dir) = non_empty(&self.jobs_dir).or_else(|| env_string("REVIEW_SCOUT_JOBS_DIR"))
        {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .map(|h| h.join(".review-scout").join("jobs"))
            .unwrap_or_else(|| PathBuf::from(".review-scout/jobs"))
    }

    pub fn resolve_tab_missing_policy(&self) -> TabMissingPolicy {
        if let Some(p) = self.tab_missing_policy {
            return p;
        }
        env_string("REVIEW_SCOUT_TAB_MISSING_POLICY")
            .and_then(|v| TabMissingPolicy::parse_str(&v))
            .unwrap_or_default()
    }
}

/// Load `review-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `REVIEW_SCOUT_CONFIG` env var path
/// 2. `./review-scout.json`
/// 3. `../review-scout.json`
///
/// Missing file → `ScoutConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<PathBuf> = {
        let mut v = vec![
            PathBuf::from("review-scout.json"),
            PathBuf::from("../review-scout.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return match serde_json::from_str::<ScoutConfig>(&contents) {
            Ok(cfg) => {
                tracing::info!("review-scout.json loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    "review-scout.json parse error at {}: {}; using defaults",
                    path.display(),
                    e
                );
                ScoutConfig::default()
            }
        };
    }

    ScoutConfig::default()
}

/// Optional override for the Chromium-family browser executable.
pub fn chrome_executable_override() -> Option<String> {
    let p = env_string(ENV_CHROME_EXECUTABLE)?;
    if std::path::Path::new(&p).exists() {
        Some(p)
    } else {
        None
    }
}
