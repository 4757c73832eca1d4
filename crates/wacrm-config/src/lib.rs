use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use wacrm_core::rules::validate_suffix_len;
use wacrm_core::{
    CandidateSource, DrawerClosePolicy, MatchPolicy, NumberPlan, DEFAULT_SUFFIX_LEN, MIN_DIGITS,
};

const APP_DIR: &str = "wacrm";
const CONFIG_FILENAME: &str = "config.toml";

/// Longest any single wait or budget may be configured to.
pub const MAX_WAIT_MS: u64 = 30_000;
pub const MAX_ATTEMPTS: u32 = 1_000;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub drawer: DrawerConfig,
    pub chains: ChainsConfig,
    pub number_plan: NumberPlan,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub min_digits: usize,
    pub dedup_suffix_len: usize,
    pub main_area_wait: Duration,
    pub main_area_poll: Duration,
    pub settle: Duration,
    pub settle_poll: Duration,
    pub debounce: Duration,
    pub mutation_debounce: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_digits: MIN_DIGITS,
            dedup_suffix_len: DEFAULT_SUFFIX_LEN,
            main_area_wait: Duration::from_millis(1500),
            main_area_poll: Duration::from_millis(50),
            settle: Duration::from_millis(600),
            settle_poll: Duration::from_millis(80),
            debounce: Duration::from_millis(130),
            mutation_debounce: Duration::from_millis(150),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrawerConfig {
    pub poll: Duration,
    pub normal_attempts: u32,
    pub aggressive_attempts: u32,
    pub render_settle: Duration,
    pub close_policy: DrawerClosePolicy,
    pub text_match: MatchPolicy,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(70),
            normal_attempts: 18,
            aggressive_attempts: 36,
            render_settle: Duration::from_millis(150),
            close_policy: DrawerClosePolicy::LeaveOpen,
            text_match: MatchPolicy::First,
        }
    }
}

/// Page-reading strategies tried before (and after) the drawer.
///
/// The drawer stages themselves are fixed and cannot be listed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainsConfig {
    pub quick: Vec<CandidateSource>,
    pub masked_quick: Vec<CandidateSource>,
    pub masked_fallback: Vec<CandidateSource>,
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self {
            quick: vec![CandidateSource::AttributeSweep, CandidateSource::HeaderSubtitle],
            masked_quick: vec![CandidateSource::HeaderSubtitle],
            masked_fallback: vec![CandidateSource::Url],
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub backend: NotificationBackend,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: NotificationBackend::Stdout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationBackend {
    Stdout,
    Json,
    Desktop,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("config file permissions too permissive: {0}")]
    InsecurePermissions(PathBuf),
    #[error("invalid min_digits value: {0}")]
    InvalidMinDigits(usize),
    #[error("invalid dedup_suffix_len value: {0}")]
    InvalidSuffixLength(usize),
    #[error("invalid {field} value: {value}")]
    InvalidDuration { field: &'static str, value: u64 },
    #[error("invalid {field} value: {value}")]
    InvalidAttempts { field: &'static str, value: u32 },
    #[error("aggressive_attempts ({aggressive}) must not be below normal_attempts ({normal})")]
    AttemptsOrder { normal: u32, aggressive: u32 },
    #[error("chains.{field} must not list drawer stages (found {source_name})")]
    InvalidChain {
        field: &'static str,
        source_name: &'static str,
    },
    #[error("invalid number_plan: {0}")]
    InvalidNumberPlan(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    extraction: Option<ExtractionFile>,
    drawer: Option<DrawerFile>,
    chains: Option<ChainsFile>,
    number_plan: Option<NumberPlanFile>,
    notifications: Option<NotificationsFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractionFile {
    min_digits: Option<usize>,
    dedup_suffix_len: Option<usize>,
    main_area_wait_ms: Option<u64>,
    main_area_poll_ms: Option<u64>,
    settle_ms: Option<u64>,
    settle_poll_ms: Option<u64>,
    debounce_ms: Option<u64>,
    mutation_debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DrawerFile {
    poll_ms: Option<u64>,
    normal_attempts: Option<u32>,
    aggressive_attempts: Option<u32>,
    render_settle_ms: Option<u64>,
    close_policy: Option<DrawerClosePolicy>,
    text_match: Option<MatchPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChainsFile {
    quick: Option<Vec<CandidateSource>>,
    masked_quick: Option<Vec<CandidateSource>>,
    masked_fallback: Option<Vec<CandidateSource>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NumberPlanFile {
    country_code: Option<String>,
    trunk_prefix: Option<String>,
    mobile_prefix: Option<String>,
    operator_digits: Option<String>,
    subscriber_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NotificationsFile {
    enabled: Option<bool>,
    backend: Option<NotificationBackend>,
}

pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path.clone()) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    ensure_permissions(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(extraction) = parsed.extraction {
        merge_extraction(&mut config.extraction, extraction)?;
    }
    if let Some(drawer) = parsed.drawer {
        merge_drawer(&mut config.drawer, drawer)?;
    }
    if let Some(chains) = parsed.chains {
        merge_chains(&mut config.chains, chains)?;
    }
    if let Some(plan) = parsed.number_plan {
        config.number_plan = merge_number_plan(plan)?;
    }
    if let Some(notifications) = parsed.notifications {
        if let Some(enabled) = notifications.enabled {
            config.notifications.enabled = enabled;
        }
        if let Some(backend) = notifications.backend {
            config.notifications.backend = backend;
        }
    }

    Ok(config)
}

fn merge_extraction(config: &mut ExtractionConfig, file: ExtractionFile) -> Result<()> {
    if let Some(min_digits) = file.min_digits {
        if !(MIN_DIGITS..=20).contains(&min_digits) {
            return Err(ConfigError::InvalidMinDigits(min_digits));
        }
        config.min_digits = min_digits;
    }
    if let Some(len) = file.dedup_suffix_len {
        config.dedup_suffix_len = len;
    }
    config.dedup_suffix_len = validate_suffix_len(config.dedup_suffix_len, config.min_digits)
        .map_err(|_| ConfigError::InvalidSuffixLength(config.dedup_suffix_len))?;

    let waits = [
        ("main_area_wait_ms", file.main_area_wait_ms, &mut config.main_area_wait),
        ("main_area_poll_ms", file.main_area_poll_ms, &mut config.main_area_poll),
        ("settle_ms", file.settle_ms, &mut config.settle),
        ("settle_poll_ms", file.settle_poll_ms, &mut config.settle_poll),
        ("debounce_ms", file.debounce_ms, &mut config.debounce),
        ("mutation_debounce_ms", file.mutation_debounce_ms, &mut config.mutation_debounce),
    ];
    for (field, value, slot) in waits {
        if let Some(ms) = value {
            *slot = validate_wait(field, ms)?;
        }
    }
    Ok(())
}

fn merge_drawer(config: &mut DrawerConfig, file: DrawerFile) -> Result<()> {
    if let Some(ms) = file.poll_ms {
        config.poll = validate_wait("drawer.poll_ms", ms)?;
    }
    if let Some(ms) = file.render_settle_ms {
        config.render_settle = validate_wait("drawer.render_settle_ms", ms)?;
    }
    if let Some(attempts) = file.normal_attempts {
        config.normal_attempts = validate_attempts("drawer.normal_attempts", attempts)?;
    }
    if let Some(attempts) = file.aggressive_attempts {
        config.aggressive_attempts = validate_attempts("drawer.aggressive_attempts", attempts)?;
    }
    if config.aggressive_attempts < config.normal_attempts {
        return Err(ConfigError::AttemptsOrder {
            normal: config.normal_attempts,
            aggressive: config.aggressive_attempts,
        });
    }
    if let Some(policy) = file.close_policy {
        config.close_policy = policy;
    }
    if let Some(policy) = file.text_match {
        config.text_match = policy;
    }
    Ok(())
}

fn merge_chains(config: &mut ChainsConfig, file: ChainsFile) -> Result<()> {
    let lists = [
        ("quick", file.quick, &mut config.quick),
        ("masked_quick", file.masked_quick, &mut config.masked_quick),
        ("masked_fallback", file.masked_fallback, &mut config.masked_fallback),
    ];
    for (field, value, slot) in lists {
        if let Some(list) = value {
            *slot = validate_chain(field, list)?;
        }
    }
    Ok(())
}

fn validate_chain(field: &'static str, list: Vec<CandidateSource>) -> Result<Vec<CandidateSource>> {
    if let Some(stage) = list
        .iter()
        .find(|source| matches!(source, CandidateSource::Drawer | CandidateSource::DrawerCopyable))
    {
        return Err(ConfigError::InvalidChain {
            field,
            source_name: stage.as_str(),
        });
    }
    Ok(list)
}

fn merge_number_plan(file: NumberPlanFile) -> Result<NumberPlan> {
    let defaults = NumberPlan::default();
    let country_code = file
        .country_code
        .unwrap_or_else(|| defaults.country_code().to_string());
    let trunk_prefix = file
        .trunk_prefix
        .unwrap_or_else(|| defaults.trunk_prefix().to_string());
    let mobile_prefix = file
        .mobile_prefix
        .unwrap_or_else(|| defaults.mobile_prefix().to_string());
    let operator_digits = file
        .operator_digits
        .unwrap_or_else(|| defaults.operator_digits().to_string());
    let subscriber_len = file.subscriber_len.unwrap_or(defaults.subscriber_len());
    NumberPlan::new(
        &country_code,
        &trunk_prefix,
        &mobile_prefix,
        &operator_digits,
        subscriber_len,
    )
    .map_err(|err| ConfigError::InvalidNumberPlan(err.to_string()))
}

fn validate_wait(field: &'static str, ms: u64) -> Result<Duration> {
    if ms == 0 || ms > MAX_WAIT_MS {
        return Err(ConfigError::InvalidDuration { field, value: ms });
    }
    Ok(Duration::from_millis(ms))
}

fn validate_attempts(field: &'static str, attempts: u32) -> Result<u32> {
    if attempts == 0 || attempts > MAX_ATTEMPTS {
        return Err(ConfigError::InvalidAttempts {
            field,
            value: attempts,
        });
    }
    Ok(attempts)
}

#[cfg(unix)]
fn ensure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(ConfigError::InsecurePermissions(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
