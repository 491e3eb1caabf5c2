use std::{fs, path::PathBuf, time::Duration};

use serde::Deserialize;

use super::ConfigError;

/// Validated, immutable policy record.
///
/// Instances are only replaced wholesale; see [`super::ConfigStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub min_dram_gb_trigger_return: u64,
    pub min_dram_gb_accept_new_task: u64,
    pub max_task_per_worker: u64,
    pub max_retry_per_task: u32,
    /// Seconds; zero means tasks without an explicit timeout never expire.
    pub default_task_timeout_seconds: u64,
    pub task_timeout_check_interval: u64,
    pub result_dir: PathBuf,
    pub health_report_interval: u64,
    pub sleep_sec_between_accepting_task: u64,
    pub store: StoreConfig,
}

/// Connection parameters of the coordination store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub password: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_dram_gb_trigger_return: 2,
            min_dram_gb_accept_new_task: 4,
            max_task_per_worker: 4,
            max_retry_per_task: 3,
            default_task_timeout_seconds: 3_600,
            task_timeout_check_interval: 10,
            result_dir: PathBuf::from("results"),
            health_report_interval: 10,
            sleep_sec_between_accepting_task: 1,
            store: StoreConfig {
                host: "127.0.0.1".into(),
                port: 6379,
                db: 0,
                password: None,
            },
        }
    }
}

impl Config {
    /// Parse and validate a JSON document.
    ///
    /// All constraint violations are collected before returning. Creates
    /// `result_dir` when it does not exist yet.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let raw: ConfigDocument = serde_json::from_str(doc)?;
        raw.validate()
    }

    /// Default timeout applied to tasks without an explicit one; `None` is unlimited.
    pub fn default_task_timeout(&self) -> Option<Duration> {
        match self.default_task_timeout_seconds {
            0 => None,
            s => Some(Duration::from_secs(s)),
        }
    }

    pub fn timeout_check_interval(&self) -> Duration {
        Duration::from_secs(self.task_timeout_check_interval)
    }

    /// Period of the master's queue depth report.
    pub fn health_report_interval(&self) -> Duration {
        Duration::from_secs(self.health_report_interval)
    }

    /// Pause a worker takes between accepting two tasks.
    pub fn accept_pause(&self) -> Duration {
        Duration::from_secs(self.sleep_sec_between_accepting_task)
    }
}

/// Wire shape of the configuration document.
///
/// Integers are read signed so that negative values reach validation and are
/// reported alongside every other violation.
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    min_dram_gb_trigger_return: i64,
    min_dram_gb_accept_new_task: i64,
    max_task_per_worker: i64,
    max_retry_per_task: i64,
    default_task_timeout_seconds: i64,
    task_timeout_check_interval: i64,
    result_dir: PathBuf,
    health_report_interval: i64,
    sleep_sec_between_accepting_task: i64,
    redis_host: String,
    redis_port: i64,
    redis_db: i64,
    /// Must be present; `null` means no password.
    #[serde(deserialize_with = "present_or_null")]
    redis_pass: Option<String>,
}

/// Reads a key that may be `null` but not absent.
///
/// A plain `Option` field would silently default when missing; routing it
/// through `deserialize_with` makes serde report the missing field instead.
fn present_or_null<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(de)
}

struct Violations(Vec<String>);

impl Violations {
    fn positive(&mut self, name: &str, v: i64) -> u64 {
        if v <= 0 {
            self.0.push(format!("{name} must be greater than 0 (got {v})"));
            return 0;
        }
        v as u64
    }

    fn non_negative(&mut self, name: &str, v: i64) -> u64 {
        if v < 0 {
            self.0.push(format!("{name} must not be negative (got {v})"));
            return 0;
        }
        v as u64
    }

    fn ranged<T>(&mut self, name: &str, v: i64, lo: i64, hi: i64) -> T
    where
        T: TryFrom<i64> + Default,
    {
        if v < lo || v > hi {
            self.0
                .push(format!("{name} must be within {lo}..={hi} (got {v})"));
            return T::default();
        }
        T::try_from(v).unwrap_or_default()
    }
}

impl ConfigDocument {
    fn validate(self) -> Result<Config, ConfigError> {
        let mut v = Violations(Vec::new());

        let trigger = v.positive("min_dram_gb_trigger_return", self.min_dram_gb_trigger_return);
        let accept = v.positive("min_dram_gb_accept_new_task", self.min_dram_gb_accept_new_task);
        if self.min_dram_gb_trigger_return >= self.min_dram_gb_accept_new_task {
            v.0.push(format!(
                "min_dram_gb_trigger_return ({}) must be less than min_dram_gb_accept_new_task ({})",
                self.min_dram_gb_trigger_return, self.min_dram_gb_accept_new_task
            ));
        }
        let max_task = v.positive("max_task_per_worker", self.max_task_per_worker);
        let max_retry = v.ranged::<u32>(
            "max_retry_per_task",
            self.max_retry_per_task,
            0,
            i64::from(u32::MAX),
        );
        let default_timeout =
            v.non_negative("default_task_timeout_seconds", self.default_task_timeout_seconds);
        let check_interval =
            v.positive("task_timeout_check_interval", self.task_timeout_check_interval);
        let health = v.positive("health_report_interval", self.health_report_interval);
        let pause = v.non_negative(
            "sleep_sec_between_accepting_task",
            self.sleep_sec_between_accepting_task,
        );

        if self.redis_host.trim().is_empty() {
            v.0.push("redis_host must not be empty".into());
        }
        let port = v.ranged::<u16>("redis_port", self.redis_port, 1, 65_535);
        let db = v.ranged::<u32>("redis_db", self.redis_db, 0, i64::from(u32::MAX));

        if self.result_dir.as_os_str().is_empty() {
            v.0.push("result_dir must not be empty".into());
        } else if self.result_dir.exists() {
            if !self.result_dir.is_dir() {
                v.0.push(format!("result_dir {:?} is not a directory", self.result_dir));
            }
        } else if let Err(e) = fs::create_dir_all(&self.result_dir) {
            v.0.push(format!("result_dir {:?} cannot be created: {e}", self.result_dir));
        }

        if !v.0.is_empty() {
            return Err(ConfigError::Invalid(v.0));
        }

        Ok(Config {
            min_dram_gb_trigger_return: trigger,
            min_dram_gb_accept_new_task: accept,
            max_task_per_worker: max_task,
            max_retry_per_task: max_retry,
            default_task_timeout_seconds: default_timeout,
            task_timeout_check_interval: check_interval,
            result_dir: self.result_dir,
            health_report_interval: health,
            sleep_sec_between_accepting_task: pause,
            store: StoreConfig {
                host: self.redis_host,
                port,
                db,
                password: self.redis_pass,
            },
        })
    }
}
