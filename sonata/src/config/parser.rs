//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::{ConfigFile, WorkerSettings};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [runtime] section
    if let Some(section) = ini.section(Some("runtime")) {
        if let Some(v) = section.get("fm_socket") {
            config.fabric_manager.endpoint = Some(required_address("runtime", "fm_socket", v)?);
        }
        if let Some(v) = section.get("op_socket") {
            config.runtime.op_socket = required_address("runtime", "op_socket", v)?;
        }
    }

    // [fm_conf] section
    if let Some(section) = ini.section(Some("fm_conf")) {
        parse_worker(section, "fm_conf", &mut config.fabric_manager)?;
    }

    // [sm_conf] section
    if let Some(section) = ini.section(Some("sm_conf")) {
        if let Some(v) = section.get("sm_socket") {
            config.streaming_manager.endpoint = Some(required_address("sm_conf", "sm_socket", v)?);
        }
        parse_worker(section, "sm_conf", &mut config.streaming_manager)?;
    }

    // [emitter_conf] section
    if let Some(section) = ini.section(Some("emitter_conf")) {
        if let Some(v) = section.get("socket") {
            config.emitter.endpoint = optional(v);
        }
        parse_worker(section, "emitter_conf", &mut config.emitter)?;
    }

    // [distributor] section
    if let Some(section) = ini.section(Some("distributor")) {
        if let Some(v) = section.get("connect_timeout_ms") {
            config.distributor.connect_timeout_ms =
                positive("distributor", "connect_timeout_ms", v)?;
        }
        if let Some(v) = section.get("max_attempts") {
            config.distributor.max_attempts = positive("distributor", "max_attempts", v)?;
        }
        if let Some(v) = section.get("initial_backoff_ms") {
            config.distributor.initial_backoff_ms = number("distributor", "initial_backoff_ms", v)?;
        }
        if let Some(v) = section.get("max_backoff_ms") {
            config.distributor.max_backoff_ms = number("distributor", "max_backoff_ms", v)?;
        }
        if config.distributor.max_backoff_ms < config.distributor.initial_backoff_ms {
            return Err(ConfigFileError::InvalidValue {
                section: "distributor".to_string(),
                key: "max_backoff_ms".to_string(),
                value: config.distributor.max_backoff_ms.to_string(),
                reason: "must not be smaller than initial_backoff_ms".to_string(),
            });
        }
    }

    // [pipeline] section
    if let Some(section) = ini.section(Some("pipeline")) {
        if let Some(v) = section.get("partition_candidates") {
            config.pipeline.partition_candidates = positive("pipeline", "partition_candidates", v)?;
        }
    }

    // [bootstrap] section
    if let Some(section) = ini.section(Some("bootstrap")) {
        if let Some(v) = section.get("readiness_timeout_secs") {
            config.bootstrap.readiness_timeout_secs =
                positive("bootstrap", "readiness_timeout_secs", v)?;
        }
        if let Some(v) = section.get("probe_interval_ms") {
            config.bootstrap.probe_interval_ms = positive("bootstrap", "probe_interval_ms", v)?;
        }
    }

    // [feedback] section
    if let Some(section) = ini.section(Some("feedback")) {
        if let Some(v) = section.get("read_timeout_ms") {
            config.feedback.read_timeout_ms = positive("feedback", "read_timeout_ms", v)?;
        }
        if let Some(v) = section.get("max_frame_length") {
            config.feedback.max_frame_length = positive("feedback", "max_frame_length", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Keys shared by the `[*_conf]` worker sections.
fn parse_worker(
    section: &Properties,
    name: &str,
    worker: &mut WorkerSettings,
) -> Result<(), ConfigFileError> {
    if let Some(v) = section.get("command") {
        worker.command = optional(v);
    }
    if let Some(v) = section.get("args") {
        worker.args = v.split_whitespace().map(str::to_string).collect();
    }
    if let Some(v) = section.get("credentials") {
        worker.credentials = optional(v);
    }
    if let Some(v) = section.get("buffer_size") {
        worker.buffer_size = if v.trim().is_empty() {
            None
        } else {
            Some(positive(name, "buffer_size", v)?)
        };
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn required_address(section: &str, key: &str, value: &str) -> Result<String, ConfigFileError> {
    optional(value).ok_or_else(|| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: "must be a host:port address".to_string(),
    })
}

fn number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: "must be a non-negative integer".to_string(),
    })
}

fn positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a positive integer".to_string(),
        }),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
