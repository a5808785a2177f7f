// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with figment.
//!
//! Precedence, lowest first: compiled defaults, `/etc/curbside/curbside.toml`,
//! `$XDG_CONFIG_HOME/curbside/curbside.toml`, `./curbside.toml`, then
//! `CURBSIDE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CurbsideConfig;

/// Top-level tables that environment variables may address.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "gateway",
    "session",
    "linking",
    "arrival",
    "redemption",
    "release",
    "sweeper",
    "webhook",
];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/curbside/curbside.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "curbside.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("curbside").join("curbside.toml"))
}

/// Loads the full hierarchy with environment overrides.
pub fn load_config() -> Result<CurbsideConfig, figment::Error> {
    build_figment().extract()
}

/// Loads defaults plus the given TOML text. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<CurbsideConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CurbsideConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads defaults, one explicit file, then environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<CurbsideConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(CurbsideConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The unextracted figment for the standard hierarchy.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(CurbsideConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// `CURBSIDE_<SECTION>_<KEY>` maps to `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CURBSIDE_SESSION_LINKING_WINDOW_SECS` lands on
/// `session.linking_window_secs`.
fn env_provider() -> Env {
    Env::prefixed("CURBSIDE_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    ENV_SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or_else(|| key.to_string())
}
