// empowerctl - CLI for EmPOWER WiFi slices
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8888";
pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_PASSWORD: &str = "root";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error("reading {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("writing {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serializing config")]
    Serialize(#[source] serde_yaml::Error),
}

/// Connection settings after defaults and overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf, ConfigError> {
    match scope {
        Scope::Local => Ok(cwd.join(".empowerctl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("EMPOWERCTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("empowerctl").join("config.yaml"))
        }
    }
}

/// Loads the user config with the project-local config layered on top.
pub fn load(cwd: &Path) -> Result<Config, ConfigError> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config, ConfigError> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf, ConfigError> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let serialized = serde_yaml::to_string(config).map_err(ConfigError::Serialize)?;
    fs::write(&path, serialized).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Resolves the settings for this invocation: `overrides` (command-line flags
/// and environment) win over the local file, which wins over the user file.
pub fn resolve(cwd: &Path, overrides: Config) -> Result<EffectiveConfig, ConfigError> {
    let merged = merge(load(cwd)?, overrides);

    Ok(EffectiveConfig {
        url: merged
            .url
            .map(|u| u.trim().to_string())
            .unwrap_or_else(|| DEFAULT_URL.to_string()),
        username: merged
            .username
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
        password: merged
            .password
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loaded config");
    Ok(Some(config))
}

fn merge(base: Config, over: Config) -> Config {
    Config {
        url: over.url.or(base.url),
        username: over.username.or(base.username),
        password: over.password.or(base.password),
    }
}
