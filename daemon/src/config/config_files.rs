// This file is part of fvdd, an application to power, configure and supervise the FLIR video device FPGA.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fvdd is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fvdd is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! TOML representation of `config.toml` and the merge rules between files.

use crate::config;
use crate::error::FvdError;
use crate::system_io::fs_read;
use log::trace;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// This is the top level struct which holds all sections
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TomlConfig {
    #[serde(default)]
    pub(crate) system_paths: SystemPathsToml,
    #[serde(default)]
    pub(crate) board: BoardToml,
    #[serde(default)]
    pub(crate) timing: TimingToml,
    /// Named handshake and bus lines mapped to GPIO numbers, keyed by device-tree property name.
    #[serde(default)]
    pub(crate) pins: HashMap<String, u32>,
}

/// This is the "system_paths" section struct
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SystemPathsToml {
    gpio_dir: Option<String>,
    regulator_dir: Option<String>,
    spidev_dir: Option<String>,
    eeprom_path: Option<String>,
    firmware_dir: Option<String>,
    mtd_device: Option<String>,
    mtd_class_dir: Option<String>,
    pinctrl_dir: Option<String>,
    machine_compatible: Option<String>,
}

/// This is the "board" section struct
#[derive(Debug, Default, Deserialize)]
pub(crate) struct BoardToml {
    compat_string: Option<String>,
    chip_select: Option<u8>,
}

/// This is the "timing" section struct
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TimingToml {
    done_timeout_ms: Option<u64>,
    done_poll_ms: Option<u64>,
    ready_timeout_ms: Option<u64>,
    ready_poll_ms: Option<u64>,
}

impl TomlConfig {
    pub(crate) fn merge(self, fallback: TomlConfig) -> TomlConfig {
        let mut pins = fallback.pins;
        pins.extend(self.pins);
        TomlConfig {
            system_paths: self.system_paths.merge(fallback.system_paths),
            board: self.board.merge(fallback.board),
            timing: self.timing.merge(fallback.timing),
            pins,
        }
    }
}

impl SystemPathsToml {
    fn merge(self, fallback: SystemPathsToml) -> SystemPathsToml {
        SystemPathsToml {
            gpio_dir: self.gpio_dir.or(fallback.gpio_dir),
            regulator_dir: self.regulator_dir.or(fallback.regulator_dir),
            spidev_dir: self.spidev_dir.or(fallback.spidev_dir),
            eeprom_path: self.eeprom_path.or(fallback.eeprom_path),
            firmware_dir: self.firmware_dir.or(fallback.firmware_dir),
            mtd_device: self.mtd_device.or(fallback.mtd_device),
            mtd_class_dir: self.mtd_class_dir.or(fallback.mtd_class_dir),
            pinctrl_dir: self.pinctrl_dir.or(fallback.pinctrl_dir),
            machine_compatible: self.machine_compatible.or(fallback.machine_compatible),
        }
    }
}

impl BoardToml {
    fn merge(self, fallback: BoardToml) -> BoardToml {
        BoardToml {
            compat_string: self.compat_string.or(fallback.compat_string),
            chip_select: self.chip_select.or(fallback.chip_select),
        }
    }
}

impl TimingToml {
    fn merge(self, fallback: TimingToml) -> TimingToml {
        TimingToml {
            done_timeout_ms: self.done_timeout_ms.or(fallback.done_timeout_ms),
            done_poll_ms: self.done_poll_ms.or(fallback.done_poll_ms),
            ready_timeout_ms: self.ready_timeout_ms.or(fallback.ready_timeout_ms),
            ready_poll_ms: self.ready_poll_ms.or(fallback.ready_poll_ms),
        }
    }
}

fn path_or(value: Option<String>, name: &str, hardcoded: &str) -> PathBuf {
    PathBuf::from(value.unwrap_or_else(|| {
        trace!("No {name} provided. Using hardcoded value.");
        hardcoded.to_string()
    }))
}

impl From<TomlConfig> for config::FvdConfig {
    fn from(value: TomlConfig) -> Self {
        trace!("Creating FvdConfig from {value:?}");
        let paths = value.system_paths;
        config::FvdConfig {
            paths: config::SystemPaths {
                gpio_dir: path_or(paths.gpio_dir, "gpio_dir", config::GPIO_DIR),
                regulator_dir: path_or(paths.regulator_dir, "regulator_dir", config::REGULATOR_DIR),
                spidev_dir: path_or(paths.spidev_dir, "spidev_dir", config::SPIDEV_DIR),
                eeprom_path: path_or(paths.eeprom_path, "eeprom_path", config::EEPROM_PATH),
                firmware_dir: path_or(paths.firmware_dir, "firmware_dir", config::FIRMWARE_DIR),
                mtd_device: path_or(paths.mtd_device, "mtd_device", config::MTD_DEVICE),
                mtd_class_dir: path_or(paths.mtd_class_dir, "mtd_class_dir", config::MTD_CLASS_DIR),
                pinctrl_dir: path_or(paths.pinctrl_dir, "pinctrl_dir", config::PINCTRL_DIR),
                machine_compatible: path_or(
                    paths.machine_compatible,
                    "machine_compatible",
                    config::MACHINE_COMPATIBLE,
                ),
            },
            board: config::BoardSettings {
                compat_string: value.board.compat_string,
                chip_select: value.board.chip_select.unwrap_or(0),
            },
            timing: config::TimingOverrides {
                done_timeout_ms: value.timing.done_timeout_ms,
                done_poll_ms: value.timing.done_poll_ms,
                ready_timeout_ms: value.timing.ready_timeout_ms,
                ready_poll_ms: value.timing.ready_poll_ms,
            },
            pins: value.pins,
        }
    }
}

pub(crate) fn toml_str_to_config(toml_string: &str) -> Result<TomlConfig, FvdError> {
    let config: TomlConfig = match toml::from_str(toml_string) {
        Ok(config) => config,
        Err(e) => {
            return Err(FvdError::TomlDe {
                toml_string: toml_string.into(),
                e,
            });
        }
    };
    Ok(config)
}

pub(crate) fn config_from_file(file_path: &Path) -> Result<TomlConfig, FvdError> {
    if !file_path.is_file() {
        return Err(FvdError::Internal(format!(
            "Config file not found in {file_path:?}"
        )));
    }
    toml_str_to_config(&fs_read(file_path)?)
}
