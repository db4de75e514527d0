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

//! Daemon configuration.
//!
//! Values come from `/etc/fvdd/config.toml` (user) merged over `/usr/lib/fvdd/config.toml`
//! (vendor) merged over the hardcoded defaults below. A missing or broken file is logged and
//! skipped. The merged configuration is built once per process.

pub mod config_files;

use crate::config::config_files::{TomlConfig, config_from_file};
use log::{trace, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Legacy sysfs GPIO class directory. Typically `/sys/class/gpio`.
pub static GPIO_DIR: &str = "/sys/class/gpio";

/// Directory holding one `reg-userspace-consumer` per rail, each with a writable `state` file.
pub static REGULATOR_DIR: &str = "/sys/class/fvd-regulator";

/// Where `spidevB.C` nodes live.
pub static SPIDEV_DIR: &str = "/dev";

/// The mainboard identity EEPROM (i2c bus 0, address 0x57) exposed by the at24 driver.
pub static EEPROM_PATH: &str = "/sys/bus/i2c/devices/0-0057/eeprom";

pub static FIRMWARE_DIR: &str = "/lib/firmware";

/// The NOR flash holding the FPGA image on flash-boot boards.
pub static MTD_DEVICE: &str = "/dev/mtd0";

/// sysfs class directory describing MTD devices, one `<name>/size` per device.
pub static MTD_CLASS_DIR: &str = "/sys/class/mtd";

/// Directory exposing the shared serial bus pin-mux state as a writable `state` file.
pub static PINCTRL_DIR: &str = "/sys/devices/platform/fvd/pinctrl";

pub static MACHINE_COMPATIBLE: &str = "/proc/device-tree/compatible";

static USER_CONFIG: &str = "/etc/fvdd/config.toml";
static VENDOR_CONFIG: &str = "/usr/lib/fvdd/config.toml";

#[derive(Debug, Clone)]
pub struct SystemPaths {
    pub gpio_dir: PathBuf,
    pub regulator_dir: PathBuf,
    pub spidev_dir: PathBuf,
    pub eeprom_path: PathBuf,
    pub firmware_dir: PathBuf,
    pub mtd_device: PathBuf,
    pub mtd_class_dir: PathBuf,
    pub pinctrl_dir: PathBuf,
    pub machine_compatible: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct BoardSettings {
    /// Skips device-tree detection when set.
    pub compat_string: Option<String>,
    pub chip_select: u8,
}

/// Optional replacements for the per-board handshake timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingOverrides {
    pub done_timeout_ms: Option<u64>,
    pub done_poll_ms: Option<u64>,
    pub ready_timeout_ms: Option<u64>,
    pub ready_poll_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct FvdConfig {
    pub paths: SystemPaths,
    pub board: BoardSettings,
    pub timing: TimingOverrides,
    pub pins: HashMap<String, u32>,
}

static CONFIG: OnceLock<FvdConfig> = OnceLock::new();

fn load_or_default(path: &Path, which: &str) -> TomlConfig {
    config_from_file(path).unwrap_or_else(|e| {
        warn!("Using hardcoded values for {which} config because loading config failed: {e}");
        TomlConfig::default()
    })
}

/// User config overrides vendor config and vendor config overrides hardcoded defaults
fn init_config() -> FvdConfig {
    let vendor_config = load_or_default(Path::new(VENDOR_CONFIG), "vendor");
    let user_config = load_or_default(Path::new(USER_CONFIG), "user");
    trace!("Merging user_config: {user_config:?} with vendor_config {vendor_config:?}");
    let merged: FvdConfig = user_config.merge(vendor_config).into();
    trace!("Resulting config: {merged:?}");
    merged
}

/// The process-wide configuration, loaded on first use.
pub fn config() -> &'static FvdConfig {
    CONFIG.get_or_init(init_config)
}
