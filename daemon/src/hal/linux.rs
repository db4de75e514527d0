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

//! Linux userspace backends for the hardware collaborators.
//!
//! - GPIO through the sysfs class interface (`export`, `direction`, `value`)
//! - rails through `reg-userspace-consumer` instances, one directory per rail
//! - the shared bus pin-mux through a `state` attribute of the platform device
//! - SPI through `spidev`, configured with the `SPI_IOC_WR_*` ioctls
//! - the identity EEPROM through the at24 `eeprom` attribute
//! - firmware from a directory, the NOR flash through its MTD character device

use crate::config::FvdConfig;
use crate::error::FvdError;
use crate::hal::{
    Direction, FirmwareSource, FlashReader, GpioController, Hardware, IdentityEeprom, PinMux,
    PinMuxState, RegulatorController, SpiClient, SpiClientConfig, SpiController, SystemClock,
};
use crate::system_io::{fs_read, fs_read_at, fs_read_bytes, fs_write};
use log::{debug, trace};
use spidev::{SpiModeFlags, Spidev, SpidevOptions};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Largest single `write()` the spidev driver accepts with its default `bufsiz`.
const SPIDEV_BUFSIZ: usize = 4096;

pub struct SysfsGpio {
    dir: PathBuf,
    named: HashMap<String, u32>,
    claimed: Mutex<HashSet<u32>>,
}

impl SysfsGpio {
    pub fn new(dir: &Path, named: HashMap<String, u32>) -> Self {
        SysfsGpio {
            dir: dir.to_path_buf(),
            named,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    fn attr(&self, pin: u32, attr: &str) -> PathBuf {
        self.dir.join(format!("gpio{pin}")).join(attr)
    }

    fn claimed(&self) -> Result<std::sync::MutexGuard<'_, HashSet<u32>>, FvdError> {
        self.claimed
            .lock()
            .map_err(|e| FvdError::Internal(format!("GPIO claim table poisoned: {e}")))
    }
}

fn gpio_err(pin: u32, op: &'static str) -> impl FnOnce(FvdError) -> FvdError {
    move |e| FvdError::Gpio {
        pin,
        op,
        reason: e.to_string(),
    }
}

impl GpioController for SysfsGpio {
    fn resolve(&self, name: &str) -> Result<u32, FvdError> {
        self.named
            .get(name)
            .copied()
            .ok_or_else(|| FvdError::LineUnavailable(name.to_string()))
    }

    fn request(&self, pin: u32, label: &str) -> Result<(), FvdError> {
        trace!("Requesting GPIO {pin} as {label}");
        let mut claimed = self.claimed()?;
        if claimed.contains(&pin) {
            return Err(FvdError::Gpio {
                pin,
                op: "request",
                reason: format!("already requested, cannot claim it as {label}"),
            });
        }
        if !self.dir.join(format!("gpio{pin}")).exists() {
            fs_write(&self.dir.join("export"), pin.to_string()).map_err(gpio_err(pin, "request"))?;
        }
        claimed.insert(pin);
        Ok(())
    }

    fn release(&self, pin: u32) -> Result<(), FvdError> {
        trace!("Releasing GPIO {pin}");
        let mut claimed = self.claimed()?;
        if !claimed.remove(&pin) {
            debug!("GPIO {pin} released without being requested");
            return Ok(());
        }
        fs_write(&self.dir.join("unexport"), pin.to_string()).map_err(gpio_err(pin, "release"))
    }

    fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), FvdError> {
        let value = match direction {
            Direction::Input => "in",
            Direction::Output(true) => "high",
            Direction::Output(false) => "low",
        };
        fs_write(&self.attr(pin, "direction"), value).map_err(gpio_err(pin, "set_direction"))
    }

    fn write(&self, pin: u32, value: bool) -> Result<(), FvdError> {
        fs_write(&self.attr(pin, "value"), if value { "1" } else { "0" })
            .map_err(gpio_err(pin, "write"))
    }

    fn read(&self, pin: u32) -> Result<bool, FvdError> {
        let value = fs_read(&self.attr(pin, "value")).map_err(gpio_err(pin, "read"))?;
        Ok(value.trim() != "0")
    }
}

pub struct UserspaceConsumerRegulators {
    dir: PathBuf,
}

impl UserspaceConsumerRegulators {
    pub fn new(dir: &Path) -> Self {
        UserspaceConsumerRegulators {
            dir: dir.to_path_buf(),
        }
    }

    fn state(&self, name: &str) -> PathBuf {
        self.dir.join(name).join("state")
    }
}

impl RegulatorController for UserspaceConsumerRegulators {
    fn resolve(&self, name: &str) -> Result<(), FvdError> {
        match self.state(name).is_file() {
            true => Ok(()),
            false => Err(FvdError::RailUnavailable(name.to_string())),
        }
    }

    fn enable(&self, name: &str) -> Result<(), FvdError> {
        fs_write(&self.state(name), "enabled")
    }

    fn disable(&self, name: &str) -> Result<(), FvdError> {
        fs_write(&self.state(name), "disabled")
    }
}

pub struct StateFilePinMux {
    state_file: PathBuf,
}

impl StateFilePinMux {
    pub fn new(dir: &Path) -> Self {
        StateFilePinMux {
            state_file: dir.join("state"),
        }
    }
}

impl PinMux for StateFilePinMux {
    fn select(&self, state: PinMuxState) -> Result<(), FvdError> {
        let name = match state {
            PinMuxState::Default => "spi-default",
            PinMuxState::Idle => "spi-idle",
        };
        fs_write(&self.state_file, name)
    }
}

/// `spidevB.C` character devices under one directory.
pub struct SpidevBus {
    dir: PathBuf,
}

impl SpidevBus {
    pub fn new(dir: &Path) -> Self {
        SpidevBus {
            dir: dir.to_path_buf(),
        }
    }
}

struct SpidevClient {
    device: Spidev,
    path: PathBuf,
}

impl SpiController for SpidevBus {
    fn acquire_client(
        &self,
        bus: u16,
        config: &SpiClientConfig,
    ) -> Result<Box<dyn SpiClient>, FvdError> {
        let path = self
            .dir
            .join(format!("spidev{bus}.{}", config.chip_select));
        trace!("Opening {path:?} for {}", config.modalias);
        let no_bus = |e: std::io::Error| FvdError::NoSerialBus {
            bus,
            reason: format!("{path:?}: {e}"),
        };
        let mut device = Spidev::open(&path).map_err(no_bus)?;
        let options = SpidevOptions::new()
            .mode(SpiModeFlags::from_bits_truncate(u32::from(config.mode)))
            .bits_per_word(config.bits_per_word)
            .max_speed_hz(config.max_speed_hz)
            .build();
        device.configure(&options).map_err(no_bus)?;
        Ok(Box::new(SpidevClient { device, path }))
    }
}

impl SpiClient for SpidevClient {
    fn write(&mut self, data: &[u8]) -> Result<(), FvdError> {
        for chunk in data.chunks(SPIDEV_BUFSIZ) {
            self.device.write_all(chunk).map_err(|e| {
                FvdError::SerialWriteFailed(format!("writing to {:?} failed: {e}", self.path))
            })?;
        }
        Ok(())
    }
}

impl Drop for SpidevClient {
    fn drop(&mut self) {
        trace!("Releasing {:?}", self.path);
    }
}

pub struct At24Eeprom {
    path: PathBuf,
}

impl At24Eeprom {
    pub fn new(path: &Path) -> Self {
        At24Eeprom {
            path: path.to_path_buf(),
        }
    }
}

impl IdentityEeprom for At24Eeprom {
    fn write_read(&self, register: u8, buf: &mut [u8]) -> Result<(), FvdError> {
        fs_read_at(&self.path, u64::from(register), buf)
            .map_err(|e| FvdError::IdentityUnreadable(e.to_string()))
    }
}

pub struct FirmwareDir {
    dir: PathBuf,
}

impl FirmwareDir {
    pub fn new(dir: &Path) -> Self {
        FirmwareDir {
            dir: dir.to_path_buf(),
        }
    }
}

impl FirmwareSource for FirmwareDir {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, FvdError> {
        fs_read_bytes(&self.dir.join(name)).map_err(|e| FvdError::ImageUnavailable {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

pub struct MtdFlash {
    device: PathBuf,
    class_dir: PathBuf,
}

impl MtdFlash {
    /// `class_dir` is the sysfs directory holding `<name>/size` for `device`.
    pub fn new(device: &Path, class_dir: &Path) -> Self {
        MtdFlash {
            device: device.to_path_buf(),
            class_dir: class_dir.to_path_buf(),
        }
    }
}

impl FlashReader for MtdFlash {
    fn size(&self) -> Result<u64, FvdError> {
        let name = self.device.file_name().ok_or_else(|| {
            FvdError::Argument(format!("{:?} does not name an MTD device", self.device))
        })?;
        let size = fs_read(&self.class_dir.join(name).join("size"))?;
        size.trim().parse::<u64>().map_err(|e| {
            FvdError::Internal(format!("MTD size {:?} is not a number: {e}", size.trim()))
        })
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), FvdError> {
        fs_read_at(&self.device, offset, buf)
    }
}

/// Build the collaborator bundle described by the daemon configuration.
pub fn hardware_from_config(config: &FvdConfig) -> Hardware {
    let paths = &config.paths;
    Hardware {
        gpio: Arc::new(SysfsGpio::new(&paths.gpio_dir, config.pins.clone())),
        regulators: Arc::new(UserspaceConsumerRegulators::new(&paths.regulator_dir)),
        pinmux: Arc::new(StateFilePinMux::new(&paths.pinctrl_dir)),
        spi: Arc::new(SpidevBus::new(&paths.spidev_dir)),
        eeprom: Arc::new(At24Eeprom::new(&paths.eeprom_path)),
        firmware: Arc::new(FirmwareDir::new(&paths.firmware_dir)),
        flash: Arc::new(MtdFlash::new(&paths.mtd_device, &paths.mtd_class_dir)),
        clock: Arc::new(SystemClock::default()),
    }
}
