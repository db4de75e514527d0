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

//! One FPGA and everything needed to bring it up.
//!
//! [`FvdDevice`] ties a [`BoardProfile`] to the hardware collaborators and runs the power,
//! load and reload sequences in the order the board requires. The device is not internally
//! synchronised: callers hold it behind a single lock for the duration of every operation.
//!
//! # Direct load
//!
//! ```text
//! fetch image -> parse + reorder -> [Done already high? keep header, stop]
//!   -> programming mode -> transfer -> poll Done -> wait Ready
//! ```
//!
//! # Flash boot reload
//!
//! ```text
//! bus to peripheral -> flash boot timing -> bus to strobes -> pulse ConfigTrigger
//!   -> poll Done -> finally { bus to peripheral, flash host timing } -> wait Ready
//! ```

use crate::bitstream::{BitstreamImage, GENERIC_HEADER_SIZE, ImageHeaders, parse_headers};
use crate::boards::{BoardProfile, BootMode};
use crate::config::{FvdConfig, TimingOverrides};
use crate::error::{ErrorKind, FvdError};
use crate::flash_prep::FlashPrepSequencer;
use crate::hal::Hardware;
use crate::handshake::{ConfigurationHandshake, HandshakeState, HandshakeTiming};
use crate::identity::{IdentityCache, MainboardIdentity};
use crate::power::{PowerSequencer, RailGroup};
use crate::serial_loader::{BusMode, SerialLoader};
use log::{debug, error, info, warn};
use std::fmt;

/// Size of the image header area at the end of the configuration flash.
pub const FLASH_HEADER_AREA: u64 = 64 * 1024;
pub const FLASH_HEADER_MAGIC: &[u8] = b"FLIR";

/// How long a resumed flash-boot FPGA may take to assert Done.
const RESUME_DONE_TIMEOUT_MS: u64 = 5000;
const RESUME_DONE_POLL_MS: u64 = 10;

/// Outcome of the configuration attempts so far, as reported to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    NeverConfigured,
    Configuring,
    Configured,
    Failed(ErrorKind),
    PoweredDown,
}

impl fmt::Display for ConfigState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigState::Failed(kind) => write!(f, "Failed({kind})"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Read-only view of the device for status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub board: &'static str,
    pub boot_mode: BootMode,
    pub identity: MainboardIdentity,
    pub done_asserted: bool,
    pub status_asserted: bool,
    pub ready_asserted: bool,
    pub config_state: ConfigState,
    pub handshake: HandshakeState,
    pub bus_mode: BusMode,
    pub fpga_powered: bool,
    pub fpa_powered: bool,
    pub last_error: Option<String>,
}

/// Millisecond timings of one direct load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub read_ms: u64,
    pub rotate_ms: u64,
    pub prep_ms: u64,
    pub spi_ms: u64,
    pub check_ms: u64,
    pub total_ms: u64,
    pub bytes_written: usize,
    /// The FPGA was already configured by an earlier boot stage; nothing was written.
    pub skipped: bool,
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FPGA loaded in {} ms (read {} rotate {} prep {} SPI {} check {})",
            self.total_ms, self.read_ms, self.rotate_ms, self.prep_ms, self.spi_ms, self.check_ms
        )
    }
}

/// Daemon settings that refine a board profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceOptions {
    pub timing: TimingOverrides,
    pub chip_select: u8,
}

impl From<&FvdConfig> for DeviceOptions {
    fn from(config: &FvdConfig) -> Self {
        DeviceOptions {
            timing: config.timing,
            chip_select: config.board.chip_select,
        }
    }
}

fn apply_overrides(timing: HandshakeTiming, overrides: &TimingOverrides) -> HandshakeTiming {
    HandshakeTiming {
        done_timeout_ms: overrides.done_timeout_ms.unwrap_or(timing.done_timeout_ms),
        done_poll_ms: overrides.done_poll_ms.unwrap_or(timing.done_poll_ms),
        ready_timeout_ms: overrides.ready_timeout_ms.unwrap_or(timing.ready_timeout_ms),
        ready_poll_ms: overrides.ready_poll_ms.unwrap_or(timing.ready_poll_ms),
        ..timing
    }
}

pub struct FvdDevice {
    board: Box<dyn BoardProfile>,
    hardware: Hardware,
    identity: IdentityCache,
    power: PowerSequencer,
    handshake: ConfigurationHandshake,
    loader: SerialLoader,
    flash_prep: Option<FlashPrepSequencer>,
    config_state: ConfigState,
    last_error: Option<String>,
    headers: Option<ImageHeaders>,
    initialized: bool,
    verify_pending: bool,
}

impl FvdDevice {
    /// Bind a board profile to the hardware and claim every line, rail and bus pin it names.
    ///
    /// Rails that cannot be resolved are not fatal here; they fail every later power call
    /// with [`FvdError::RailUnavailable`].
    ///
    /// # Returns: `Result<FvdDevice, FvdError>`
    /// * `Ok(FvdDevice)` - Device attached
    /// * `Err(FvdError::LineUnavailable)` - A handshake line or the bus chip select could not
    ///   be claimed
    pub fn attach(
        board: Box<dyn BoardProfile>,
        hardware: Hardware,
        options: DeviceOptions,
    ) -> Result<Self, FvdError> {
        info!("Attaching {} board", board.name());
        let identity = IdentityCache::default();
        let mainboard = identity.get(hardware.eeprom.as_ref());

        let mut power = PowerSequencer::attach(
            hardware.gpio.clone(),
            hardware.regulators.clone(),
            hardware.clock.clone(),
            &board.core_rails(&mainboard),
            &board.fpa_rails(),
        );
        let timing = apply_overrides(board.timing(), &options.timing);
        let mut handshake = match ConfigurationHandshake::attach(
            hardware.gpio.clone(),
            hardware.clock.clone(),
            &board.lines(),
            timing,
        ) {
            Ok(handshake) => handshake,
            Err(e) => {
                power.release();
                return Err(e);
            }
        };
        let mut serial = board.serial();
        serial.client.chip_select = options.chip_select;
        let loader = match SerialLoader::attach(
            hardware.gpio.clone(),
            hardware.pinmux.clone(),
            hardware.spi.clone(),
            serial,
            board.shared_bus(),
        ) {
            Ok(loader) => loader,
            Err(e) => {
                handshake.release();
                power.release();
                return Err(e);
            }
        };
        let flash_prep = board
            .flash_prep()
            .map(|profile| FlashPrepSequencer::new(hardware.spi.clone(), profile));

        let mut device = FvdDevice {
            board,
            hardware,
            identity,
            power,
            handshake,
            loader,
            flash_prep,
            config_state: ConfigState::NeverConfigured,
            last_error: None,
            headers: None,
            initialized: false,
            verify_pending: false,
        };
        device.settle_attach_state();
        Ok(device)
    }

    /// Bring the software latches in line with what the boot stage left behind.
    fn settle_attach_state(&mut self) {
        let quirks = self.board.quirks();
        if quirks.sync_power_at_attach {
            debug!("Syncing FPGA power latch with boot stage");
            let result = self.power.enable(RailGroup::FpgaCore);
            self.note(&result);
        }
        if self.board.boot_mode() == BootMode::DirectLoad {
            let result = self
                .handshake
                .disable_chip()
                .and(self.handshake.idle_config());
            self.note(&result);
        }
        match self.handshake.done() {
            Ok(true) => {
                info!("FPGA already configured by boot stage");
                self.config_state = ConfigState::Configured;
            }
            Ok(false) if quirks.hold_config_on_failed_boot => {
                let result = self.handshake.hold_in_reset();
                self.note(&result);
            }
            Ok(false) => {}
            Err(e) => warn!("Cannot read CONF_DONE: {e}"),
        }
    }

    fn note<T>(&mut self, result: &Result<T, FvdError>) {
        if let Err(e) = result {
            error!("{}: {e}", self.board.name());
            self.last_error = Some(e.to_string());
        }
    }

    /// Like [`note`](Self::note), also settling the configuration state.
    fn note_attempt<T>(&mut self, result: &Result<T, FvdError>) {
        self.config_state = match result {
            Ok(_) => ConfigState::Configured,
            Err(e) => ConfigState::Failed(e.kind()),
        };
        self.note(result);
    }

    fn record<T>(&mut self, result: Result<T, FvdError>) -> Result<T, FvdError> {
        self.note(&result);
        result
    }

    fn record_attempt<T>(&mut self, result: Result<T, FvdError>) -> Result<T, FvdError> {
        self.note_attempt(&result);
        result
    }

    pub fn board(&self) -> &dyn BoardProfile {
        self.board.as_ref()
    }

    pub fn identity(&self) -> MainboardIdentity {
        self.identity.get(self.hardware.eeprom.as_ref())
    }

    pub fn config_state(&self) -> ConfigState {
        self.config_state
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn bus_mode(&self) -> BusMode {
        self.loader.mode()
    }

    pub fn is_powered(&self, group: RailGroup) -> bool {
        self.power.is_enabled(group)
    }

    pub fn power_sequences(&self, group: RailGroup) -> u64 {
        self.power.sequence_count(group)
    }

    pub fn rail_names(&self, group: RailGroup) -> Vec<&'static str> {
        self.power.rail_names(group)
    }

    /// Headers of the last image parsed, from firmware or flash.
    pub fn headers(&self) -> Option<&ImageHeaders> {
        self.headers.as_ref()
    }

    /// Power up and, once per device, load the FPGA or read the flash image header.
    pub fn initialize(&mut self) -> Result<(), FvdError> {
        if self.initialized {
            debug!("Device already initialized");
            return Ok(());
        }
        self.initialized = true;
        self.power_up(false)?;
        match self.board.boot_mode() {
            BootMode::DirectLoad => self.load_fpga().map(|_| ()),
            BootMode::FlashBoot => self.read_flash_header().map(|_| ()),
        }
    }

    /// Switch the FPGA core rails on.
    ///
    /// # Arguments
    ///
    /// * `reconfigure` - Also configure the FPGA: a direct load, or a reload from flash.
    ///   Without it no handshake line is driven on flash-boot boards
    pub fn power_up(&mut self, reconfigure: bool) -> Result<(), FvdError> {
        let quirks = self.board.quirks();
        if self.loader.mode() == BusMode::ConfigurationStrobe {
            let result = self.loader.activate_bus();
            self.record(result)?;
        }
        let was_on = self.power.is_enabled(RailGroup::FpgaCore);
        if reconfigure {
            self.handshake.begin_power_settling();
        }
        let result = self.power.enable(RailGroup::FpgaCore);
        self.record(result)?;
        if !was_on && quirks.power_up_settle_ms > 0 {
            self.hardware.clock.sleep_ms(quirks.power_up_settle_ms);
        }
        if quirks.fpa_with_core {
            let result = self.power.enable(RailGroup::Fpa);
            self.record(result)?;
        }
        if self.config_state == ConfigState::PoweredDown {
            self.config_state = ConfigState::NeverConfigured;
        }

        match self.board.boot_mode() {
            BootMode::DirectLoad => {
                let result = self
                    .handshake
                    .enable_chip()
                    .and(self.handshake.idle_config());
                self.record(result)?;
                match reconfigure {
                    true => self.load_fpga().map(|_| ()),
                    false => Ok(()),
                }
            }
            BootMode::FlashBoot => match reconfigure {
                true => self.reload_fpga().map(|_| ()),
                false => Ok(()),
            },
        }
    }

    /// Take the FPGA down: FPA rails, chip enable, core rails, then park the configuration
    /// pins and the shared bus with Init held asserted. Boards that must keep the FPGA
    /// powered only log the request.
    pub fn power_down(&mut self) -> Result<(), FvdError> {
        if !self.board.quirks().allow_power_down {
            info!("FPGA power-down disabled on {}", self.board.name());
            return Ok(());
        }
        let fpa = self.power.disable(RailGroup::Fpa);
        let ce = self.handshake.disable_chip();
        self.hardware.clock.sleep_ms(1);
        let core = self.power.disable(RailGroup::FpgaCore);
        let mut result = fpa.and(ce).and(core);
        if self.board.boot_mode() == BootMode::FlashBoot {
            let config = self.handshake.float_config();
            let init = self.handshake.assert_init();
            let bus = self.loader.deactivate_bus();
            result = result.and(config).and(init).and(bus);
        }
        self.handshake.reset();
        self.verify_pending = false;
        self.config_state = ConfigState::PoweredDown;
        self.record(result)
    }

    pub fn power_up_fpa(&mut self) -> Result<(), FvdError> {
        self.ensure_configured()?;
        let result = self.power.enable(RailGroup::Fpa);
        self.record(result)
    }

    pub fn power_down_fpa(&mut self) -> Result<(), FvdError> {
        let result = self.power.disable(RailGroup::Fpa);
        self.record(result)
    }

    /// Fetch, reorder and shift the board's firmware image into a direct-load FPGA.
    ///
    /// The image is parsed before any line is touched. When Done already reads asserted the
    /// header is kept and nothing is written.
    ///
    /// # Returns: `Result<LoadStats, FvdError>`
    /// * `Ok(LoadStats)` - FPGA configured (or already configured)
    /// * `Err(FvdError::Argument)` - The board boots from flash
    /// * `Err(FvdError::ImageUnavailable)` / `Err(FvdError::MalformedImage)` - Bad firmware,
    ///   no hardware was touched
    /// * `Err(FvdError::ProgrammingModeFailed)` / `Err(FvdError::NoSerialBus)` /
    ///   `Err(FvdError::SerialWriteFailed)` / `Err(FvdError::ConfigTimeout)` - Load failed
    pub fn load_fpga(&mut self) -> Result<LoadStats, FvdError> {
        if self.board.boot_mode() == BootMode::FlashBoot {
            return Err(FvdError::Argument(format!(
                "{} boots its FPGA from flash, request a reload instead",
                self.board.name()
            )));
        }
        let result = self.load_direct();
        self.record_attempt(result)
    }

    fn load_direct(&mut self) -> Result<LoadStats, FvdError> {
        let clock = self.hardware.clock.clone();
        let start = clock.now_ms();
        let mut stats = LoadStats::default();

        let name = self.board.firmware_name(&self.identity());
        debug!("Loading FPGA image {name}");
        let bytes = self.hardware.firmware.fetch(name)?;
        let fetched = clock.now_ms();
        stats.read_ms = fetched - start;

        let image = BitstreamImage::prepare(&bytes)?;
        drop(bytes);
        let rotated = clock.now_ms();
        stats.rotate_ms = rotated - fetched;
        self.headers = Some(image.headers.clone());

        if self.handshake.done()? {
            info!("FPGA already configured, keeping image header");
            stats.skipped = true;
            stats.total_ms = clock.now_ms() - start;
            return Ok(stats);
        }
        if !self.power.is_enabled(RailGroup::FpgaCore) {
            self.power_up(false)?;
        }

        self.config_state = ConfigState::Configuring;
        self.handshake.enter_programming_mode()?;
        let prepared = clock.now_ms();
        stats.prep_ms = prepared - rotated;

        let written = self.loader.transfer(image.payload());
        let transferred = clock.now_ms();
        stats.spi_ms = transferred - prepared;
        let written = match written {
            Ok(written) => written,
            Err(e) => {
                stats.total_ms = transferred - start;
                error!("{stats}, transfer failed");
                return Err(e);
            }
        };
        stats.bytes_written = written;

        let timing = self.handshake.timing();
        let checked = self.handshake.poll_done(timing.done_timeout_ms, timing.done_poll_ms);
        stats.check_ms = clock.now_ms() - transferred;
        stats.total_ms = clock.now_ms() - start;
        checked?;
        info!("{stats}");

        self.handshake
            .wait_ready(timing.ready_timeout_ms, timing.ready_poll_ms);
        Ok(stats)
    }

    /// Make a flash-boot FPGA reconfigure itself from flash.
    ///
    /// The bus and the flash settings are restored whatever happens in between. On a
    /// direct-load board this is a direct load.
    ///
    /// # Returns: `Result<u64, FvdError>`
    /// * `Ok(u64)` - Milliseconds until Done asserted (0 when reload is disabled)
    /// * `Err(FvdError::FlashPrepFailed)` - The flash did not accept a command
    /// * `Err(FvdError::ConfigTimeout)` - Done did not assert; ConfigTrigger is held asserted
    pub fn reload_fpga(&mut self) -> Result<u64, FvdError> {
        if self.board.boot_mode() == BootMode::DirectLoad {
            return self.load_fpga().map(|stats| stats.check_ms);
        }
        if !self.board.quirks().allow_reload {
            info!("FPGA reload disabled on {}", self.board.name());
            return Ok(0);
        }
        if !self.power.is_enabled(RailGroup::FpgaCore) {
            let result = self.power.enable(RailGroup::FpgaCore);
            self.record(result)?;
        }
        self.verify_pending = false;
        self.config_state = ConfigState::Configuring;

        let attempt = self.reload_from_flash();

        let restore = self.loader.activate_bus();
        let revert = match self.flash_prep.as_mut() {
            Some(flash_prep) if flash_prep.is_prepared() => flash_prep.revert(),
            _ => Ok(()),
        };
        let result = attempt.and_then(|elapsed| restore.and(revert).map(|_| elapsed));
        if result.is_ok() {
            let timing = self.handshake.timing();
            self.handshake
                .wait_ready(timing.ready_timeout_ms, timing.ready_poll_ms);
        }
        self.record_attempt(result)
    }

    fn reload_from_flash(&mut self) -> Result<u64, FvdError> {
        self.loader.activate_bus()?;
        if let Some(flash_prep) = self.flash_prep.as_mut() {
            flash_prep.prepare()?;
        }
        self.loader.deactivate_bus()?;
        self.handshake.trigger_reload()?;
        let timing = self.handshake.timing();
        let elapsed = self
            .handshake
            .poll_done(timing.done_timeout_ms, timing.done_poll_ms)?;
        info!("FPGA reloaded from flash in {elapsed} ms");
        Ok(elapsed)
    }

    /// Read and parse the image header stored at the end of the configuration flash.
    ///
    /// # Returns: `Result<ImageHeaders, FvdError>`
    /// * `Ok(ImageHeaders)` - Parsed header, also kept for [`headers`](Self::headers)
    /// * `Err(FvdError::FlashHeaderInvalid)` - Flash too small, magic missing or header malformed
    pub fn read_flash_header(&mut self) -> Result<ImageHeaders, FvdError> {
        let result = self.flash_header();
        if let Ok(headers) = &result {
            self.headers = Some(headers.clone());
        }
        self.record(result)
    }

    fn flash_header(&self) -> Result<ImageHeaders, FvdError> {
        let flash = self.hardware.flash.as_ref();
        let size = flash.size()?;
        if size < FLASH_HEADER_AREA {
            return Err(FvdError::FlashHeaderInvalid(format!(
                "flash of {size} bytes has no {FLASH_HEADER_AREA} byte header area"
            )));
        }
        let mut area = vec![0u8; FLASH_HEADER_AREA as usize];
        flash.read_at(size - FLASH_HEADER_AREA, &mut area)?;
        if !area.starts_with(FLASH_HEADER_MAGIC) {
            return Err(FvdError::FlashHeaderInvalid(String::from(
                "header area does not start with FLIR",
            )));
        }
        let headers =
            parse_headers(&area).map_err(|e| FvdError::FlashHeaderInvalid(e.to_string()))?;
        debug!(
            "Flash image {} {}.{}.{} ({} header bytes)",
            headers.generic.name,
            headers.generic.major,
            headers.generic.minor,
            headers.generic.edit,
            GENERIC_HEADER_SIZE + headers.generic.spec_size as usize
        );
        Ok(headers)
    }

    /// Detector first, then the FPGA.
    pub fn suspend(&mut self) -> Result<(), FvdError> {
        info!("Suspending FPGA");
        let fpa = self.power_down_fpa();
        let core = self.power_down();
        fpa.and(core)
    }

    /// Power the FPGA back up with reconfiguration.
    ///
    /// Flash-boot FPGAs configure themselves as their rails come up; Done is checked by
    /// [`ensure_configured`](Self::ensure_configured) before the next operation needs it.
    pub fn resume(&mut self) -> Result<(), FvdError> {
        info!("Resuming FPGA");
        match self.board.boot_mode() {
            BootMode::DirectLoad => self.power_up(true),
            BootMode::FlashBoot => {
                self.power_up(false)?;
                self.verify_pending = true;
                self.config_state = ConfigState::Configuring;
                Ok(())
            }
        }
    }

    /// Confirm a resumed flash-boot FPGA came up. A no-op unless a resume is pending.
    pub fn ensure_configured(&mut self) -> Result<(), FvdError> {
        if !self.verify_pending {
            return Ok(());
        }
        self.verify_pending = false;
        let result = self
            .handshake
            .poll_done(RESUME_DONE_TIMEOUT_MS, RESUME_DONE_POLL_MS);
        if result.is_ok() {
            let timing = self.handshake.timing();
            self.handshake
                .wait_ready(timing.ready_timeout_ms, timing.ready_poll_ms);
        }
        self.record_attempt(result).map(|_| ())
    }

    fn read_line(&self, name: &str, result: Result<bool, FvdError>) -> bool {
        result.unwrap_or_else(|e| {
            warn!("Cannot read {name} of {}: {e}", self.board.name());
            false
        })
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            board: self.board.name(),
            boot_mode: self.board.boot_mode(),
            identity: self.identity.cached().unwrap_or_default(),
            done_asserted: self.read_line("CONF_DONE", self.handshake.done()),
            status_asserted: self.read_line("nSTATUS", self.handshake.status()),
            ready_asserted: self.read_line("READY", self.handshake.ready()),
            config_state: self.config_state,
            handshake: self.handshake.state(),
            bus_mode: self.loader.mode(),
            fpga_powered: self.power.is_enabled(RailGroup::FpgaCore),
            fpa_powered: self.power.is_enabled(RailGroup::Fpa),
            last_error: self.last_error.clone(),
        }
    }
}

impl Drop for FvdDevice {
    fn drop(&mut self) {
        debug!("Detaching {} board", self.board.name());
        self.loader.release();
        self.handshake.release();
        self.power.release();
    }
}
