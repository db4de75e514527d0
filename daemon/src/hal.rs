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

//! Hardware collaborators consumed by the configuration core.
//!
//! The core never touches a device node directly. It is handed a [`Hardware`] bundle of
//! trait objects at attach time and borrows them for every operation. [`linux`] provides
//! the sysfs / spidev / MTD backed implementations used by the daemon; tests provide
//! recording fakes.
//!
//! # Collaborators
//!
//! - [`GpioController`] - digital lines (handshake lines, enable lines, shared bus pins)
//! - [`RegulatorController`] - named power rails
//! - [`PinMux`] - pin multiplexing of the shared serial bus
//! - [`SpiController`] / [`SpiClient`] - scoped clients on a synchronous serial bus
//! - [`IdentityEeprom`] - the two-phase mainboard identity read
//! - [`FirmwareSource`] - firmware image bytes by name
//! - [`FlashReader`] - the NOR flash holding the image on flash-boot boards
//! - [`Clock`] - elapsed time and sleeping, injectable so poll loops are testable

pub mod linux;

use crate::error::FvdError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Direction of a digital line. Output carries the level driven immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output(bool),
}

/// How a board names a line: a fixed GPIO number, or a device-tree property resolved at attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRef {
    Number(u32),
    Named(&'static str),
}

impl PinRef {
    pub fn resolve(&self, gpio: &dyn GpioController) -> Result<u32, FvdError> {
        match self {
            PinRef::Number(pin) => Ok(*pin),
            PinRef::Named(name) => gpio.resolve(name),
        }
    }
}

pub trait GpioController: Send + Sync {
    /// Map a named line (device-tree property name such as `fpga_ce_n`) to a GPIO number.
    fn resolve(&self, name: &str) -> Result<u32, FvdError>;

    /// Claim a line. Claiming a line that is already claimed is an error.
    fn request(&self, pin: u32, label: &str) -> Result<(), FvdError>;

    fn release(&self, pin: u32) -> Result<(), FvdError>;

    fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), FvdError>;

    fn write(&self, pin: u32, value: bool) -> Result<(), FvdError>;

    fn read(&self, pin: u32) -> Result<bool, FvdError>;
}

pub trait RegulatorController: Send + Sync {
    /// Look up a rail by name. Called once per rail when a board is attached.
    fn resolve(&self, name: &str) -> Result<(), FvdError>;

    fn enable(&self, name: &str) -> Result<(), FvdError>;

    fn disable(&self, name: &str) -> Result<(), FvdError>;
}

/// Pin-mux states of the shared serial bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMuxState {
    /// Pins are routed to the SPI controller.
    Default,
    /// Pins are parked so another master can drive them.
    Idle,
}

pub trait PinMux: Send + Sync {
    fn select(&self, state: PinMuxState) -> Result<(), FvdError>;
}

/// Parameters of a transient client on a serial bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiClientConfig {
    pub modalias: &'static str,
    pub chip_select: u8,
    pub max_speed_hz: u32,
    pub mode: u8,
    pub bits_per_word: u8,
}

/// A client on a serial bus. Dropping the client releases it and the bus handle.
pub trait SpiClient: Send {
    fn write(&mut self, data: &[u8]) -> Result<(), FvdError>;
}

pub trait SpiController: Send + Sync {
    fn acquire_client(
        &self,
        bus: u16,
        config: &SpiClientConfig,
    ) -> Result<Box<dyn SpiClient>, FvdError>;
}

/// The small EEPROM holding the mainboard record.
pub trait IdentityEeprom: Send + Sync {
    /// Write `register` as the read address, then read `buf.len()` bytes.
    fn write_read(&self, register: u8, buf: &mut [u8]) -> Result<(), FvdError>;
}

pub trait FirmwareSource: Send + Sync {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, FvdError>;
}

pub trait FlashReader: Send + Sync {
    fn size(&self) -> Result<u64, FvdError>;

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), FvdError>;
}

pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;

    fn sleep_ms(&self, ms: u64);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Every collaborator a device needs, shared by the components that borrow them.
#[derive(Clone)]
pub struct Hardware {
    pub gpio: Arc<dyn GpioController>,
    pub regulators: Arc<dyn RegulatorController>,
    pub pinmux: Arc<dyn PinMux>,
    pub spi: Arc<dyn SpiController>,
    pub eeprom: Arc<dyn IdentityEeprom>,
    pub firmware: Arc<dyn FirmwareSource>,
    pub flash: Arc<dyn FlashReader>,
    pub clock: Arc<dyn Clock>,
}
