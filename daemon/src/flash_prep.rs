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

//! NOR flash read-timing switch around a reconfiguration.
//!
//! The host runs the configuration flash in 4-byte addressing with a reduced dummy-cycle
//! count. The FPGA reads its image with 3-byte addresses at power-on timing, so the flash is
//! put back to those settings right before ConfigTrigger is released ([`prepare`]) and the
//! host settings are restored once the handshake is over ([`revert`]).
//!
//! [`prepare`]: FlashPrepSequencer::prepare
//! [`revert`]: FlashPrepSequencer::revert

use crate::error::FvdError;
use crate::hal::{SpiClientConfig, SpiController};
use log::{debug, error, info, trace};
use std::sync::Arc;

const WRITE_ENABLE: u8 = 0x06;
const WRITE_VOLATILE_ENHANCED_CONFIG: u8 = 0x61;
const WRITE_VOLATILE_CONFIG: u8 = 0x81;
const ENTER_4_BYTE_ADDRESS: u8 = 0xB7;
const EXIT_4_BYTE_ADDRESS: u8 = 0xE9;

/// Register values used on both sides of a reconfiguration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashPrepProfile {
    pub bus: u16,
    pub client: SpiClientConfig,
    /// Volatile enhanced configuration register value the FPGA boots with.
    pub boot_enhanced_config: u8,
    /// Volatile configuration register value (dummy cycles) the FPGA boots with.
    pub boot_config: u8,
    pub host_enhanced_config: u8,
    pub host_config: u8,
}

impl FlashPrepProfile {
    /// Micron N25Q on chip select 0 of `bus`.
    pub const fn n25q(bus: u16) -> Self {
        FlashPrepProfile {
            bus,
            client: SpiClientConfig {
                modalias: "spidev",
                chip_select: 0,
                max_speed_hz: 20_000_000,
                mode: 0,
                bits_per_word: 8,
            },
            boot_enhanced_config: 0xDF,
            boot_config: 0xFB,
            host_enhanced_config: 0xDF,
            host_config: 0x8B,
        }
    }
}

/// One flash command of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashCommand {
    pub name: &'static str,
    pub bytes: Vec<u8>,
}

impl FlashCommand {
    fn new(name: &'static str, bytes: &[u8]) -> Self {
        FlashCommand {
            name,
            bytes: bytes.to_vec(),
        }
    }
}

fn sequence(enhanced_config: u8, config: u8, address_mode: (&'static str, u8)) -> Vec<FlashCommand> {
    vec![
        FlashCommand::new("WREN", &[WRITE_ENABLE]),
        FlashCommand::new("WRVECR", &[WRITE_VOLATILE_ENHANCED_CONFIG, enhanced_config]),
        FlashCommand::new("WREN", &[WRITE_ENABLE]),
        FlashCommand::new("WRVCR", &[WRITE_VOLATILE_CONFIG, config]),
        FlashCommand::new("WREN", &[WRITE_ENABLE]),
        FlashCommand::new(address_mode.0, &[address_mode.1]),
    ]
}

pub struct FlashPrepSequencer {
    spi: Arc<dyn SpiController>,
    profile: FlashPrepProfile,
    prepared: bool,
}

impl FlashPrepSequencer {
    pub fn new(spi: Arc<dyn SpiController>, profile: FlashPrepProfile) -> Self {
        FlashPrepSequencer {
            spi,
            profile,
            prepared: false,
        }
    }

    /// Commands that put the flash into the FPGA's boot settings.
    pub fn prepare_commands(&self) -> Vec<FlashCommand> {
        sequence(
            self.profile.boot_enhanced_config,
            self.profile.boot_config,
            ("EX4B", EXIT_4_BYTE_ADDRESS),
        )
    }

    /// Commands that restore the host settings.
    pub fn revert_commands(&self) -> Vec<FlashCommand> {
        sequence(
            self.profile.host_enhanced_config,
            self.profile.host_config,
            ("EN4B", ENTER_4_BYTE_ADDRESS),
        )
    }

    /// Whether the last [`prepare`](Self::prepare) has not been reverted yet.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    fn run(&self, commands: &[FlashCommand]) -> Result<(), FvdError> {
        let mut client = self
            .spi
            .acquire_client(self.profile.bus, &self.profile.client)
            .map_err(|e| FvdError::FlashPrepFailed {
                step: 1,
                command: commands.first().map(|c| c.name).unwrap_or("none"),
                reason: e.to_string(),
            })?;
        for (index, command) in commands.iter().enumerate() {
            trace!("Flash command {} {:02x?}", command.name, command.bytes);
            client
                .write(&command.bytes)
                .map_err(|e| FvdError::FlashPrepFailed {
                    step: index + 1,
                    command: command.name,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Switch the flash to the FPGA boot settings. Stops at the first failing command.
    ///
    /// # Returns: `Result<(), FvdError>`
    /// * `Ok(())` - All commands were accepted
    /// * `Err(FvdError::FlashPrepFailed)` - `step` is the 1-based index of the failing command
    pub fn prepare(&mut self) -> Result<(), FvdError> {
        debug!("Preparing configuration flash for FPGA boot");
        self.prepared = true;
        self.run(&self.prepare_commands()).inspect_err(|e| {
            error!("Flash preparation failed: {e}");
        })
    }

    /// Restore the host flash settings. Runs even if [`prepare`](Self::prepare) failed part way.
    pub fn revert(&mut self) -> Result<(), FvdError> {
        debug!("Restoring configuration flash host settings");
        let result = self.run(&self.revert_commands());
        match &result {
            Ok(()) => {
                self.prepared = false;
                info!("Configuration flash restored");
            }
            Err(e) => error!("Flash restore failed: {e}"),
        }
        result
    }
}
