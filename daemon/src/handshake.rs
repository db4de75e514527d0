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

//! The configuration handshake lines and the state machine driving them.
//!
//! Five roles take part in configuring the FPGA:
//!
//! - **ChipEnable** (`nCE`) - enables the configuration port, active low
//! - **ConfigTrigger** (`nCONFIG` / `PROGRAM_B`) - held asserted to reset the device, released
//!   to start configuration
//! - **Status** (`nSTATUS` / `INIT_B`) - deasserted while the device is in reset
//! - **Done** (`CONF_DONE`) - asserted once the device is configured, never written
//! - **Ready** - signalled by the running FPGA design when it can accept register traffic
//!
//! Boards may lack a line; an absent line reads as its fixed default and writes to it are
//! skipped. Every line is described as "asserted" or not; the raw level is derived from the
//! line's polarity.
//!
//! ```text
//!   Idle -> PowerSettling -> ConfigAsserted -> AwaitingDone -> Done
//!                                                          \-> Failed
//! ```

use crate::error::FvdError;
use crate::hal::{Clock, Direction, GpioController, PinRef};
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    PowerSettling,
    ConfigAsserted,
    AwaitingDone,
    Done,
    Failed,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a board wires one handshake role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSpec {
    Pin { pin: PinRef, active_low: bool },
    /// The board has no such line; reads return `default`.
    Absent { default: bool },
}

impl LineSpec {
    pub const fn active_high(pin: u32) -> Self {
        LineSpec::Pin {
            pin: PinRef::Number(pin),
            active_low: false,
        }
    }

    pub const fn active_low(pin: u32) -> Self {
        LineSpec::Pin {
            pin: PinRef::Number(pin),
            active_low: true,
        }
    }

    pub const fn named(name: &'static str, active_low: bool) -> Self {
        LineSpec::Pin {
            pin: PinRef::Named(name),
            active_low,
        }
    }
}

/// The handshake wiring of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeLines {
    pub chip_enable: LineSpec,
    pub config: LineSpec,
    pub status: LineSpec,
    pub done: LineSpec,
    pub ready: LineSpec,
    /// `INIT_B` on boards that hold it together with `PROGRAM_B` after a failed boot.
    pub init: LineSpec,
}

/// Board timing of the handshake, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTiming {
    pub config_hold_ms: u64,
    pub done_timeout_ms: u64,
    pub done_poll_ms: u64,
    pub ready_timeout_ms: u64,
    pub ready_poll_ms: u64,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        HandshakeTiming {
            config_hold_ms: 5,
            done_timeout_ms: 500,
            done_poll_ms: 5,
            ready_timeout_ms: 500,
            ready_poll_ms: 10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Line {
    Present { pin: u32, active_low: bool },
    Absent { default: bool },
}

impl Line {
    fn level(&self, asserted: bool) -> bool {
        match self {
            Line::Present { active_low, .. } => asserted != *active_low,
            Line::Absent { .. } => asserted,
        }
    }
}

pub struct ConfigurationHandshake {
    gpio: Arc<dyn GpioController>,
    clock: Arc<dyn Clock>,
    chip_enable: Line,
    config: Line,
    status: Line,
    done: Line,
    ready: Line,
    init: Line,
    timing: HandshakeTiming,
    state: HandshakeState,
}

fn claim(
    gpio: &dyn GpioController,
    role: &str,
    spec: &LineSpec,
    claimed: &mut Vec<u32>,
) -> Result<Line, FvdError> {
    match spec {
        LineSpec::Absent { default } => {
            debug!("Handshake line {role} absent, reads as {default}");
            Ok(Line::Absent { default: *default })
        }
        LineSpec::Pin { pin, active_low } => {
            let pin = pin
                .resolve(gpio)
                .and_then(|pin| gpio.request(pin, role).map(|_| pin))
                .map_err(|e| {
                    error!("Cannot claim handshake line {role}: {e}");
                    FvdError::LineUnavailable(role.to_string())
                })?;
            claimed.push(pin);
            Ok(Line::Present {
                pin,
                active_low: *active_low,
            })
        }
    }
}

impl ConfigurationHandshake {
    /// Claim every present line. Done, Status, Ready and Init become inputs; ChipEnable and
    /// ConfigTrigger keep whatever level the boot loader left them at.
    ///
    /// # Returns: `Result<Self, FvdError>`
    /// * `Ok(Self)` - Handshake in `Idle`
    /// * `Err(FvdError::LineUnavailable)` - A present line could not be claimed; lines
    ///   claimed before it are given back
    pub fn attach(
        gpio: Arc<dyn GpioController>,
        clock: Arc<dyn Clock>,
        lines: &HandshakeLines,
        timing: HandshakeTiming,
    ) -> Result<Self, FvdError> {
        let mut claimed = Vec::new();
        let result = (|| {
            let g = gpio.as_ref();
            Ok::<_, FvdError>((
                claim(g, "fpga_ce_n", &lines.chip_enable, &mut claimed)?,
                claim(g, "fpga_config_n", &lines.config, &mut claimed)?,
                claim(g, "fpga_status_n", &lines.status, &mut claimed)?,
                claim(g, "fpga_conf_done", &lines.done, &mut claimed)?,
                claim(g, "fpga_ready", &lines.ready, &mut claimed)?,
                claim(g, "fpga_init", &lines.init, &mut claimed)?,
            ))
        })();
        let (chip_enable, config, status, done, ready, init) = match result {
            Ok(lines) => lines,
            Err(e) => {
                for pin in claimed {
                    if let Err(release) = gpio.release(pin) {
                        warn!("Failed to release GPIO {pin}: {release}");
                    }
                }
                return Err(e);
            }
        };

        let handshake = ConfigurationHandshake {
            gpio,
            clock,
            chip_enable,
            config,
            status,
            done,
            ready,
            init,
            timing,
            state: HandshakeState::Idle,
        };
        for line in [handshake.status, handshake.done, handshake.ready, handshake.init] {
            handshake.float(line)?;
        }
        Ok(handshake)
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn timing(&self) -> HandshakeTiming {
        self.timing
    }

    fn read(&self, line: Line) -> Result<bool, FvdError> {
        match line {
            Line::Present { pin, active_low } => Ok(self.gpio.read(pin)? != active_low),
            Line::Absent { default } => Ok(default),
        }
    }

    fn drive(&self, line: Line, asserted: bool) -> Result<(), FvdError> {
        match line {
            Line::Present { pin, .. } => {
                trace!("Driving GPIO {pin} {}", if asserted { "asserted" } else { "deasserted" });
                self.gpio.set_direction(pin, Direction::Output(line.level(asserted)))
            }
            Line::Absent { .. } => Ok(()),
        }
    }

    fn float(&self, line: Line) -> Result<(), FvdError> {
        match line {
            Line::Present { pin, .. } => self.gpio.set_direction(pin, Direction::Input),
            Line::Absent { .. } => Ok(()),
        }
    }

    /// Whether `CONF_DONE` is asserted.
    pub fn done(&self) -> Result<bool, FvdError> {
        self.read(self.done)
    }

    /// Whether the device reports a healthy `nSTATUS`. Always true on boards without the line.
    pub fn status(&self) -> Result<bool, FvdError> {
        self.read(self.status)
    }

    /// Whether the FPGA design signals ready.
    pub fn ready(&self) -> Result<bool, FvdError> {
        self.read(self.ready)
    }

    pub fn enable_chip(&self) -> Result<(), FvdError> {
        self.drive(self.chip_enable, true)
    }

    pub fn disable_chip(&self) -> Result<(), FvdError> {
        self.drive(self.chip_enable, false)
    }

    /// Drive ConfigTrigger to its idle level.
    pub fn idle_config(&self) -> Result<(), FvdError> {
        self.drive(self.config, false)
    }

    /// Stop driving ConfigTrigger so the external pull returns it to idle.
    pub fn float_config(&self) -> Result<(), FvdError> {
        self.float(self.config)
    }

    /// Drive Init asserted. No-op on boards without the line.
    pub fn assert_init(&self) -> Result<(), FvdError> {
        self.drive(self.init, true)
    }

    pub fn begin_power_settling(&mut self) {
        debug!("Handshake {} -> PowerSettling", self.state);
        self.state = HandshakeState::PowerSettling;
    }

    /// Forget the outcome of the last configuration, e.g. after the core rails went down.
    pub fn reset(&mut self) {
        self.state = HandshakeState::Idle;
    }

    /// Pulse ConfigTrigger to start the FPGA's own configuration sequence.
    ///
    /// ChipEnable is driven to its raw low level, ConfigTrigger is asserted for the board's
    /// hold time and then released to input together with Init, which a failed boot may have
    /// left asserted. All steps are attempted; the first error is returned.
    pub fn trigger_reload(&mut self) -> Result<(), FvdError> {
        debug!("Triggering FPGA reconfiguration");
        let ce = match self.chip_enable {
            Line::Present { pin, .. } => self.gpio.set_direction(pin, Direction::Output(false)),
            Line::Absent { .. } => Ok(()),
        };
        let assert = self.drive(self.config, true);
        self.state = HandshakeState::ConfigAsserted;
        self.clock.sleep_ms(self.timing.config_hold_ms);
        let release = self.float(self.config);
        let init = self.float(self.init);
        self.state = HandshakeState::AwaitingDone;
        ce.and(assert).and(release).and(init)
    }

    fn programming_mode_once(&self) -> Result<(), FvdError> {
        self.idle_config()?;
        self.clock.sleep_ms(1);
        self.drive(self.config, true)?;
        self.clock.sleep_ms(1);
        if self.status()? || self.done()? {
            return Err(FvdError::ProgrammingModeFailed(String::from(
                "nSTATUS or CONF_DONE still high with nCONFIG asserted",
            )));
        }
        self.idle_config()?;
        self.clock.sleep_ms(1);
        if !self.status()? {
            return Err(FvdError::ProgrammingModeFailed(String::from(
                "nSTATUS did not rise after nCONFIG was released",
            )));
        }
        self.clock.sleep_ms(1);
        Ok(())
    }

    /// Put a direct-load FPGA into passive serial programming mode, retrying once.
    ///
    /// # Returns: `Result<(), FvdError>`
    /// * `Ok(())` - The device accepts a bitstream; state is `AwaitingDone`
    /// * `Err(FvdError::ProgrammingModeFailed)` - Both attempts failed; state is `Failed`
    pub fn enter_programming_mode(&mut self) -> Result<(), FvdError> {
        self.state = HandshakeState::ConfigAsserted;
        let result = self.programming_mode_once().or_else(|e| {
            warn!("Entering programming mode failed, retrying: {e}");
            self.clock.sleep_ms(5);
            self.programming_mode_once()
        });
        self.state = match result {
            Ok(()) => HandshakeState::AwaitingDone,
            Err(_) => HandshakeState::Failed,
        };
        result
    }

    /// Poll `CONF_DONE` every `interval_ms` until it asserts or `timeout_ms` has elapsed.
    ///
    /// # Returns: `Result<u64, FvdError>`
    /// * `Ok(elapsed_ms)` - Done asserted; state is `Done`
    /// * `Err(FvdError::ConfigTimeout)` - Done never asserted. State is `Failed` and
    ///   ConfigTrigger and Init have been driven back to asserted, holding the device in reset
    pub fn poll_done(&mut self, timeout_ms: u64, interval_ms: u64) -> Result<u64, FvdError> {
        let start = self.clock.now_ms();
        loop {
            let elapsed = self.clock.now_ms().saturating_sub(start);
            match self.done() {
                Ok(true) => {
                    debug!("CONF_DONE asserted after {elapsed} ms");
                    self.state = HandshakeState::Done;
                    return Ok(elapsed);
                }
                Ok(false) => {}
                Err(e) => warn!("Reading CONF_DONE failed: {e}"),
            }
            if elapsed >= timeout_ms {
                self.state = HandshakeState::Failed;
                if !self.status().unwrap_or(true) {
                    error!("FPGA reports a configuration error (nSTATUS low)");
                }
                if let Err(e) = self.drive(self.config, true).and(self.drive(self.init, true)) {
                    error!("Failed to hold nCONFIG after timeout: {e}");
                }
                return Err(FvdError::ConfigTimeout {
                    elapsed_ms: elapsed,
                });
            }
            self.clock.sleep_ms(interval_ms.max(1));
        }
    }

    /// Wait for the Ready line. A timeout is logged and reported as `false`, never an error.
    pub fn wait_ready(&self, timeout_ms: u64, interval_ms: u64) -> bool {
        let start = self.clock.now_ms();
        loop {
            if self.ready().unwrap_or(false) {
                let elapsed = self.clock.now_ms().saturating_sub(start);
                info!("FPGA ready after {elapsed} ms");
                return true;
            }
            if self.clock.now_ms().saturating_sub(start) >= timeout_ms {
                warn!("FPGA ready pin not asserted within {timeout_ms} ms");
                return false;
            }
            self.clock.sleep_ms(interval_ms.max(1));
        }
    }

    /// Keep a device whose boot stage failed in reset: ConfigTrigger and Init asserted.
    pub fn hold_in_reset(&mut self) -> Result<(), FvdError> {
        warn!("FPGA not configured by boot stage, holding it in reset");
        self.state = HandshakeState::Failed;
        self.drive(self.config, true)
            .and(self.drive(self.init, true))
    }

    /// Give back every claimed line.
    pub fn release(&mut self) {
        for line in [
            self.chip_enable,
            self.config,
            self.status,
            self.done,
            self.ready,
            self.init,
        ] {
            if let Line::Present { pin, .. } = line
                && let Err(e) = self.gpio.release(pin)
            {
                warn!("Failed to release GPIO {pin}: {e}");
            }
        }
    }
}
