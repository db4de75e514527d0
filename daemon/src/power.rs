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

//! Ordered power rail groups.
//!
//! A board declares two groups of rails, the FPGA core/IO group and the FPA (detector)
//! group. Each group is switched as a unit: rails come up in declaration order (low-voltage
//! and control rails first) and go down in reverse order. Every group owns an `enabled`
//! latch which only [`PowerSequencer::enable`] and [`PowerSequencer::disable`] mutate, so a
//! repeated request for the state a group is already in succeeds without touching hardware.
//!
//! A failing rail does not stop the sequence and nothing is rolled back: the remaining rails
//! are still switched and the call reports every rail that failed in
//! [`FvdError::RailSequenceFailed`]. Rails that could not be resolved when the board was
//! attached make every later call on their group fail with [`FvdError::RailUnavailable`].

use crate::error::FvdError;
use crate::hal::{Clock, Direction, GpioController, PinRef, RegulatorController};
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RailGroup {
    FpgaCore,
    Fpa,
}

impl fmt::Display for RailGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RailGroup::FpgaCore => write!(f, "FPGA"),
            RailGroup::Fpa => write!(f, "FPA"),
        }
    }
}

/// How a board describes a rail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RailSource {
    /// A regulator looked up by supply name.
    Regulator(&'static str),
    /// A GPIO driving a load switch or LDO enable input.
    EnableLine { pin: PinRef, active_low: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailSpec {
    pub name: &'static str,
    pub source: RailSource,
    /// Delay after this rail is switched on, before the next one.
    pub settle_ms: u64,
}

impl RailSpec {
    pub const fn regulator(name: &'static str) -> Self {
        RailSpec {
            name,
            source: RailSource::Regulator(name),
            settle_ms: 0,
        }
    }

    pub const fn enable_line(name: &'static str, pin: u32, active_low: bool) -> Self {
        RailSpec {
            name,
            source: RailSource::EnableLine {
                pin: PinRef::Number(pin),
                active_low,
            },
            settle_ms: 0,
        }
    }

    pub const fn settle(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }
}

#[derive(Debug)]
enum RailHandle {
    Regulator(&'static str),
    EnableLine { pin: u32, active_low: bool },
    /// Resolution failed at attach.
    Unavailable,
}

#[derive(Debug)]
struct Rail {
    name: &'static str,
    handle: RailHandle,
    settle_ms: u64,
}

#[derive(Debug)]
struct RailSet {
    rails: Vec<Rail>,
    enabled: bool,
    sequences: u64,
}

pub struct PowerSequencer {
    gpio: Arc<dyn GpioController>,
    regulators: Arc<dyn RegulatorController>,
    clock: Arc<dyn Clock>,
    core: RailSet,
    fpa: RailSet,
}

fn resolve_rails(
    gpio: &dyn GpioController,
    regulators: &dyn RegulatorController,
    specs: &[RailSpec],
) -> RailSet {
    let rails = specs
        .iter()
        .map(|spec| {
            let handle = match &spec.source {
                RailSource::Regulator(supply) => match regulators.resolve(supply) {
                    Ok(()) => RailHandle::Regulator(supply),
                    Err(e) => {
                        warn!("Rail {} unavailable: {e}", spec.name);
                        RailHandle::Unavailable
                    }
                },
                RailSource::EnableLine { pin, active_low } => {
                    let claimed = pin.resolve(gpio).and_then(|pin| {
                        gpio.request(pin, spec.name)?;
                        gpio.set_direction(pin, Direction::Output(*active_low))?;
                        Ok(pin)
                    });
                    match claimed {
                        Ok(pin) => RailHandle::EnableLine {
                            pin,
                            active_low: *active_low,
                        },
                        Err(e) => {
                            warn!("Rail {} unavailable: {e}", spec.name);
                            RailHandle::Unavailable
                        }
                    }
                }
            };
            Rail {
                name: spec.name,
                handle,
                settle_ms: spec.settle_ms,
            }
        })
        .collect();
    RailSet {
        rails,
        enabled: false,
        sequences: 0,
    }
}

fn switch(
    gpio: &dyn GpioController,
    regulators: &dyn RegulatorController,
    rail: &Rail,
    on: bool,
) -> Result<(), FvdError> {
    trace!("Switching rail {} {}", rail.name, if on { "on" } else { "off" });
    match rail.handle {
        RailHandle::Regulator(supply) => match on {
            true => regulators.enable(supply),
            false => regulators.disable(supply),
        },
        RailHandle::EnableLine { pin, active_low } => gpio.write(pin, on != active_low),
        RailHandle::Unavailable => Err(FvdError::RailUnavailable(rail.name.to_string())),
    }
}

impl PowerSequencer {
    /// Resolve every rail of both groups. Unresolvable rails are remembered, not fatal.
    ///
    /// Enable lines are claimed and driven to their off level.
    ///
    /// # Arguments
    ///
    /// * `gpio`, `regulators`, `clock` - Collaborators borrowed for every later switch
    /// * `core` - FPGA core/IO rails in power-up order
    /// * `fpa` - Detector rails in power-up order
    pub fn attach(
        gpio: Arc<dyn GpioController>,
        regulators: Arc<dyn RegulatorController>,
        clock: Arc<dyn Clock>,
        core: &[RailSpec],
        fpa: &[RailSpec],
    ) -> Self {
        let core = resolve_rails(gpio.as_ref(), regulators.as_ref(), core);
        let fpa = resolve_rails(gpio.as_ref(), regulators.as_ref(), fpa);
        PowerSequencer {
            gpio,
            regulators,
            clock,
            core,
            fpa,
        }
    }

    fn parts(
        &mut self,
        group: RailGroup,
    ) -> (&dyn GpioController, &dyn RegulatorController, &dyn Clock, &mut RailSet) {
        let set = match group {
            RailGroup::FpgaCore => &mut self.core,
            RailGroup::Fpa => &mut self.fpa,
        };
        (
            self.gpio.as_ref(),
            self.regulators.as_ref(),
            self.clock.as_ref(),
            set,
        )
    }

    fn set(&self, group: RailGroup) -> &RailSet {
        match group {
            RailGroup::FpgaCore => &self.core,
            RailGroup::Fpa => &self.fpa,
        }
    }

    fn check_available(set: &RailSet) -> Result<(), FvdError> {
        match set
            .rails
            .iter()
            .find(|rail| matches!(rail.handle, RailHandle::Unavailable))
        {
            Some(rail) => Err(FvdError::RailUnavailable(rail.name.to_string())),
            None => Ok(()),
        }
    }

    /// Switch a group on in declaration order.
    ///
    /// # Returns: `Result<(), FvdError>`
    /// * `Ok(())` - Every rail is on, or the group was already on
    /// * `Err(FvdError::RailUnavailable)` - A rail of the group did not resolve at attach
    /// * `Err(FvdError::RailSequenceFailed)` - One or more rails failed; the rest were still
    ///   switched and the group counts as on
    pub fn enable(&mut self, group: RailGroup) -> Result<(), FvdError> {
        let (gpio, regulators, clock, set) = self.parts(group);
        if set.enabled {
            debug!("{group} power already enabled");
            return Ok(());
        }
        Self::check_available(set)?;
        debug!("{group} power enable");
        set.enabled = true;
        set.sequences += 1;
        let mut failed = Vec::new();
        for rail in &set.rails {
            match switch(gpio, regulators, rail, true) {
                Ok(()) if rail.settle_ms > 0 => clock.sleep_ms(rail.settle_ms),
                Ok(()) => {}
                Err(e) => {
                    error!("Cannot enable rail {}: {e}", rail.name);
                    failed.push(rail.name.to_string());
                }
            }
        }
        match failed.is_empty() {
            true => {
                info!("{group} power enabled");
                Ok(())
            }
            false => Err(FvdError::RailSequenceFailed(failed)),
        }
    }

    /// Switch a group off in reverse declaration order. Same failure policy as [`enable`].
    ///
    /// [`enable`]: PowerSequencer::enable
    pub fn disable(&mut self, group: RailGroup) -> Result<(), FvdError> {
        let (gpio, regulators, _, set) = self.parts(group);
        if !set.enabled {
            debug!("{group} power already disabled");
            return Ok(());
        }
        Self::check_available(set)?;
        debug!("{group} power disable");
        set.enabled = false;
        set.sequences += 1;
        let mut failed = Vec::new();
        for rail in set.rails.iter().rev() {
            if let Err(e) = switch(gpio, regulators, rail, false) {
                error!("Cannot disable rail {}: {e}", rail.name);
                failed.push(rail.name.to_string());
            }
        }
        match failed.is_empty() {
            true => {
                info!("{group} power disabled");
                Ok(())
            }
            false => Err(FvdError::RailSequenceFailed(failed)),
        }
    }

    pub fn is_enabled(&self, group: RailGroup) -> bool {
        self.set(group).enabled
    }

    /// Number of enable or disable sequences that actually ran for `group`.
    pub fn sequence_count(&self, group: RailGroup) -> u64 {
        self.set(group).sequences
    }

    pub fn rail_names(&self, group: RailGroup) -> Vec<&'static str> {
        self.set(group).rails.iter().map(|rail| rail.name).collect()
    }

    /// Give back every enable line claimed at attach.
    pub fn release(&mut self) {
        for rail in self.core.rails.iter().chain(self.fpa.rails.iter()) {
            if let RailHandle::EnableLine { pin, .. } = rail.handle
                && let Err(e) = self.gpio.release(pin)
            {
                warn!("Failed to release enable line of rail {}: {e}", rail.name);
            }
        }
    }
}
