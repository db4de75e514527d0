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

//! Board profiles and their registry.
//!
//! A [`BoardProfile`] is a table: which rails, which lines, which bus and which quirks one
//! hardware revision has. It holds no control flow; [`FvdDevice`](crate::device::FvdDevice)
//! runs the same sequences for every board and consults the profile for parameters.
//!
//! Profiles register a constructor under one or more device-tree compatible strings using
//! the `#[board(compat_string = "...")]` attribute, which generates a `register_board()`
//! associated function. At start-up every profile is registered and the machine's
//! compatible list is matched against the registry, most specific entry first.

use crate::error::FvdError;
use crate::flash_prep::FlashPrepProfile;
use crate::handshake::{HandshakeLines, HandshakeTiming};
use crate::identity::MainboardIdentity;
use crate::power::RailSpec;
use crate::serial_loader::{SerialProfile, SharedBusPins};
use log::trace;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

type BoardConstructor = fn() -> Box<dyn BoardProfile>;

static BOARD_REGISTRY: OnceLock<Mutex<HashMap<&'static str, BoardConstructor>>> = OnceLock::new();

/// How the FPGA gets its bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    /// The host shifts the bitstream in over the serial bus.
    DirectLoad,
    /// The FPGA reads its image from an attached NOR flash programmed by an external tool.
    FlashBoot,
}

/// Behaviour that differs between hardware revisions and must not be unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardQuirks {
    /// Power-down switches the core rails off and parks the configuration pins.
    pub allow_power_down: bool,
    /// Reconfiguration from flash may be triggered.
    pub allow_reload: bool,
    /// Hold ConfigTrigger (and Init) asserted at attach when the boot stage left Done low.
    pub hold_config_on_failed_boot: bool,
    /// The core rails are already on when the daemon starts; mark them enabled at attach.
    pub sync_power_at_attach: bool,
    /// The FPA rails come up with the core rails.
    pub fpa_with_core: bool,
    /// Delay after the core rails are enabled.
    pub power_up_settle_ms: u64,
}

impl Default for BoardQuirks {
    fn default() -> Self {
        BoardQuirks {
            allow_power_down: true,
            allow_reload: true,
            hold_config_on_failed_boot: false,
            sync_power_at_attach: false,
            fpa_with_core: false,
            power_up_settle_ms: 0,
        }
    }
}

/// Hardware description of one board revision.
pub trait BoardProfile: Send + Sync {
    /// Short human readable name, e.g. `"EC702"`.
    fn name(&self) -> &'static str;

    fn boot_mode(&self) -> BootMode;

    /// FPGA core/IO rails in power-up order. Some boards swap regulators by revision.
    fn core_rails(&self, identity: &MainboardIdentity) -> Vec<RailSpec>;

    /// Detector rails in power-up order.
    fn fpa_rails(&self) -> Vec<RailSpec>;

    fn lines(&self) -> HandshakeLines;

    fn timing(&self) -> HandshakeTiming {
        HandshakeTiming::default()
    }

    /// The bus a direct load goes over.
    fn serial(&self) -> SerialProfile;

    /// Pins of a bus shared between the host and the FPGA, if any.
    fn shared_bus(&self) -> Option<SharedBusPins> {
        None
    }

    /// Flash read-timing switch issued around a reload, if the board needs one.
    fn flash_prep(&self) -> Option<FlashPrepProfile> {
        None
    }

    fn quirks(&self) -> BoardQuirks {
        BoardQuirks::default()
    }

    /// Firmware image for a direct load.
    fn firmware_name(&self, identity: &MainboardIdentity) -> &'static str {
        identity.firmware_name()
    }
}

fn init_board_registry() -> Mutex<HashMap<&'static str, BoardConstructor>> {
    Mutex::new(HashMap::new())
}

/// Register a board constructor under a device-tree compatible string.
///
/// # Panics
///
/// Panics if the registry lock is poisoned.
pub fn register_board(compatible: &'static str, constructor: BoardConstructor) {
    let mut registry = BOARD_REGISTRY
        .get_or_init(init_board_registry)
        .lock()
        .expect("couldn't get BOARD_REGISTRY");
    registry.insert(compatible, constructor);
}

/// Construct the profile registered for the first entry of `compatibles` that has one.
///
/// # Arguments
///
/// * `compatibles` - Machine compatible strings, most specific first
///
/// # Returns: `Result<Box<dyn BoardProfile>, FvdError>`
/// * `Ok(Box<dyn BoardProfile>)` - Newly constructed profile
/// * `Err(FvdError::UnknownBoard)` - No entry is registered
/// * `Err(FvdError::Internal)` - Registry lock failure
pub fn match_board<S: AsRef<str>>(compatibles: &[S]) -> Result<Box<dyn BoardProfile>, FvdError> {
    let registry = BOARD_REGISTRY
        .get_or_init(init_board_registry)
        .lock()
        .map_err(|_| FvdError::Internal(String::from("couldn't lock BOARD_REGISTRY")))?;

    for compatible in compatibles {
        let compatible = compatible.as_ref().trim();
        trace!("Trying compatible '{compatible}'");
        if let Some(constructor) = registry.get(compatible) {
            return Ok(constructor());
        }
    }
    let joined: Vec<&str> = compatibles.iter().map(|c| c.as_ref()).collect();
    Err(FvdError::UnknownBoard(joined.join(" ")))
}

/// Split a device-tree `compatible` property into its entries.
pub fn split_compatible(raw: &str) -> Vec<&str> {
    raw.split('\0')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}
