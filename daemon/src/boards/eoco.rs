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

//! EOCO mainboard. Wired like the EC702 but without status or ready lines, and with the
//! DA9063 table of the EC101 family.
//!
//! Reconfiguration and FPGA power-down are disabled on this board: the FPGA shares its bus
//! with peripherals that must keep running, so the daemon never takes it down.

use crate::boards::board::{BoardProfile, BoardQuirks, BootMode};
use crate::boards::ec101::{da9063_rails, fpa_regulators};
use crate::handshake::{HandshakeLines, LineSpec};
use crate::identity::MainboardIdentity;
use crate::power::RailSpec;
use crate::serial_loader::SerialProfile;
use fvdd_macros::board;

#[board(compat_string = "fsl,imx6qp-eoco")]
#[derive(Debug, Default)]
pub struct Eoco;

impl Eoco {
    pub fn new() -> Self {
        Eoco
    }
}

impl BoardProfile for Eoco {
    fn name(&self) -> &'static str {
        "EOCO"
    }

    fn boot_mode(&self) -> BootMode {
        BootMode::FlashBoot
    }

    fn core_rails(&self, identity: &MainboardIdentity) -> Vec<RailSpec> {
        da9063_rails(identity)
    }

    fn fpa_rails(&self) -> Vec<RailSpec> {
        fpa_regulators()
    }

    fn lines(&self) -> HandshakeLines {
        HandshakeLines {
            chip_enable: LineSpec::named("fpga_ce_n", true),
            config: LineSpec::named("fpga_config_n", true),
            status: LineSpec::Absent { default: true },
            done: LineSpec::named("fpga_conf_done", false),
            ready: LineSpec::Absent { default: true },
            init: LineSpec::Absent { default: false },
        }
    }

    fn serial(&self) -> SerialProfile {
        SerialProfile::passive_serial(0, 1)
    }

    fn quirks(&self) -> BoardQuirks {
        BoardQuirks {
            allow_power_down: false,
            allow_reload: false,
            sync_power_at_attach: true,
            power_up_settle_ms: 300,
            ..BoardQuirks::default()
        }
    }
}
