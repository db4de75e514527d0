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

//! EC702 mainboard. The FPGA boots from the NOR flash the host also uses, over a shared
//! SPI bus; a reload parks the bus and switches the flash to boot timing.

use crate::boards::board::{BoardProfile, BoardQuirks, BootMode};
use crate::boards::ec101::{fpa_regulators, spi1_bus_pins};
use crate::flash_prep::FlashPrepProfile;
use crate::handshake::{HandshakeLines, HandshakeTiming, LineSpec};
use crate::identity::MainboardIdentity;
use crate::power::RailSpec;
use crate::serial_loader::{SerialProfile, SharedBusPins};
use fvdd_macros::board;

#[board(compat_string = "fsl,imx6qp-ec702")]
#[derive(Debug, Default)]
pub struct Ec702;

impl Ec702 {
    pub fn new() -> Self {
        Ec702
    }
}

impl BoardProfile for Ec702 {
    fn name(&self) -> &'static str {
        "EC702"
    }

    fn boot_mode(&self) -> BootMode {
        BootMode::FlashBoot
    }

    fn core_rails(&self, _identity: &MainboardIdentity) -> Vec<RailSpec> {
        vec![
            RailSpec::regulator("DA9063_BPRO"),
            RailSpec::regulator("DA9063_PERI_SW"),
            RailSpec::regulator("DA9063_CORE_SW"),
            RailSpec::regulator("DA9063_BMEM"),
            RailSpec::regulator("DA9063_LDO8"),
        ]
    }

    fn fpa_rails(&self) -> Vec<RailSpec> {
        fpa_regulators()
    }

    fn lines(&self) -> HandshakeLines {
        HandshakeLines {
            chip_enable: LineSpec::named("fpga_ce_n", true),
            config: LineSpec::named("fpga_config_n", true),
            status: LineSpec::named("fpga_status_n", false),
            done: LineSpec::named("fpga_conf_done", false),
            ready: LineSpec::named("fpga-ready-gpio", true),
            init: LineSpec::Absent { default: false },
        }
    }

    fn timing(&self) -> HandshakeTiming {
        HandshakeTiming {
            config_hold_ms: 5,
            done_timeout_ms: 500,
            done_poll_ms: 5,
            ..HandshakeTiming::default()
        }
    }

    fn serial(&self) -> SerialProfile {
        SerialProfile::passive_serial(0, 1)
    }

    fn shared_bus(&self) -> Option<SharedBusPins> {
        Some(spi1_bus_pins())
    }

    fn flash_prep(&self) -> Option<FlashPrepProfile> {
        Some(FlashPrepProfile::n25q(0))
    }

    fn quirks(&self) -> BoardQuirks {
        BoardQuirks {
            hold_config_on_failed_boot: true,
            sync_power_at_attach: true,
            power_up_settle_ms: 300,
            ..BoardQuirks::default()
        }
    }
}
