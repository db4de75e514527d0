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

//! i.MX51 camera board. Direct load over SPI bus 1, power and FPA switched by GPIO enable lines.

use crate::boards::board::{BoardProfile, BoardQuirks, BootMode};
use crate::boards::imx_gpio;
use crate::handshake::{HandshakeLines, LineSpec};
use crate::identity::MainboardIdentity;
use crate::power::RailSpec;
use crate::serial_loader::SerialProfile;
use fvdd_macros::board;

#[board(compat_string = "fsl,imx51")]
#[derive(Debug, Default)]
pub struct Mx51;

impl Mx51 {
    pub fn new() -> Self {
        Mx51
    }
}

impl BoardProfile for Mx51 {
    fn name(&self) -> &'static str {
        "MX51"
    }

    fn boot_mode(&self) -> BootMode {
        BootMode::DirectLoad
    }

    fn core_rails(&self, _identity: &MainboardIdentity) -> Vec<RailSpec> {
        vec![RailSpec::enable_line("FPGA_POWER_EN", imx_gpio(3, 22), false).settle(50)]
    }

    fn fpa_rails(&self) -> Vec<RailSpec> {
        vec![
            RailSpec::enable_line("FPA_POWER_EN", imx_gpio(3, 9), false).settle(5),
            RailSpec::enable_line("FPA_I2C_EN", imx_gpio(3, 3), false),
        ]
    }

    fn lines(&self) -> HandshakeLines {
        HandshakeLines {
            chip_enable: LineSpec::active_low(imx_gpio(4, 24)),
            config: LineSpec::active_low(imx_gpio(4, 26)),
            status: LineSpec::active_high(imx_gpio(1, 7)),
            done: LineSpec::active_high(imx_gpio(4, 25)),
            ready: LineSpec::active_low(imx_gpio(3, 13)),
            init: LineSpec::Absent { default: false },
        }
    }

    fn serial(&self) -> SerialProfile {
        SerialProfile::passive_serial(1, 4)
    }

    fn quirks(&self) -> BoardQuirks {
        BoardQuirks {
            fpa_with_core: true,
            power_up_settle_ms: 2,
            ..BoardQuirks::default()
        }
    }
}
