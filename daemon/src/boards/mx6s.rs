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

//! i.MX6 Solo/DualLite camera board (AX8). Direct load over SPI bus 0.

use crate::boards::board::{BoardProfile, BootMode};
use crate::boards::imx_gpio;
use crate::handshake::{HandshakeLines, LineSpec};
use crate::identity::MainboardIdentity;
use crate::power::RailSpec;
use crate::serial_loader::SerialProfile;
use fvdd_macros::board;

#[board(compat_string = "fsl,imx6dl")]
#[derive(Debug, Default)]
pub struct Mx6s;

impl Mx6s {
    pub fn new() -> Self {
        Mx6s
    }
}

/// Handshake wiring shared by both i.MX6 direct-load boards.
pub(crate) fn imx6_lines() -> HandshakeLines {
    HandshakeLines {
        chip_enable: LineSpec::active_low(imx_gpio(5, 28)),
        config: LineSpec::active_low(imx_gpio(5, 25)),
        status: LineSpec::active_high(imx_gpio(5, 26)),
        done: LineSpec::active_high(imx_gpio(5, 27)),
        ready: LineSpec::active_low(imx_gpio(3, 19)),
        init: LineSpec::Absent { default: false },
    }
}

impl BoardProfile for Mx6s {
    fn name(&self) -> &'static str {
        "MX6S"
    }

    fn boot_mode(&self) -> BootMode {
        BootMode::DirectLoad
    }

    fn core_rails(&self, _identity: &MainboardIdentity) -> Vec<RailSpec> {
        vec![RailSpec::enable_line("FPGA_POWER_EN", imx_gpio(3, 17), false).settle(50)]
    }

    fn fpa_rails(&self) -> Vec<RailSpec> {
        vec![RailSpec::enable_line("FPA_POWER_EN", imx_gpio(3, 16), false)]
    }

    fn lines(&self) -> HandshakeLines {
        imx6_lines()
    }

    fn serial(&self) -> SerialProfile {
        SerialProfile::passive_serial(0, 1)
    }
}
