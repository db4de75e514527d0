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

//! i.MX6 Quad camera board (T1K). Same wiring as [`Mx6s`](crate::boards::Mx6s) except the
//! power enables, and the FPGA enable is active low.

use crate::boards::board::{BoardProfile, BootMode};
use crate::boards::imx_gpio;
use crate::boards::mx6s::imx6_lines;
use crate::handshake::HandshakeLines;
use crate::identity::MainboardIdentity;
use crate::power::RailSpec;
use crate::serial_loader::SerialProfile;
use fvdd_macros::board;

#[board(compat_string = "fsl,imx6q")]
#[derive(Debug, Default)]
pub struct Mx6q;

impl Mx6q {
    pub fn new() -> Self {
        Mx6q
    }
}

impl BoardProfile for Mx6q {
    fn name(&self) -> &'static str {
        "MX6Q"
    }

    fn boot_mode(&self) -> BootMode {
        BootMode::DirectLoad
    }

    fn core_rails(&self, _identity: &MainboardIdentity) -> Vec<RailSpec> {
        vec![RailSpec::enable_line("FPGA_POWER_EN", imx_gpio(6, 23), true).settle(50)]
    }

    fn fpa_rails(&self) -> Vec<RailSpec> {
        vec![RailSpec::enable_line("FPA_POWER_EN", imx_gpio(6, 29), false)]
    }

    fn lines(&self) -> HandshakeLines {
        imx6_lines()
    }

    fn serial(&self) -> SerialProfile {
        SerialProfile::passive_serial(32766, 1)
    }
}
