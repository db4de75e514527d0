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

//! EC101 / EC501 mainboards. The FPGA boots from its own flash; the host only powers it,
//! pulses `PROGRAM_B` to reload and watches `DONE`.
//!
//! Rails are DA9063 PMIC outputs. Which outputs feed the 2V5 and 3V15 rails changed with
//! article 199051 revision 3.

use crate::boards::board::{BoardProfile, BoardQuirks, BootMode};
use crate::handshake::{HandshakeLines, HandshakeTiming, LineSpec};
use crate::identity::MainboardIdentity;
use crate::power::RailSpec;
use crate::hal::PinRef;
use crate::serial_loader::{SerialProfile, SharedBusPins};
use fvdd_macros::board;

const SWAPPED_ARTICLE: MainboardIdentity = MainboardIdentity::new(199051, 3);

#[board(compat_string = "fsl,imx6dl-ec101", compat_string = "fsl,imx6dl-ec501")]
#[derive(Debug, Default)]
pub struct Ec101;

impl Ec101 {
    pub fn new() -> Self {
        Ec101
    }
}

/// DA9063 rails of the EC101 family, 1V0 first.
pub(crate) fn da9063_rails(identity: &MainboardIdentity) -> Vec<RailSpec> {
    let (rail_2v5, rail_3v15) = match *identity == SWAPPED_ARTICLE {
        true => ("DA9063_BMEM", "DA9063_LDO10"),
        false => ("DA9063_LDO10", "DA9063_LDO8"),
    };
    vec![
        RailSpec::regulator("DA9063_BPRO"),
        RailSpec::regulator("DA9063_CORE_SW"),
        RailSpec::regulator("DA9063_PERI_SW"),
        RailSpec::regulator(rail_2v5),
        RailSpec::regulator(rail_3v15),
    ]
}

/// SPI1 pins shared between the host and the configuration flash.
pub(crate) fn spi1_bus_pins() -> SharedBusPins {
    SharedBusPins {
        sclk: PinRef::Named("spi-sclk-gpio"),
        mosi: PinRef::Named("spi-mosi-gpio"),
        miso: PinRef::Named("spi-miso-gpio"),
        cs: PinRef::Named("spi-cs-gpio"),
    }
}

pub(crate) fn fpa_regulators() -> Vec<RailSpec> {
    vec![RailSpec::regulator("4V0_fpa"), RailSpec::regulator("fpa_i2c")]
}

impl BoardProfile for Ec101 {
    fn name(&self) -> &'static str {
        "EC101"
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
            chip_enable: LineSpec::Absent { default: true },
            config: LineSpec::named("fpga-program-gpio", true),
            status: LineSpec::Absent { default: true },
            done: LineSpec::named("fpga-conf-done-gpio", false),
            ready: LineSpec::named("fpga-ready-gpio", true),
            init: LineSpec::named("fpga-init-gpio", true),
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

    fn quirks(&self) -> BoardQuirks {
        BoardQuirks {
            hold_config_on_failed_boot: true,
            sync_power_at_attach: true,
            power_up_settle_ms: 300,
            ..BoardQuirks::default()
        }
    }
}
