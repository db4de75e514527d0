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

use crate::common::fakes::{Fakes, GpioEvent, PinBehaviour};
use crate::common::images::{flash_with_header, image};
use fvdd::boards::{Ec101, Ec702, match_board, register_boards};
use fvdd::device::{ConfigState, DeviceOptions, FvdDevice};
use fvdd::error::ErrorKind;
use fvdd::hal::{Direction, PinMuxState};
use fvdd::handshake::HandshakeState;
use fvdd::power::RailGroup;
use fvdd::serial_loader::BusMode;
use googletest::prelude::*;
use rstest::rstest;

const FLASH_SIZE: usize = 1024 * 1024;

fn ec702(fakes: &Fakes) -> FvdDevice {
    FvdDevice::attach(Box::new(Ec702::new()), fakes.hardware(), DeviceOptions::default()).unwrap()
}

fn attach_compatible(fakes: &Fakes, compatible: &str) -> FvdDevice {
    register_boards();
    let board = match_board(&[compatible]).unwrap();
    FvdDevice::attach(board, fakes.hardware(), DeviceOptions::default()).unwrap()
}

fn config_pin(fakes: &Fakes) -> u32 {
    fakes.gpio.pin("fpga_config_n")
}

#[gtest]
fn configured_boot_leaves_every_line_alone() {
    let fakes = Fakes::new();
    fakes.gpio.set(fakes.gpio.pin("fpga_conf_done"), PinBehaviour::Fixed(true));
    let mut device = ec702(&fakes);
    expect_that!(device.config_state(), eq(ConfigState::Configured));
    expect_that!(device.is_powered(RailGroup::FpgaCore), eq(true));
    fakes.gpio.clear_events();
    fakes.regulators.clear_events();

    device.power_up(false).unwrap();

    expect_that!(fakes.gpio.drives(), is_empty());
    expect_that!(fakes.regulators.events(), is_empty());
    expect_that!(device.handshake_state(), eq(HandshakeState::Idle));
    expect_that!(device.bus_mode(), eq(BusMode::GenericPeripheral));
}

#[gtest]
fn failed_boot_is_held_in_reset() {
    let fakes = Fakes::new();
    let device = ec702(&fakes);

    expect_that!(
        fakes.gpio.direction(config_pin(&fakes)),
        some(eq(Direction::Output(false)))
    );
    expect_that!(device.handshake_state(), eq(HandshakeState::Failed));
    expect_that!(device.config_state(), eq(ConfigState::NeverConfigured));
}

#[gtest]
fn reload_switches_flash_timing_around_the_pulse() {
    let fakes = Fakes::new();
    fakes.gpio.set(
        fakes.gpio.pin("fpga_conf_done"),
        PinBehaviour::HighAfterRelease {
            source: config_pin(&fakes),
            ms: 20,
        },
    );
    let mut device = ec702(&fakes);

    assert_that!(device.reload_fpga(), ok(eq(&20)));

    let writes: Vec<Vec<u8>> = fakes.spi.writes().into_iter().map(|w| w.data).collect();
    assert_that!(writes.len(), eq(12));
    expect_that!(writes[1], eq(&vec![0x61u8, 0xDF]));
    expect_that!(writes[3], eq(&vec![0x81u8, 0xFB]));
    expect_that!(writes[5], eq(&vec![0xE9u8]));
    expect_that!(writes[9], eq(&vec![0x81u8, 0x8B]));
    expect_that!(writes[11], eq(&vec![0xB7u8]));
    expect_that!(
        fakes.pinmux.states(),
        elements_are![eq(&PinMuxState::Idle), eq(&PinMuxState::Default)]
    );
    expect_that!(device.bus_mode(), eq(BusMode::GenericPeripheral));
    expect_that!(device.handshake_state(), eq(HandshakeState::Done));
    expect_that!(device.config_state(), eq(ConfigState::Configured));
    expect_that!(fakes.spi.released(), eq(2));
}

#[gtest]
fn flash_prep_failure_still_restores_bus_and_flash() {
    let fakes = Fakes::new();
    fakes.spi.fail_write(2);
    let mut device = ec702(&fakes);

    assert_that!(
        device.reload_fpga(),
        err(displays_as(contains_substring("Flash command WRVECR failed at step 2")))
    );
    let writes = fakes.spi.writes();
    expect_that!(writes.len(), eq(8));
    expect_that!(writes.last().map(|w| w.data.clone()), some(eq(&vec![0xB7u8])));
    expect_that!(device.bus_mode(), eq(BusMode::GenericPeripheral));
    expect_that!(fakes.pinmux.states(), is_empty());
    expect_that!(
        fakes.gpio.direction(config_pin(&fakes)),
        some(eq(Direction::Output(false)))
    );
    expect_that!(
        device.config_state(),
        eq(ConfigState::Failed(ErrorKind::FlashPrepFailed))
    );
}

#[gtest]
fn reload_timeout_restores_the_bus() {
    let fakes = Fakes::new();
    fakes.gpio.set(fakes.gpio.pin("fpga_conf_done"), PinBehaviour::Fixed(false));
    let mut device = ec702(&fakes);

    assert_that!(
        device.reload_fpga(),
        err(displays_as(contains_substring("ConfigTimeout")))
    );
    expect_that!(device.bus_mode(), eq(BusMode::GenericPeripheral));
    expect_that!(fakes.spi.writes().len(), eq(12));
    expect_that!(
        fakes.gpio.direction(config_pin(&fakes)),
        some(eq(Direction::Output(false)))
    );
    expect_that!(device.handshake_state(), eq(HandshakeState::Failed));
}

#[gtest]
fn direct_load_is_refused() {
    let fakes = Fakes::new();
    let mut device = ec702(&fakes);

    assert_that!(
        device.load_fpga(),
        err(displays_as(contains_substring("FvdError::Argument")))
    );
    expect_that!(fakes.spi.acquired(), eq(0));
}

#[gtest]
fn reads_the_header_at_the_end_of_flash() {
    let fakes = Fakes::new();
    fakes
        .flash
        .set_contents(flash_with_header(FLASH_SIZE, &image(false, 104, &[])));
    let mut device = ec702(&fakes);

    let headers = device.read_flash_header().unwrap();

    expect_that!(headers.generic.name.as_str(), eq("neco"));
    expect_that!(headers.generic.major, eq(4));
    expect_that!(headers.buffers.len(), eq(1));
    expect_that!(device.headers(), some(eq(&headers)));
}

#[gtest]
fn erased_flash_has_no_header() {
    let fakes = Fakes::new();
    fakes.flash.set_contents(vec![0xFF; FLASH_SIZE]);
    let mut device = ec702(&fakes);

    assert_that!(
        device.read_flash_header(),
        err(displays_as(contains_substring("does not start with FLIR")))
    );
    expect_that!(device.headers(), none());
}

#[gtest]
fn small_flash_has_no_header_area() {
    let fakes = Fakes::new();
    fakes.flash.set_contents(vec![0xFF; 4096]);
    let mut device = ec702(&fakes);

    assert_that!(
        device.read_flash_header(),
        err(displays_as(contains_substring("FlashHeaderInvalid")))
    );
}

#[gtest]
#[rstest]
#[case::ec101("fsl,imx6dl-ec101", "fpga-conf-done-gpio", "fpga-init-gpio")]
#[case::ec501("fsl,imx6dl-ec501", "fpga-conf-done-gpio", "fpga-init-gpio")]
#[case::ec702("fsl,imx6qp-ec702", "fpga_conf_done", "fpga_config_n")]
fn reload_after_failed_boot_parks_bus_and_releases_reset(
    #[case] compatible: &str,
    #[case] done: &str,
    #[case] last_released: &str,
) {
    let fakes = Fakes::new();
    let mut device = attach_compatible(&fakes, compatible);
    expect_that!(device.handshake_state(), eq(HandshakeState::Failed));
    expect_that!(device.is_powered(RailGroup::FpgaCore), eq(true));
    fakes.gpio.set(
        fakes.gpio.pin(done),
        PinBehaviour::HighAfterRelease {
            source: fakes.gpio.pin(last_released),
            ms: 20,
        },
    );
    fakes.gpio.clear_events();
    fakes.regulators.clear_events();

    assert_that!(device.reload_fpga(), ok(eq(&20)));

    let sclk = fakes.gpio.pin("spi-sclk-gpio");
    expect_that!(
        fakes.pinmux.states(),
        elements_are![eq(&PinMuxState::Idle), eq(&PinMuxState::Default)]
    );
    expect_that!(fakes.gpio.events(), contains(eq(&GpioEvent::Request(sclk))));
    expect_that!(fakes.gpio.is_claimed(sclk), eq(false));
    expect_that!(
        fakes.gpio.direction(fakes.gpio.pin("spi-cs-gpio")),
        some(eq(Direction::Output(true)))
    );
    expect_that!(
        fakes.gpio.direction(fakes.gpio.pin(last_released)),
        some(eq(Direction::Input))
    );
    expect_that!(fakes.regulators.events(), is_empty());
    expect_that!(device.bus_mode(), eq(BusMode::GenericPeripheral));
    expect_that!(device.config_state(), eq(ConfigState::Configured));
}

#[gtest]
#[rstest]
#[case::ec101("fsl,imx6dl-ec101", &["fpga-program-gpio", "fpga-init-gpio"])]
#[case::ec702("fsl,imx6qp-ec702", &["fpga_config_n"])]
fn reload_timeout_holds_reset_lines(#[case] compatible: &str, #[case] reset_lines: &[&str]) {
    let fakes = Fakes::new();
    let mut device = attach_compatible(&fakes, compatible);

    assert_that!(
        device.reload_fpga(),
        err(displays_as(contains_substring("ConfigTimeout")))
    );

    for line in reset_lines {
        expect_that!(
            fakes.gpio.direction(fakes.gpio.pin(line)),
            some(eq(Direction::Output(false)))
        );
    }
    expect_that!(
        fakes.pinmux.states(),
        elements_are![eq(&PinMuxState::Idle), eq(&PinMuxState::Default)]
    );
    expect_that!(device.bus_mode(), eq(BusMode::GenericPeripheral));
    expect_that!(device.handshake_state(), eq(HandshakeState::Failed));
}

#[gtest]
fn ec101_power_down_holds_init_and_parks_bus() {
    let fakes = Fakes::new();
    fakes
        .gpio
        .set(fakes.gpio.pin("fpga-conf-done-gpio"), PinBehaviour::Fixed(true));
    let mut device =
        FvdDevice::attach(Box::new(Ec101::new()), fakes.hardware(), DeviceOptions::default())
            .unwrap();
    expect_that!(device.config_state(), eq(ConfigState::Configured));

    device.power_down().unwrap();

    expect_that!(
        fakes.gpio.direction(fakes.gpio.pin("fpga-init-gpio")),
        some(eq(Direction::Output(false)))
    );
    expect_that!(
        fakes.gpio.direction(fakes.gpio.pin("fpga-program-gpio")),
        some(eq(Direction::Input))
    );
    expect_that!(
        fakes.gpio.direction(fakes.gpio.pin("spi-cs-gpio")),
        some(eq(Direction::Input))
    );
    expect_that!(fakes.pinmux.states(), elements_are![eq(&PinMuxState::Idle)]);
    expect_that!(fakes.regulators.is_enabled("DA9063_LDO8"), eq(false));
    expect_that!(device.bus_mode(), eq(BusMode::ConfigurationStrobe));
    expect_that!(device.config_state(), eq(ConfigState::PoweredDown));
}
