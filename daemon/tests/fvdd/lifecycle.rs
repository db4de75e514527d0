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

use crate::common::fakes::{Fakes, PinBehaviour};
use crate::common::images::{flash_with_header, image, payload};
use fvdd::boards::{BootMode, Ec702, Eoco, Mx51, Mx6s};
use fvdd::device::{ConfigState, DeviceOptions, FvdDevice};
use fvdd::error::ErrorKind;
use fvdd::hal::Clock;
use fvdd::identity::DEFAULT_FIRMWARE;
use fvdd::power::RailGroup;
use fvdd::serial_loader::BusMode;
use googletest::prelude::*;
use std::sync::Arc;

/// A flash-boot FPGA that configures itself whenever its last core rail is on.
fn self_configuring(fakes: &Fakes) {
    let regulators = fakes.regulators.clone();
    fakes.gpio.set(
        fakes.gpio.pin("fpga_conf_done"),
        PinBehaviour::When(Arc::new(move || regulators.is_enabled("DA9063_LDO8"))),
    );
}

fn ec702(fakes: &Fakes) -> FvdDevice {
    FvdDevice::attach(Box::new(Ec702::new()), fakes.hardware(), DeviceOptions::default()).unwrap()
}

#[gtest]
fn eoco_keeps_the_fpga_powered_and_loaded() {
    let fakes = Fakes::new();
    fakes.gpio.set(fakes.gpio.pin("fpga_conf_done"), PinBehaviour::Fixed(true));
    let mut device =
        FvdDevice::attach(Box::new(Eoco::new()), fakes.hardware(), DeviceOptions::default())
            .unwrap();
    fakes.gpio.clear_events();
    fakes.regulators.clear_events();

    assert_that!(device.power_down(), ok(anything()));
    assert_that!(device.reload_fpga(), ok(eq(&0)));

    expect_that!(fakes.regulators.events(), is_empty());
    expect_that!(fakes.gpio.drives(), is_empty());
    expect_that!(fakes.spi.acquired(), eq(0));
    expect_that!(device.is_powered(RailGroup::FpgaCore), eq(true));
    expect_that!(device.config_state(), eq(ConfigState::Configured));
}

#[gtest]
fn suspend_and_resume_a_flash_boot_fpga() {
    let fakes = Fakes::new();
    self_configuring(&fakes);
    let mut device = ec702(&fakes);
    device.power_up_fpa().unwrap();
    expect_that!(device.config_state(), eq(ConfigState::Configured));

    device.suspend().unwrap();
    expect_that!(device.config_state(), eq(ConfigState::PoweredDown));
    expect_that!(device.bus_mode(), eq(BusMode::ConfigurationStrobe));
    expect_that!(device.is_powered(RailGroup::Fpa), eq(false));
    expect_that!(fakes.regulators.is_enabled("DA9063_BPRO"), eq(false));

    let before = fakes.clock.now_ms();
    device.resume().unwrap();
    expect_that!(fakes.clock.now_ms() - before, ge(300));
    expect_that!(device.bus_mode(), eq(BusMode::GenericPeripheral));
    expect_that!(device.config_state(), eq(ConfigState::Configuring));

    device.power_up_fpa().unwrap();
    expect_that!(device.config_state(), eq(ConfigState::Configured));
    expect_that!(device.is_powered(RailGroup::Fpa), eq(true));
    expect_that!(fakes.spi.acquired(), eq(0));
}

#[gtest]
fn resume_that_never_configures_keeps_the_detector_off() {
    let fakes = Fakes::new();
    self_configuring(&fakes);
    let mut device = ec702(&fakes);
    device.suspend().unwrap();
    fakes.gpio.set(fakes.gpio.pin("fpga_conf_done"), PinBehaviour::Fixed(false));
    device.resume().unwrap();

    assert_that!(
        device.power_up_fpa(),
        err(displays_as(contains_substring("ConfigTimeout")))
    );
    expect_that!(device.is_powered(RailGroup::Fpa), eq(false));
    expect_that!(
        device.config_state(),
        eq(ConfigState::Failed(ErrorKind::ConfigTimeout))
    );
}

#[gtest]
fn missing_regulator_fails_every_power_up() {
    let fakes = Fakes::new();
    fakes.regulators.remove("DA9063_BMEM");
    let mut device = ec702(&fakes);
    expect_that!(device.status().last_error, some(contains_substring("DA9063_BMEM")));
    fakes.regulators.clear_events();

    assert_that!(
        device.power_up(false),
        err(displays_as(contains_substring("RailUnavailable")))
    );
    expect_that!(fakes.regulators.events(), is_empty());
    expect_that!(device.is_powered(RailGroup::FpgaCore), eq(false));
}

#[gtest]
fn fpa_follows_core_on_mx51() {
    let fakes = Fakes::new();
    let mut device =
        FvdDevice::attach(Box::new(Mx51::new()), fakes.hardware(), DeviceOptions::default())
            .unwrap();

    device.power_up(false).unwrap();

    expect_that!(device.is_powered(RailGroup::Fpa), eq(true));
    expect_that!(
        device.rail_names(RailGroup::Fpa),
        elements_are![eq(&"FPA_POWER_EN"), eq(&"FPA_I2C_EN")]
    );
}

#[gtest]
fn initialize_loads_a_direct_board_once() {
    let fakes = Fakes::new();
    fakes.firmware.insert(DEFAULT_FIRMWARE, image(true, 128, &payload(4096)));
    let spi = fakes.spi.clone();
    fakes.gpio.set(155, PinBehaviour::When(Arc::new(move || spi.bytes_written() > 0)));
    fakes.gpio.set(
        154,
        PinBehaviour::Follows {
            source: 153,
            when_floating: true,
        },
    );
    let mut device =
        FvdDevice::attach(Box::new(Mx6s::new()), fakes.hardware(), DeviceOptions::default())
            .unwrap();

    device.initialize().unwrap();
    device.initialize().unwrap();

    expect_that!(fakes.spi.acquired(), eq(1));
    expect_that!(device.status().boot_mode, eq(BootMode::DirectLoad));
    expect_that!(device.status().done_asserted, eq(true));
}

#[gtest]
fn initialize_reads_the_flash_header_on_flash_boards() {
    let fakes = Fakes::new();
    self_configuring(&fakes);
    fakes
        .flash
        .set_contents(flash_with_header(2 * 1024 * 1024, &image(false, 0, &[])));
    let mut device = ec702(&fakes);

    device.initialize().unwrap();

    let status = device.status();
    expect_that!(status.board, eq("EC702"));
    expect_that!(status.fpga_powered, eq(true));
    expect_that!(status.config_state, eq(ConfigState::Configured));
    expect_that!(device.headers().map(|h| h.generic.spec_size), some(eq(0)));
}
