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
use fvdd::handshake::{ConfigurationHandshake, HandshakeLines, HandshakeState, HandshakeTiming, LineSpec};
use fvdd::hal::{Clock, Direction};
use googletest::prelude::*;

const CE: u32 = 156;
const CONFIG: u32 = 153;
const STATUS: u32 = 154;
const DONE: u32 = 155;
const READY: u32 = 83;

fn lines() -> HandshakeLines {
    HandshakeLines {
        chip_enable: LineSpec::active_low(CE),
        config: LineSpec::active_low(CONFIG),
        status: LineSpec::active_high(STATUS),
        done: LineSpec::active_high(DONE),
        ready: LineSpec::active_low(READY),
        init: LineSpec::Absent { default: false },
    }
}

fn handshake(fakes: &Fakes) -> ConfigurationHandshake {
    ConfigurationHandshake::attach(
        fakes.gpio.clone(),
        fakes.clock.clone(),
        &lines(),
        HandshakeTiming::default(),
    )
    .unwrap()
}

#[gtest]
fn attach_floats_the_inputs_only() {
    let fakes = Fakes::new();
    let handshake = handshake(&fakes);

    expect_that!(handshake.state(), eq(HandshakeState::Idle));
    for pin in [STATUS, DONE, READY] {
        expect_that!(fakes.gpio.direction(pin), some(eq(Direction::Input)));
    }
    expect_that!(fakes.gpio.direction(CE), none());
    expect_that!(fakes.gpio.direction(CONFIG), none());
}

#[gtest]
fn missing_line_gives_back_earlier_claims() {
    let fakes = Fakes::new();
    let mut lines = lines();
    lines.ready = LineSpec::named("fpga-no-such-gpio", true);

    let result = ConfigurationHandshake::attach(
        fakes.gpio.clone(),
        fakes.clock.clone(),
        &lines,
        HandshakeTiming::default(),
    );

    assert_that!(
        result.err().map(|e| e.to_string()),
        some(contains_substring("LineUnavailable: Handshake line 'fpga_ready'"))
    );
    expect_that!(fakes.gpio.is_claimed(CE), eq(false));
    expect_that!(fakes.gpio.is_claimed(DONE), eq(false));
}

#[gtest]
fn done_timeout_holds_the_device_in_reset() {
    let fakes = Fakes::new();
    fakes.gpio.set(DONE, PinBehaviour::Fixed(false));
    let mut handshake = handshake(&fakes);
    let start = fakes.clock.now_ms();

    let result = handshake.poll_done(100, 10);

    assert_that!(
        result,
        err(displays_as(contains_substring("ConfigTimeout: DONE was not asserted within")))
    );
    expect_that!(fakes.clock.now_ms() - start, ge(100));
    expect_that!(handshake.state(), eq(HandshakeState::Failed));
    expect_that!(fakes.gpio.direction(CONFIG), some(eq(Direction::Output(false))));
}

#[gtest]
fn done_reports_elapsed_time() {
    let fakes = Fakes::new();
    let clock = fakes.clock.clone();
    fakes.gpio.set(
        DONE,
        PinBehaviour::When(std::sync::Arc::new(move || clock.now_ms() >= 30)),
    );
    let mut handshake = handshake(&fakes);

    assert_that!(handshake.poll_done(500, 10), ok(eq(&30)));
    expect_that!(handshake.state(), eq(HandshakeState::Done));
}

#[gtest]
fn programming_mode_needs_status_to_follow_config() {
    let fakes = Fakes::new();
    fakes.gpio.set(
        STATUS,
        PinBehaviour::Follows {
            source: CONFIG,
            when_floating: true,
        },
    );
    let mut handshake = handshake(&fakes);

    assert_that!(handshake.enter_programming_mode(), ok(anything()));
    expect_that!(handshake.state(), eq(HandshakeState::AwaitingDone));
    expect_that!(fakes.gpio.direction(CONFIG), some(eq(Direction::Output(true))));
}

#[gtest]
fn stuck_status_fails_after_one_retry() {
    let fakes = Fakes::new();
    fakes.gpio.set(STATUS, PinBehaviour::Fixed(true));
    let mut handshake = handshake(&fakes);

    assert_that!(
        handshake.enter_programming_mode(),
        err(displays_as(contains_substring("ProgrammingModeFailed")))
    );
    expect_that!(handshake.state(), eq(HandshakeState::Failed));
    // two attempts of two 1 ms steps around a 5 ms back-off
    expect_that!(fakes.clock.now_ms(), eq(9));
}

#[gtest]
fn reload_pulse_releases_config() {
    let fakes = Fakes::new();
    let mut handshake = handshake(&fakes);

    handshake.trigger_reload().unwrap();

    expect_that!(handshake.state(), eq(HandshakeState::AwaitingDone));
    expect_that!(fakes.gpio.direction(CE), some(eq(Direction::Output(false))));
    expect_that!(fakes.gpio.direction(CONFIG), some(eq(Direction::Input)));
    expect_that!(fakes.clock.now_ms(), eq(HandshakeTiming::default().config_hold_ms));
}

#[gtest]
fn reload_releases_init_held_by_failed_boot() {
    const INIT: u32 = 157;
    let fakes = Fakes::new();
    let mut lines = lines();
    lines.init = LineSpec::active_low(INIT);
    let mut handshake = ConfigurationHandshake::attach(
        fakes.gpio.clone(),
        fakes.clock.clone(),
        &lines,
        HandshakeTiming::default(),
    )
    .unwrap();
    handshake.hold_in_reset().unwrap();
    expect_that!(fakes.gpio.direction(INIT), some(eq(Direction::Output(false))));

    handshake.trigger_reload().unwrap();

    expect_that!(fakes.gpio.direction(CONFIG), some(eq(Direction::Input)));
    expect_that!(fakes.gpio.direction(INIT), some(eq(Direction::Input)));
}

#[gtest]
fn ready_timeout_is_not_an_error() {
    let fakes = Fakes::new();
    fakes.gpio.set(READY, PinBehaviour::Fixed(true));
    let handshake = handshake(&fakes);

    expect_that!(handshake.wait_ready(50, 10), eq(false));
    expect_that!(fakes.clock.now_ms(), ge(50));
}
