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

//! In-memory hardware that records every call.

use fvdd::error::FvdError;
use fvdd::hal::{
    Clock, Direction, FirmwareSource, FlashReader, GpioController, Hardware, IdentityEeprom,
    PinMux, PinMuxState, RegulatorController, SpiClient, SpiClientConfig, SpiController,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct VirtualClock {
    now: AtomicU64,
}

impl VirtualClock {
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioEvent {
    Request(u32),
    Release(u32),
    Direction(u32, Direction),
    Write(u32, bool),
}

/// What a pin reads when the code under test samples it.
#[derive(Clone)]
pub enum PinBehaviour {
    Fixed(bool),
    /// Reads the level `source` drives, or `when_floating` while `source` is an input.
    Follows { source: u32, when_floating: bool },
    /// Evaluated on every read.
    When(Arc<dyn Fn() -> bool + Send + Sync>),
    /// Low until `ms` after `source` was last switched to input.
    HighAfterRelease { source: u32, ms: u64 },
}

#[derive(Default)]
struct GpioState {
    claimed: HashSet<u32>,
    directions: HashMap<u32, Direction>,
    behaviours: HashMap<u32, PinBehaviour>,
    released_at: HashMap<u32, u64>,
    events: Vec<GpioEvent>,
}

pub struct FakeGpio {
    clock: Arc<VirtualClock>,
    names: HashMap<&'static str, u32>,
    state: Mutex<GpioState>,
}

impl FakeGpio {
    pub fn new(clock: Arc<VirtualClock>, names: &[(&'static str, u32)]) -> Self {
        FakeGpio {
            clock,
            names: names.iter().copied().collect(),
            state: Mutex::new(GpioState::default()),
        }
    }

    pub fn set(&self, pin: u32, behaviour: PinBehaviour) {
        self.state.lock().unwrap().behaviours.insert(pin, behaviour);
    }

    pub fn direction(&self, pin: u32) -> Option<Direction> {
        self.state.lock().unwrap().directions.get(&pin).copied()
    }

    pub fn is_claimed(&self, pin: u32) -> bool {
        self.state.lock().unwrap().claimed.contains(&pin)
    }

    pub fn events(&self) -> Vec<GpioEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    /// Direction changes and writes, i.e. every event that drives or floats a line.
    pub fn drives(&self) -> Vec<GpioEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, GpioEvent::Direction(..) | GpioEvent::Write(..)))
            .collect()
    }

    pub fn pin(&self, name: &str) -> u32 {
        self.names[name]
    }
}

impl GpioController for FakeGpio {
    fn resolve(&self, name: &str) -> Result<u32, FvdError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| FvdError::LineUnavailable(name.to_string()))
    }

    fn request(&self, pin: u32, _label: &str) -> Result<(), FvdError> {
        let mut state = self.state.lock().unwrap();
        if !state.claimed.insert(pin) {
            return Err(FvdError::Gpio {
                pin,
                op: "request",
                reason: String::from("already requested"),
            });
        }
        state.events.push(GpioEvent::Request(pin));
        Ok(())
    }

    fn release(&self, pin: u32) -> Result<(), FvdError> {
        let mut state = self.state.lock().unwrap();
        state.claimed.remove(&pin);
        state.events.push(GpioEvent::Release(pin));
        Ok(())
    }

    fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), FvdError> {
        let mut state = self.state.lock().unwrap();
        if direction == Direction::Input {
            state.released_at.insert(pin, self.clock.now_ms());
        }
        state.directions.insert(pin, direction);
        state.events.push(GpioEvent::Direction(pin, direction));
        Ok(())
    }

    fn write(&self, pin: u32, value: bool) -> Result<(), FvdError> {
        let mut state = self.state.lock().unwrap();
        state.directions.insert(pin, Direction::Output(value));
        state.events.push(GpioEvent::Write(pin, value));
        Ok(())
    }

    fn read(&self, pin: u32) -> Result<bool, FvdError> {
        let state = self.state.lock().unwrap();
        let now = self.clock.now_ms();
        let driven = |pin: u32| match state.directions.get(&pin) {
            Some(Direction::Output(level)) => Some(*level),
            _ => None,
        };
        Ok(match state.behaviours.get(&pin) {
            Some(PinBehaviour::Fixed(level)) => *level,
            Some(PinBehaviour::Follows {
                source,
                when_floating,
            }) => driven(*source).unwrap_or(*when_floating),
            Some(PinBehaviour::When(condition)) => condition(),
            Some(PinBehaviour::HighAfterRelease { source, ms }) => {
                driven(*source).is_none()
                    && state
                        .released_at
                        .get(source)
                        .is_some_and(|released| now >= released + ms)
            }
            None => driven(pin).unwrap_or(false),
        })
    }
}

#[derive(Debug, Default)]
struct RegulatorState {
    missing: HashSet<String>,
    failing: HashSet<String>,
    enabled: HashMap<String, bool>,
    events: Vec<(String, bool)>,
}

#[derive(Debug, Default)]
pub struct FakeRegulators {
    state: Mutex<RegulatorState>,
}

impl FakeRegulators {
    /// Make `name` fail to resolve at attach.
    pub fn remove(&self, name: &str) {
        self.state.lock().unwrap().missing.insert(name.to_string());
    }

    /// Make switching `name` fail.
    pub fn break_rail(&self, name: &str) {
        self.state.lock().unwrap().failing.insert(name.to_string());
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .enabled
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    /// `(rail, on)` in call order.
    pub fn events(&self) -> Vec<(String, bool)> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    fn switch(&self, name: &str, on: bool) -> Result<(), FvdError> {
        let mut state = self.state.lock().unwrap();
        state.events.push((name.to_string(), on));
        if state.failing.contains(name) {
            return Err(FvdError::IOWrite {
                file: format!("/sys/class/fvd-regulator/{name}/state").into(),
                e: std::io::Error::other("regulator refused"),
            });
        }
        state.enabled.insert(name.to_string(), on);
        Ok(())
    }
}

impl RegulatorController for FakeRegulators {
    fn resolve(&self, name: &str) -> Result<(), FvdError> {
        match self.state.lock().unwrap().missing.contains(name) {
            true => Err(FvdError::RailUnavailable(name.to_string())),
            false => Ok(()),
        }
    }

    fn enable(&self, name: &str) -> Result<(), FvdError> {
        self.switch(name, true)
    }

    fn disable(&self, name: &str) -> Result<(), FvdError> {
        self.switch(name, false)
    }
}

#[derive(Debug, Default)]
pub struct FakePinMux {
    states: Mutex<Vec<PinMuxState>>,
}

impl FakePinMux {
    pub fn states(&self) -> Vec<PinMuxState> {
        self.states.lock().unwrap().clone()
    }
}

impl PinMux for FakePinMux {
    fn select(&self, state: PinMuxState) -> Result<(), FvdError> {
        self.states.lock().unwrap().push(state);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiWrite {
    pub bus: u16,
    pub config: SpiClientConfig,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct SpiState {
    writes: Vec<SpiWrite>,
    acquired: usize,
    fail_acquire: bool,
    /// 1-based index of the write that fails.
    fail_write: Option<usize>,
}

#[derive(Debug, Default)]
pub struct FakeSpi {
    state: Arc<Mutex<SpiState>>,
    released: Arc<AtomicUsize>,
}

impl FakeSpi {
    pub fn fail_acquire(&self) {
        self.state.lock().unwrap().fail_acquire = true;
    }

    pub fn fail_write(&self, index: usize) {
        self.state.lock().unwrap().fail_write = Some(index);
    }

    pub fn writes(&self) -> Vec<SpiWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn acquired(&self) -> usize {
        self.state.lock().unwrap().acquired
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn bytes_written(&self) -> usize {
        self.state.lock().unwrap().writes.iter().map(|w| w.data.len()).sum()
    }
}

struct FakeSpiClient {
    bus: u16,
    config: SpiClientConfig,
    state: Arc<Mutex<SpiState>>,
    released: Arc<AtomicUsize>,
}

impl SpiClient for FakeSpiClient {
    fn write(&mut self, data: &[u8]) -> Result<(), FvdError> {
        let mut state = self.state.lock().unwrap();
        state.writes.push(SpiWrite {
            bus: self.bus,
            config: self.config.clone(),
            data: data.to_vec(),
        });
        match state.fail_write == Some(state.writes.len()) {
            true => Err(FvdError::SerialWriteFailed(String::from("injected failure"))),
            false => Ok(()),
        }
    }
}

impl Drop for FakeSpiClient {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl SpiController for FakeSpi {
    fn acquire_client(
        &self,
        bus: u16,
        config: &SpiClientConfig,
    ) -> Result<Box<dyn SpiClient>, FvdError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_acquire {
            return Err(FvdError::NoSerialBus {
                bus,
                reason: String::from("no master"),
            });
        }
        state.acquired += 1;
        Ok(Box::new(FakeSpiClient {
            bus,
            config: config.clone(),
            state: self.state.clone(),
            released: self.released.clone(),
        }))
    }
}

#[derive(Debug, Default)]
pub struct FakeEeprom {
    record: Mutex<Option<Vec<u8>>>,
}

impl FakeEeprom {
    pub fn set_identity(&self, article: u32, revision: u32) {
        let mut record = vec![0u8; 32];
        let article = format!("T{article}");
        let revision = revision.to_string();
        record[..article.len()].copy_from_slice(article.as_bytes());
        record[20..20 + revision.len()].copy_from_slice(revision.as_bytes());
        *self.record.lock().unwrap() = Some(record);
    }
}

impl IdentityEeprom for FakeEeprom {
    fn write_read(&self, _register: u8, buf: &mut [u8]) -> Result<(), FvdError> {
        match self.record.lock().unwrap().as_ref() {
            Some(record) => {
                buf.copy_from_slice(&record[..buf.len()]);
                Ok(())
            }
            None => Err(FvdError::IdentityUnreadable(String::from("no ack"))),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeFirmware {
    images: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeFirmware {
    pub fn insert(&self, name: &str, image: Vec<u8>) {
        self.images.lock().unwrap().insert(name.to_string(), image);
    }
}

impl FirmwareSource for FakeFirmware {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, FvdError> {
        self.images
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| FvdError::ImageUnavailable {
                name: name.to_string(),
                reason: String::from("not found"),
            })
    }
}

#[derive(Debug, Default)]
pub struct FakeFlash {
    contents: Mutex<Vec<u8>>,
}

impl FakeFlash {
    pub fn set_contents(&self, contents: Vec<u8>) {
        *self.contents.lock().unwrap() = contents;
    }
}

impl FlashReader for FakeFlash {
    fn size(&self) -> Result<u64, FvdError> {
        Ok(self.contents.lock().unwrap().len() as u64)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), FvdError> {
        let contents = self.contents.lock().unwrap();
        let start = offset as usize;
        buf.copy_from_slice(&contents[start..start + buf.len()]);
        Ok(())
    }
}

/// Pin names every flash-boot board resolves, mapped to arbitrary numbers.
pub const NAMED_PINS: &[(&str, u32)] = &[
    ("fpga_ce_n", 200),
    ("fpga_config_n", 201),
    ("fpga_status_n", 202),
    ("fpga_conf_done", 203),
    ("fpga-ready-gpio", 204),
    ("spi-sclk-gpio", 205),
    ("spi-mosi-gpio", 206),
    ("spi-miso-gpio", 207),
    ("spi-cs-gpio", 208),
    ("fpga-program-gpio", 209),
    ("fpga-init-gpio", 210),
    ("fpga-conf-done-gpio", 211),
];

pub struct Fakes {
    pub clock: Arc<VirtualClock>,
    pub gpio: Arc<FakeGpio>,
    pub regulators: Arc<FakeRegulators>,
    pub pinmux: Arc<FakePinMux>,
    pub spi: Arc<FakeSpi>,
    pub eeprom: Arc<FakeEeprom>,
    pub firmware: Arc<FakeFirmware>,
    pub flash: Arc<FakeFlash>,
}

impl Fakes {
    pub fn new() -> Self {
        let clock = Arc::new(VirtualClock::default());
        Fakes {
            gpio: Arc::new(FakeGpio::new(clock.clone(), NAMED_PINS)),
            clock,
            regulators: Arc::default(),
            pinmux: Arc::default(),
            spi: Arc::default(),
            eeprom: Arc::default(),
            firmware: Arc::default(),
            flash: Arc::default(),
        }
    }

    pub fn hardware(&self) -> Hardware {
        Hardware {
            gpio: self.gpio.clone(),
            regulators: self.regulators.clone(),
            pinmux: self.pinmux.clone(),
            spi: self.spi.clone(),
            eeprom: self.eeprom.clone(),
            firmware: self.firmware.clone(),
            flash: self.flash.clone(),
            clock: self.clock.clone(),
        }
    }
}
