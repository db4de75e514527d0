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

//! Ownership of the serial bus and the bitstream transfer over it.
//!
//! On flash-boot boards the SPI bus is shared between the host (talking to the NOR flash) and
//! the FPGA, which reads its image from that same flash while it configures. [`BusMode`]
//! tracks who owns the pins. In [`BusMode::GenericPeripheral`] the SPI controller drives them;
//! in [`BusMode::ConfigurationStrobe`] the host parks them as plain GPIO inputs so the FPGA
//! can drive them without contention.
//!
//! Direct-load boards own their bus outright. Mode switches there only update the mode.

use crate::error::FvdError;
use crate::hal::{Direction, GpioController, PinMux, PinMuxState, PinRef, SpiClientConfig, SpiController};
use log::{debug, error, trace, warn};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    GenericPeripheral,
    ConfigurationStrobe,
}

impl fmt::Display for BusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The bus a board loads its bitstream over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialProfile {
    pub bus: u16,
    pub client: SpiClientConfig,
    /// The transfer length is the payload length divided by this, rounded up to whole words.
    pub word_divisor: usize,
}

impl SerialProfile {
    /// Passive serial configuration port: 32-bit words, SPI mode 0 at 50 MHz.
    pub const fn passive_serial(bus: u16, word_divisor: usize) -> Self {
        SerialProfile {
            bus,
            client: SpiClientConfig {
                modalias: "fvdspi",
                chip_select: 0,
                max_speed_hz: 50_000_000,
                mode: 0,
                bits_per_word: 32,
            },
            word_divisor,
        }
    }

    /// Number of bytes written for a payload of `len` bytes.
    pub fn transfer_len(&self, len: usize) -> usize {
        len.div_ceil(self.word_divisor.max(1)).next_multiple_of(4)
    }
}

/// Pins of a bus shared between the flash and the FPGA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedBusPins {
    pub sclk: PinRef,
    pub mosi: PinRef,
    pub miso: PinRef,
    pub cs: PinRef,
}

#[derive(Debug)]
struct ResolvedBusPins {
    /// `(pin, label)` of the data pins handed back and forth.
    strobes: [(u32, &'static str); 3],
    cs: u32,
}

pub struct SerialLoader {
    gpio: Arc<dyn GpioController>,
    pinmux: Arc<dyn PinMux>,
    spi: Arc<dyn SpiController>,
    profile: SerialProfile,
    shared: Option<ResolvedBusPins>,
    mode: BusMode,
    /// Strobe pins currently requested as GPIOs.
    held: Vec<u32>,
}

impl SerialLoader {
    /// Set up the loader in [`BusMode::GenericPeripheral`]. The chip select of a shared bus
    /// is claimed for the lifetime of the loader.
    pub fn attach(
        gpio: Arc<dyn GpioController>,
        pinmux: Arc<dyn PinMux>,
        spi: Arc<dyn SpiController>,
        profile: SerialProfile,
        shared: Option<SharedBusPins>,
    ) -> Result<Self, FvdError> {
        let shared = match shared {
            None => None,
            Some(pins) => {
                let g = gpio.as_ref();
                let resolved = ResolvedBusPins {
                    strobes: [
                        (pins.sclk.resolve(g)?, "SPI1_SCLK"),
                        (pins.mosi.resolve(g)?, "SPI1_MOSI"),
                        (pins.miso.resolve(g)?, "SPI1_MISO"),
                    ],
                    cs: pins.cs.resolve(g)?,
                };
                gpio.request(resolved.cs, "SPI1_CS")
                    .map_err(|_| FvdError::LineUnavailable(String::from("spi-cs-gpio")))?;
                Some(resolved)
            }
        };
        Ok(SerialLoader {
            gpio,
            pinmux,
            spi,
            profile,
            shared,
            mode: BusMode::GenericPeripheral,
            held: Vec::new(),
        })
    }

    pub fn mode(&self) -> BusMode {
        self.mode
    }

    pub fn profile(&self) -> &SerialProfile {
        &self.profile
    }

    /// Hand the bus pins to the SPI controller.
    ///
    /// Chip select goes high, the pin-mux default state is restored and the strobe pins
    /// requested by [`deactivate_bus`](Self::deactivate_bus) are released. Every step is
    /// attempted; the first error is returned and the mode is `GenericPeripheral` either way.
    pub fn activate_bus(&mut self) -> Result<(), FvdError> {
        if self.mode == BusMode::GenericPeripheral {
            debug!("Bus already in {}", self.mode);
            return Ok(());
        }
        let mut result = Ok(());
        if let Some(pins) = &self.shared {
            result = result.and(self.gpio.set_direction(pins.cs, Direction::Output(true)));
            result = result.and(self.pinmux.select(PinMuxState::Default));
            for pin in self.held.drain(..) {
                if let Err(e) = self.gpio.release(pin) {
                    error!("Failed to release bus pin {pin}: {e}");
                    result = result.and(Err(e));
                }
            }
        }
        self.mode = BusMode::GenericPeripheral;
        debug!("Bus switched to {}", self.mode);
        result
    }

    /// Park the bus pins as GPIO inputs so the FPGA can drive them.
    ///
    /// The pin-mux idle state is selected, chip select becomes an input and the clock and
    /// data pins are requested as inputs. Same error policy as
    /// [`activate_bus`](Self::activate_bus).
    pub fn deactivate_bus(&mut self) -> Result<(), FvdError> {
        if self.mode == BusMode::ConfigurationStrobe {
            debug!("Bus already in {}", self.mode);
            return Ok(());
        }
        let mut result = Ok(());
        if let Some(pins) = &self.shared {
            result = result.and(self.pinmux.select(PinMuxState::Idle));
            result = result.and(self.gpio.set_direction(pins.cs, Direction::Input));
            for (pin, label) in pins.strobes {
                let claimed = self
                    .gpio
                    .request(pin, label)
                    .and_then(|_| {
                        self.held.push(pin);
                        self.gpio.set_direction(pin, Direction::Input)
                    });
                if let Err(e) = claimed {
                    error!("Failed to park bus pin {label}: {e}");
                    result = result.and(Err(e));
                }
            }
        }
        self.mode = BusMode::ConfigurationStrobe;
        debug!("Bus switched to {}", self.mode);
        result
    }

    /// Write a prepared payload to the FPGA's configuration port.
    ///
    /// A client is acquired for this transfer only and released before returning, whether
    /// the write succeeded or not.
    ///
    /// # Arguments
    ///
    /// * `payload` - Word-aligned, already reordered payload
    ///
    /// # Returns: `Result<usize, FvdError>`
    /// * `Ok(usize)` - Number of bytes written
    /// * `Err(FvdError::BusConflict)` - The bus pins are parked for the FPGA
    /// * `Err(FvdError::NoSerialBus)` - No client could be created on the bus
    /// * `Err(FvdError::SerialWriteFailed)` - The write failed
    pub fn transfer(&mut self, payload: &[u8]) -> Result<usize, FvdError> {
        if self.mode == BusMode::ConfigurationStrobe {
            return Err(FvdError::BusConflict(String::from(
                "bus pins are parked as configuration strobes",
            )));
        }
        let len = self.profile.transfer_len(payload.len());
        let mut client = self.spi.acquire_client(self.profile.bus, &self.profile.client)?;
        trace!(
            "Writing {len} of {} payload bytes to bus {}",
            payload.len(),
            self.profile.bus
        );
        let result = match len <= payload.len() {
            true => client.write(&payload[..len]),
            false => {
                let mut padded = payload.to_vec();
                padded.resize(len, 0);
                client.write(&padded)
            }
        };
        drop(client);
        result.map(|_| len)
    }

    /// Give back the chip select and any parked pins.
    pub fn release(&mut self) {
        if let Some(pins) = &self.shared {
            for pin in self.held.drain(..).chain(std::iter::once(pins.cs)) {
                if let Err(e) = self.gpio.release(pin) {
                    warn!("Failed to release bus pin {pin}: {e}");
                }
            }
        }
    }
}
