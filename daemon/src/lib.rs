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

//! fvdd - power, configuration and supervision of the FLIR video device FPGA.
//!
//! The crate is the configuration core of the `fvdd` daemon. It brings the FPGA's rails up
//! in order, gets a bitstream into the device (shifted in over SPI, or loaded by the FPGA
//! itself from NOR flash) and watches the handshake lines that report how configuration
//! went.
//!
//! # Layers
//!
//! - [`hal`] - traits for every hardware collaborator, with [`hal::linux`] implementations
//! - [`power`], [`handshake`], [`bitstream`], [`serial_loader`], [`flash_prep`],
//!   [`identity`] - the building blocks, each testable on its own
//! - [`boards`] - one profile per hardware revision; tables only
//! - [`device`] - [`device::FvdDevice`], which runs the sequences a board needs
//! - [`comm`] - the DBus surface of the daemon
//!
//! # Examples
//!
//! ```rust,no_run
//! use fvdd::boards::detect_board;
//! use fvdd::config::config;
//! use fvdd::device::FvdDevice;
//! use fvdd::hal::linux::hardware_from_config;
//!
//! # fn example() -> Result<(), fvdd::error::FvdError> {
//! let config = config();
//! let board = detect_board(config)?;
//! let mut device = FvdDevice::attach(board, hardware_from_config(config), config.into())?;
//! device.initialize()?;
//! println!("{:?}", device.status());
//! # Ok(())
//! # }
//! ```

pub mod bitstream;
pub mod boards;
pub mod comm;
pub mod config;
pub mod device;
pub mod error;
pub mod flash_prep;
pub mod hal;
pub mod handshake;
pub mod identity;
pub mod power;
pub mod serial_loader;
pub mod system_io;
