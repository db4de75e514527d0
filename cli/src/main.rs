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

//! `fvdd_cli` talks to the fvdd daemon over the system DBus.
//!
//! ```bash
//! fvdd_cli status
//! fvdd_cli status --pins
//! fvdd_cli power-up --reconfigure
//! fvdd_cli reload
//! ```
//!
//! Every command prints the daemon's reply. Errors raised by the daemon arrive as DBus
//! errors whose message starts with the `FvdError` variant, e.g.
//! `FvdError::ConfigTimeout: DONE was not asserted within 500 ms`.

mod control;
mod proxies;
mod status;

use crate::control::{ControlRequest, control_handler};
use crate::status::status_handler;
use clap::{Parser, Subcommand, arg, command};
use log::{debug, error};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fvdd_cli")]
#[command(bin_name = "fvdd_cli")]
#[command(about = "Power, configure and inspect the camera FPGA through fvdd")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show board, configuration state and handshake pins
    Status {
        #[arg(long, help = "only print the CONF_DONE, nSTATUS and READY levels")]
        pins: bool,
        #[arg(long, help = "also print the header of the last parsed image")]
        headers: bool,
    },
    /// Switch the FPGA core rails on
    PowerUp {
        #[arg(long, help = "also load (direct-load boards) or reload (flash boards) the FPGA")]
        reconfigure: bool,
    },
    /// Switch the FPGA off
    PowerDown,
    /// Switch the detector rails on
    FpaUp,
    /// Switch the detector rails off
    FpaDown,
    /// Load the firmware image over the serial bus
    Load,
    /// Make the FPGA configure itself again
    Reload,
    /// Read the image header stored in the configuration flash
    Header,
    /// Detector off, then FPGA off
    Suspend,
    /// Power the FPGA back up and configure it
    Resume,
}

/// A parsed command, ready to be sent to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Status { pins: bool, headers: bool },
    Control(ControlRequest),
}

impl Commands {
    fn request(&self) -> Request {
        let control = match self {
            Commands::Status { pins, headers } => {
                return Request::Status {
                    pins: *pins,
                    headers: *headers,
                };
            }
            Commands::PowerUp { reconfigure } => ControlRequest::PowerUp {
                reconfigure: *reconfigure,
            },
            Commands::PowerDown => ControlRequest::PowerDown,
            Commands::FpaUp => ControlRequest::FpaUp,
            Commands::FpaDown => ControlRequest::FpaDown,
            Commands::Load => ControlRequest::Load,
            Commands::Reload => ControlRequest::Reload,
            Commands::Header => ControlRequest::ReadHeader,
            Commands::Suspend => ControlRequest::Suspend,
            Commands::Resume => ControlRequest::Resume,
        };
        Request::Control(control)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    let result = match cli.command.request() {
        Request::Status { pins, headers } => status_handler(pins, headers).await,
        Request::Control(request) => control_handler(request).await,
    };
    match result {
        Ok(msg) => {
            println!("{msg}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
