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

use log::error;
use std::fmt;
use std::path::PathBuf;
use zbus::fdo;

#[derive(Debug, thiserror::Error)]
pub enum FvdError {
    #[error("FvdError::RailUnavailable: Rail '{0}' could not be resolved when the board was attached")]
    RailUnavailable(String),
    #[error("FvdError::RailSequenceFailed: Failed to switch rail(s): {}", .0.join(", "))]
    RailSequenceFailed(Vec<String>),
    #[error("FvdError::MalformedImage: {0}")]
    MalformedImage(String),
    #[error("FvdError::ImageUnavailable: Firmware image {name:?} could not be fetched: {reason}")]
    ImageUnavailable { name: String, reason: String },
    #[error("FvdError::NoSerialBus: Could not obtain a client on serial bus {bus}: {reason}")]
    NoSerialBus { bus: u16, reason: String },
    #[error("FvdError::SerialWriteFailed: {0}")]
    SerialWriteFailed(String),
    #[error("FvdError::FlashPrepFailed: Flash command {command} failed at step {step}: {reason}")]
    FlashPrepFailed {
        step: usize,
        command: &'static str,
        reason: String,
    },
    #[error("FvdError::ConfigTimeout: DONE was not asserted within {elapsed_ms} ms")]
    ConfigTimeout { elapsed_ms: u64 },
    #[error("FvdError::IdentityUnreadable: {0}")]
    IdentityUnreadable(String),
    #[error("FvdError::ProgrammingModeFailed: {0}")]
    ProgrammingModeFailed(String),
    #[error("FvdError::LineUnavailable: Handshake line '{0}' is not available on this board")]
    LineUnavailable(String),
    #[error("FvdError::Gpio: GPIO {pin} operation '{op}' failed: {reason}")]
    Gpio {
        pin: u32,
        op: &'static str,
        reason: String,
    },
    #[error("FvdError::BusConflict: {0}")]
    BusConflict(String),
    #[error("FvdError::UnknownBoard: No board profile matches {0:?}")]
    UnknownBoard(String),
    #[error("FvdError::FlashHeaderInvalid: {0}")]
    FlashHeaderInvalid(String),
    #[error("FvdError::Argument: {0}")]
    Argument(String),
    #[error("FvdError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("FvdError::IOWrite: An IO error occurred when writing to {file:?}: {e}")]
    IOWrite { file: PathBuf, e: std::io::Error },
    #[error("FvdError::TomlDe: Failed to parse config {toml_string:?}: {e}")]
    TomlDe {
        toml_string: String,
        e: toml::de::Error,
    },
    #[error("FvdError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

/// Coarse classification of an [`FvdError`], kept by the device so that a status query can
/// report how the last configuration attempt failed without holding on to the error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RailUnavailable,
    RailSequenceFailed,
    MalformedImage,
    ImageUnavailable,
    NoSerialBus,
    SerialWriteFailed,
    FlashPrepFailed,
    ConfigTimeout,
    IdentityUnreadable,
    ProgrammingModeFailed,
    LineUnavailable,
    Gpio,
    BusConflict,
    UnknownBoard,
    FlashHeaderInvalid,
    Argument,
    Io,
    Config,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FvdError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FvdError::RailUnavailable(..) => ErrorKind::RailUnavailable,
            FvdError::RailSequenceFailed(..) => ErrorKind::RailSequenceFailed,
            FvdError::MalformedImage(..) => ErrorKind::MalformedImage,
            FvdError::ImageUnavailable { .. } => ErrorKind::ImageUnavailable,
            FvdError::NoSerialBus { .. } => ErrorKind::NoSerialBus,
            FvdError::SerialWriteFailed(..) => ErrorKind::SerialWriteFailed,
            FvdError::FlashPrepFailed { .. } => ErrorKind::FlashPrepFailed,
            FvdError::ConfigTimeout { .. } => ErrorKind::ConfigTimeout,
            FvdError::IdentityUnreadable(..) => ErrorKind::IdentityUnreadable,
            FvdError::ProgrammingModeFailed(..) => ErrorKind::ProgrammingModeFailed,
            FvdError::LineUnavailable(..) => ErrorKind::LineUnavailable,
            FvdError::Gpio { .. } => ErrorKind::Gpio,
            FvdError::BusConflict(..) => ErrorKind::BusConflict,
            FvdError::UnknownBoard(..) => ErrorKind::UnknownBoard,
            FvdError::FlashHeaderInvalid(..) => ErrorKind::FlashHeaderInvalid,
            FvdError::Argument(..) => ErrorKind::Argument,
            FvdError::IORead { .. } | FvdError::IOWrite { .. } => ErrorKind::Io,
            FvdError::TomlDe { .. } => ErrorKind::Config,
            FvdError::Internal(..) => ErrorKind::Internal,
        }
    }
}

impl From<FvdError> for fdo::Error {
    fn from(err: FvdError) -> Self {
        error!("{err}");
        match err {
            FvdError::Argument(..) => fdo::Error::InvalidArgs(err.to_string()),
            FvdError::IORead { .. } => fdo::Error::IOError(err.to_string()),
            FvdError::IOWrite { .. } => fdo::Error::IOError(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}
