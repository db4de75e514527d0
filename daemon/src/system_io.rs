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

//! Error Wrapping File System I/O Helpers
//!
//! Thin wrappers around the standard library file operations used by the Linux hardware
//! backends (sysfs GPIO, regulator consumers, EEPROM, MTD and firmware files). Every function
//! logs at `trace` level and converts failures into [`FvdError::IORead`] or
//! [`FvdError::IOWrite`] carrying the offending path.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use fvdd::system_io::{fs_read, fs_write};
//! # use std::path::Path;
//!
//! # fn example() -> Result<(), fvdd::error::FvdError> {
//! let value = fs_read(Path::new("/sys/class/gpio/gpio123/value"))?;
//! fs_write(Path::new("/sys/class/gpio/gpio123/direction"), "in")?;
//! # Ok(())
//! # }
//! ```

use crate::error::FvdError;
use log::trace;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Read the contents of a file to a String.
///
/// # Arguments
///
/// * `file_path` - Path to the file to read
///
/// # Returns: `Result<String, FvdError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(FvdError::IORead)` - If the file cannot be read (doesn't exist, permissions, etc.)
pub fn fs_read(file_path: &Path) -> Result<String, FvdError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf: String = String::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_string(&mut buf));

    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(FvdError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Read the whole file as raw bytes.
///
/// # Arguments
///
/// * `file_path` - Path to the file to read
///
/// # Returns: `Result<Vec<u8>, FvdError>`
/// * `Ok(Vec<u8>)` - The file contents
/// * `Err(FvdError::IORead)` - If the file cannot be read
pub fn fs_read_bytes(file_path: &Path) -> Result<Vec<u8>, FvdError> {
    trace!("Attempting to read bytes from {file_path:?}");
    let mut buf = Vec::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_end(&mut buf));

    match result {
        Ok(n) => {
            trace!("Read {n} bytes");
            Ok(buf)
        }
        Err(e) => Err(FvdError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Fill `buf` with bytes read from `file_path` starting at `offset`.
///
/// Used for EEPROM records and the tail of an MTD character device, where only a window
/// of a large file is of interest.
///
/// # Arguments
///
/// * `file_path` - Path to the file (or device node) to read
/// * `offset` - Byte offset of the first byte to read
/// * `buf` - Destination; it is filled completely or the call fails
///
/// # Returns: `Result<(), FvdError>`
/// * `Ok(())` - `buf` holds `buf.len()` bytes from `offset`
/// * `Err(FvdError::IORead)` - Open, seek or a short read failed
pub fn fs_read_at(file_path: &Path, offset: u64, buf: &mut [u8]) -> Result<(), FvdError> {
    trace!(
        "Attempting to read {} bytes at offset {offset:#x} from {file_path:?}",
        buf.len()
    );
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| {
            f.seek(SeekFrom::Start(offset))?;
            f.read_exact(buf)
        });
    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(())
        }
        Err(e) => Err(FvdError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Write a string value to an existing file.
///
/// sysfs attributes must exist already, so the file is never created.
///
/// # Arguments
///
/// * `file_path` - Path to the file to write
/// * `value` - The string value to write (implements `AsRef<str>`)
///
/// # Returns: `Result<(), FvdError>`
/// * `Ok(())` - Write succeeded
/// * `Err(FvdError::IOWrite)` - If the write fails (permissions, file doesn't exist, etc.)
pub fn fs_write(file_path: &Path, value: impl AsRef<str>) -> Result<(), FvdError> {
    trace!(
        "Attempting to write {:?} to {:?}",
        value.as_ref(),
        file_path
    );
    let result = OpenOptions::new()
        .read(false)
        .write(true)
        .open(file_path)
        .and_then(|mut f| write!(f, "{}", value.as_ref()));
    match result {
        Ok(_) => {
            trace!("Write done.");
            Ok(())
        }
        Err(e) => Err(FvdError::IOWrite {
            file: file_path.into(),
            e,
        }),
    }
}
