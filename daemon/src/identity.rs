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

//! Mainboard article number and revision.
//!
//! The record lives in the identity EEPROM at register `0x40`:
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 10   | article, ASCII `T<number>`     |
//! | 10     | 10   | serial number                  |
//! | 20     | 4    | revision, ASCII decimal        |
//! | 24     | 2    | module offset                  |
//! | 26     | 2    | module device                  |
//! | 28     | 2    | reserved                       |
//! | 30     | 2    | checksum                       |

use crate::error::FvdError;
use crate::hal::IdentityEeprom;
use log::{info, warn};
use std::fmt;
use std::sync::OnceLock;

pub const IDENTITY_REGISTER: u8 = 0x40;
pub const IDENTITY_RECORD_SIZE: usize = 32;

pub const DEFAULT_FIRMWARE: &str = "FLIR/fpga.bin";
const NECO_ARTICLE: u32 = 198606;

/// Article and revision of the mainboard. Zero in both means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MainboardIdentity {
    pub article: u32,
    pub revision: u32,
}

impl MainboardIdentity {
    pub const fn new(article: u32, revision: u32) -> Self {
        MainboardIdentity { article, revision }
    }

    pub fn is_known(&self) -> bool {
        self.article != 0
    }

    /// Name of the firmware image built for this mainboard.
    pub fn firmware_name(&self) -> &'static str {
        match (self.article, self.revision) {
            (NECO_ARTICLE, revision) if revision >= 4 => "FLIR/fpga_neco_c.bin",
            (NECO_ARTICLE, _) => "FLIR/fpga_neco_b.bin",
            _ => DEFAULT_FIRMWARE,
        }
    }
}

impl fmt::Display for MainboardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{} rev {}", self.article, self.revision)
    }
}

fn field(raw: &[u8]) -> &str {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end]).unwrap_or("").trim()
}

/// Decode an identity record.
///
/// # Returns: `Result<MainboardIdentity, FvdError>`
/// * `Ok(MainboardIdentity)` - Article and revision decoded
/// * `Err(FvdError::IdentityUnreadable)` - Record too short or article/revision not numeric
pub fn parse_record(record: &[u8]) -> Result<MainboardIdentity, FvdError> {
    if record.len() < IDENTITY_RECORD_SIZE {
        return Err(FvdError::IdentityUnreadable(format!(
            "record is {} bytes, expected {IDENTITY_RECORD_SIZE}",
            record.len()
        )));
    }
    let article = field(&record[0..10]);
    let article = article
        .strip_prefix('T')
        .and_then(|number| number.parse::<u32>().ok())
        .ok_or_else(|| FvdError::IdentityUnreadable(format!("bad article {article:?}")))?;
    let revision = field(&record[20..24]);
    let revision = revision
        .parse::<u32>()
        .map_err(|_| FvdError::IdentityUnreadable(format!("bad revision {revision:?}")))?;
    Ok(MainboardIdentity { article, revision })
}

/// Read the identity record from the EEPROM.
pub fn read_identity(eeprom: &dyn IdentityEeprom) -> Result<MainboardIdentity, FvdError> {
    let mut record = [0u8; IDENTITY_RECORD_SIZE];
    eeprom.write_read(IDENTITY_REGISTER, &mut record)?;
    parse_record(&record)
}

/// Caches the first successful identity read for the lifetime of the device.
#[derive(Debug, Default)]
pub struct IdentityCache {
    cached: OnceLock<MainboardIdentity>,
}

impl IdentityCache {
    /// Return the cached identity, reading it first if needed.
    ///
    /// A failed read is logged and yields the zeroed identity; it is not cached, so the next
    /// call tries again.
    pub fn get(&self, eeprom: &dyn IdentityEeprom) -> MainboardIdentity {
        if let Some(identity) = self.cached.get() {
            return *identity;
        }
        match read_identity(eeprom) {
            Ok(identity) => {
                info!("Mainboard {identity}");
                *self.cached.get_or_init(|| identity)
            }
            Err(e) => {
                warn!("Mainboard identity unknown, using default tables: {e}");
                MainboardIdentity::default()
            }
        }
    }

    pub fn cached(&self) -> Option<MainboardIdentity> {
        self.cached.get().copied()
    }
}
