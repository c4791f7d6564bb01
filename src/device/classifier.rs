//! # Processing-State Classifier
//!
//! Each outlet reports what it is doing as a two-digit mode code, optionally
//! followed by a two-digit sub-type (charge program, discharge program, delay
//! reason, ...). The numbering of the mode codes differs between the Duo,
//! Trio and Quick device families, the sub-type tables are shared.

use crate::constants::CODE_LEN;
use crate::device::layout::ChannelLayout;
use crate::error::DecodeError;
use crate::protocol::frame::{field, hex_field};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an outlet is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingMode {
    None,
    Charge,
    Discharge,
    Delay,
    Pause,
    Finished,
    Error,
    Balance,
    TireHeater,
    Motor,
    StoreCharge,
    StoreDischarge,
}

impl ProcessingMode {
    pub fn name(self) -> &'static str {
        match self {
            ProcessingMode::None => "none",
            ProcessingMode::Charge => "charge",
            ProcessingMode::Discharge => "discharge",
            ProcessingMode::Delay => "delay",
            ProcessingMode::Pause => "pause",
            ProcessingMode::Finished => "finished",
            ProcessingMode::Error => "error",
            ProcessingMode::Balance => "balance",
            ProcessingMode::TireHeater => "tire heater",
            ProcessingMode::Motor => "motor",
            ProcessingMode::StoreCharge => "store charge",
            ProcessingMode::StoreDischarge => "store discharge",
        }
    }

    /// Sub-type table used for this mode.
    pub fn sub_types(self) -> Option<&'static [&'static str]> {
        match self {
            ProcessingMode::Charge => Some(&CHARGE_TYPES),
            ProcessingMode::Discharge => Some(&DISCHARGE_TYPES),
            ProcessingMode::Delay => Some(&DELAY_TYPES),
            ProcessingMode::Finished => Some(&CURRENT_TYPES),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const CHARGE_TYPES: [&str; 13] = [
    "Automatic",
    "Auto NiXx",
    "Normal",
    "Linear",
    "Auto Li",
    "Link",
    "ReFlex",
    "Step",
    "CV-CC",
    "Link CV-CC",
    "Re-Peak",
    "Balance",
    "Storage",
];

pub const DISCHARGE_TYPES: [&str; 9] = [
    "Automatic",
    "Auto NiXx",
    "Normal",
    "Linear",
    "Auto Li",
    "Link",
    "Break-in",
    "Balance",
    "Storage",
];

pub const DELAY_TYPES: [&str; 4] = ["Delay", "Cool down", "Wait for charge", "Wait for discharge"];

pub const CURRENT_TYPES: [&str; 9] = [
    "Charge current",
    "Discharge current",
    "Trickle current",
    "Balance current",
    "Store current",
    "Cycle current",
    "Link current",
    "Tire heater current",
    "Motor current",
];

/// Sub-type codes that mark a linked charge or discharge.
pub const LINK_SUB_TYPES: [&[u8]; 2] = [b"05", b"09"];

/// Mode code numbering of a device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeScheme {
    /// Ultramat 16S/18, Ultra Duo Plus 45/50/60/80
    Duo,
    /// Ultramat Trio 14, Ultra Trio Plus 14/16S
    Trio,
    /// Ultra Quick 70
    Quick,
}

impl ModeScheme {
    /// Maps a mode code to a mode, `None` for codes outside the scheme.
    pub fn mode(self, code: u8) -> Option<ProcessingMode> {
        use ProcessingMode::*;
        match (self, code) {
            (_, 0) => Some(None),
            (_, 1) => Some(Charge),
            (_, 2) => Some(Discharge),
            (ModeScheme::Duo, 3) => Some(Delay),
            (ModeScheme::Duo, 4) => Some(Pause),
            (ModeScheme::Duo, 5) => Some(Finished),
            (ModeScheme::Duo, 6) => Some(Error),
            (ModeScheme::Duo, 7) => Some(Balance),
            (ModeScheme::Duo, 8) => Some(TireHeater),
            (ModeScheme::Duo, 9) => Some(Motor),
            (ModeScheme::Trio, 3) | (ModeScheme::Quick, 3) => Some(Pause),
            (ModeScheme::Trio, 4) | (ModeScheme::Quick, 4) => Some(Finished),
            (ModeScheme::Trio, 5) => Some(Error),
            (ModeScheme::Trio, 6) | (ModeScheme::Quick, 5) => Some(Balance),
            (ModeScheme::Trio, 11) | (ModeScheme::Quick, 11) => Some(StoreCharge),
            (ModeScheme::Trio, 12) | (ModeScheme::Quick, 12) => Some(StoreDischarge),
            _ => Option::None,
        }
    }

    /// Whether an outlet in `mode` is running a process worth recording.
    pub fn is_active(self, mode: ProcessingMode) -> bool {
        use ProcessingMode::*;
        match self {
            ModeScheme::Duo => !matches!(mode, None | Error),
            ModeScheme::Trio | ModeScheme::Quick => matches!(
                mode,
                Charge | Discharge | Pause | Balance | StoreCharge | StoreDischarge
            ),
        }
    }
}

/// Classified state of one outlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingState {
    pub mode: ProcessingMode,
    pub mode_code: u8,
    pub sub_type: Option<&'static str>,
    pub sub_type_code: Option<u8>,
    pub active: bool,
}

/// Classifies outlet `number` of `frame`.
///
/// Unknown mode codes fail with [`DecodeError::UnknownMode`], sub-type
/// indexes outside the mode's table with [`DecodeError::UnknownSubtype`].
pub fn classify(
    layout: &ChannelLayout,
    number: usize,
    frame: &[u8],
) -> Result<ProcessingState, DecodeError> {
    let outlet = layout.outlet(number).ok_or(DecodeError::OutOfBounds {
        offset: number,
        len: layout.outlet_count(),
    })?;

    let mode_code = hex_field(frame, outlet.mode, CODE_LEN)? as u8;
    let mode = layout
        .scheme
        .mode(mode_code)
        .ok_or(DecodeError::UnknownMode(mode_code))?;

    let sub_type_code = match outlet.sub_type {
        Some(offset) => Some(hex_field(frame, offset, CODE_LEN)? as u8),
        None => None,
    };
    let sub_type = match (mode.sub_types(), sub_type_code) {
        (Some(table), Some(index)) => Some(*table.get(index as usize).ok_or_else(|| {
            DecodeError::UnknownSubtype {
                mode: mode.name().to_string(),
                index,
            }
        })?),
        _ => None,
    };

    Ok(ProcessingState {
        mode,
        mode_code,
        sub_type,
        sub_type_code,
        active: layout.scheme.is_active(mode),
    })
}

/// Mode of outlet `number` without looking at the sub-type.
pub fn mode_of(layout: &ChannelLayout, number: usize, frame: &[u8]) -> Option<(ProcessingMode, u8)> {
    let outlet = layout.outlet(number)?;
    let code = hex_field(frame, outlet.mode, CODE_LEN).ok()? as u8;
    Some((layout.scheme.mode(code)?, code))
}

/// Activity of outlet `number`; unknown or unreadable modes count as idle.
pub fn is_active(layout: &ChannelLayout, number: usize, frame: &[u8]) -> bool {
    mode_of(layout, number, frame)
        .map(|(mode, _)| layout.scheme.is_active(mode))
        .unwrap_or(false)
}

/// True when the linked outlets run one process together: both report the
/// same mode and sub-type and the sub-type is a link program.
pub fn is_linked(layout: &ChannelLayout, frame: &[u8]) -> bool {
    let Some((a, b)) = layout.linked else {
        return false;
    };
    let codes = |number: usize| -> Option<(&[u8], &[u8])> {
        let outlet = layout.outlet(number)?;
        let mode = field(frame, outlet.mode, CODE_LEN).ok()?;
        let sub_type = field(frame, outlet.sub_type?, CODE_LEN).ok()?;
        Some((mode, sub_type))
    };
    match (codes(a), codes(b)) {
        (Some(first), Some(second)) => first == second && LINK_SUB_TYPES.contains(&first.1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duo_scheme() {
        let duo = ModeScheme::Duo;
        assert_eq!(duo.mode(3), Some(ProcessingMode::Delay));
        assert_eq!(duo.mode(9), Some(ProcessingMode::Motor));
        assert_eq!(duo.mode(10), None);
        assert!(duo.is_active(ProcessingMode::Finished));
        assert!(duo.is_active(ProcessingMode::TireHeater));
        assert!(!duo.is_active(ProcessingMode::None));
        assert!(!duo.is_active(ProcessingMode::Error));
    }

    #[test]
    fn test_trio_and_quick_schemes() {
        assert_eq!(ModeScheme::Trio.mode(5), Some(ProcessingMode::Error));
        assert_eq!(ModeScheme::Quick.mode(5), Some(ProcessingMode::Balance));
        assert_eq!(ModeScheme::Quick.mode(6), None);
        assert_eq!(ModeScheme::Trio.mode(11), Some(ProcessingMode::StoreCharge));
        assert!(!ModeScheme::Trio.is_active(ProcessingMode::Finished));
        assert!(ModeScheme::Quick.is_active(ProcessingMode::StoreDischarge));
    }

    #[test]
    fn test_sub_type_tables() {
        assert_eq!(CHARGE_TYPES[2], "Normal");
        assert_eq!(CHARGE_TYPES[5], "Link");
        assert_eq!(CHARGE_TYPES[9], "Link CV-CC");
        assert_eq!(ProcessingMode::Pause.sub_types(), None);
    }
}
