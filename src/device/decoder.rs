//! # Channel Decoder
//!
//! Turns the ASCII-hex fields of one outlet (or of a linked outlet pair) into
//! a flat array of integer measurement points. The decoder is driven entirely
//! by the variant's [`ChannelLayout`]; there is no per-model code.
//!
//! Malformed fields do not fail the frame. Decoding stops at the first bad
//! field, everything read up to that point is kept, and the result is marked
//! as degraded.

use crate::constants::{CODE_LEN, FIELD_LEN};
use crate::device::layout::{ChannelLayout, OutletLayout, TemperatureField};
use crate::error::DecodeError;
use crate::protocol::frame::hex_field;
use serde::{Deserialize, Serialize};

/// Point indexes of a single outlet.
pub mod index {
    pub const VOLTAGE: usize = 0;
    pub const CURRENT: usize = 1;
    pub const CHARGE: usize = 2;
    pub const POWER: usize = 3;
    pub const ENERGY: usize = 4;
    pub const TEMPERATURE: usize = 5;
    pub const SUPPLY_VOLTAGE: usize = 6;
    pub const BALANCE: usize = 7;
    pub const CELLS: usize = 8;
}

/// Point indexes of a linked outlet pair.
pub mod linked_index {
    pub const VOLTAGE: usize = 0;
    pub const VOLTAGE_1: usize = 1;
    pub const VOLTAGE_2: usize = 2;
    pub const CURRENT: usize = 3;
    pub const CURRENT_1: usize = 4;
    pub const CURRENT_2: usize = 5;
    pub const CHARGE: usize = 6;
    pub const CHARGE_1: usize = 7;
    pub const CHARGE_2: usize = 8;
    pub const POWER: usize = 9;
    pub const POWER_1: usize = 10;
    pub const POWER_2: usize = 11;
    pub const ENERGY: usize = 12;
    pub const ENERGY_1: usize = 13;
    pub const ENERGY_2: usize = 14;
    pub const TEMPERATURE_1: usize = 15;
    pub const TEMPERATURE_2: usize = 16;
    pub const SUPPLY_VOLTAGE: usize = 17;
    pub const BALANCE: usize = 18;
    pub const CELLS: usize = 19;
}

/// Ordering of a measurement array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointsKind {
    Single,
    Linked,
}

/// Decoded values of one frame, in the order given by [`index`] or
/// [`linked_index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementPoints {
    pub kind: PointsKind,
    pub values: Vec<i32>,
    /// Set when a field could not be decoded
    pub degraded: bool,
}

impl MeasurementPoints {
    pub fn zeroed(kind: PointsKind, len: usize) -> Self {
        MeasurementPoints {
            kind,
            values: vec![0; len],
            degraded: false,
        }
    }

    pub fn get(&self, index: usize) -> i32 {
        self.values.get(index).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell voltages.
    pub fn cells(&self) -> &[i32] {
        let start = match self.kind {
            PointsKind::Single => index::CELLS,
            PointsKind::Linked => linked_index::CELLS,
        };
        self.values.get(start..).unwrap_or(&[])
    }
}

/// `round(V * I / 1000)`, voltage in mV and current in mA.
pub fn power(voltage: i32, current: i32) -> i32 {
    (voltage as f64 * current as f64 / 1000.0).round() as i32
}

/// `round(V * C / 1000)`, voltage in mV and charge in mAh.
pub fn energy(voltage: i32, charge: i32) -> i32 {
    (voltage as f64 * charge as f64 / 1000.0).round() as i32
}

/// Spread between the highest and lowest positive cell voltage.
pub fn balance(cells: &[i32]) -> i32 {
    let positive = cells.iter().copied().filter(|&v| v > 0);
    match (positive.clone().max(), positive.min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    }
}

/// Sequential field reader that stops at the first malformed field.
struct Fields<'a> {
    frame: &'a [u8],
    fault: Option<DecodeError>,
}

impl<'a> Fields<'a> {
    fn new(frame: &'a [u8]) -> Self {
        Fields { frame, fault: None }
    }

    fn read(&mut self, offset: usize, len: usize) -> Option<u16> {
        if self.fault.is_some() {
            return None;
        }
        match hex_field(self.frame, offset, len) {
            Ok(value) => Some(value),
            Err(err) => {
                self.fault = Some(err);
                None
            }
        }
    }

    fn word(&mut self, offset: usize) -> Option<i32> {
        self.read(offset, FIELD_LEN).map(i32::from)
    }

    fn temperature(&mut self, field: Option<TemperatureField>) -> Option<i32> {
        let field = field?;
        let value = self.word(field.value)?;
        let sign = self.read(field.sign, CODE_LEN)?;
        Some(if sign == 0 { -value } else { value })
    }

    fn cells(&mut self, outlet: &OutletLayout) -> Vec<i32> {
        (0..outlet.cells.count)
            .map_while(|n| self.word(outlet.cells.offset(n)))
            .collect()
    }

    fn finish(self, points: &mut MeasurementPoints) {
        if let Some(fault) = self.fault {
            log::debug!("Partial decode: {fault}");
            points.degraded = true;
        }
    }
}

/// Raw readings of one outlet.
struct Branch {
    voltage: Option<i32>,
    current: Option<i32>,
    charge: Option<i32>,
    temperature: Option<i32>,
    supply: Option<i32>,
}

impl Branch {
    fn read(fields: &mut Fields<'_>, outlet: &OutletLayout) -> Branch {
        Branch {
            voltage: fields.word(outlet.voltage),
            current: fields.word(outlet.current),
            charge: fields.word(outlet.charge),
            temperature: fields.temperature(outlet.temperature),
            supply: fields.word(outlet.supply),
        }
    }

    fn power(&self) -> Option<i32> {
        Some(power(self.voltage?, self.current?))
    }

    fn energy(&self) -> Option<i32> {
        Some(energy(self.voltage?, self.charge?))
    }
}

/// Decodes outlet `number` (1-based) of `frame`.
///
/// An unknown outlet number yields an empty, degraded result.
pub fn decode(layout: &ChannelLayout, number: usize, frame: &[u8]) -> MeasurementPoints {
    let Some(outlet) = layout.outlet(number) else {
        let mut points = MeasurementPoints::zeroed(PointsKind::Single, 0);
        points.degraded = true;
        return points;
    };

    let mut points = MeasurementPoints::zeroed(PointsKind::Single, layout.points_len(number));
    let mut fields = Fields::new(frame);
    let branch = Branch::read(&mut fields, outlet);
    let cells = fields.cells(outlet);

    let values = &mut points.values;
    values[index::VOLTAGE] = branch.voltage.unwrap_or(0);
    values[index::CURRENT] = branch.current.unwrap_or(0);
    values[index::CHARGE] = branch.charge.unwrap_or(0);
    values[index::POWER] = branch.power().unwrap_or(0);
    values[index::ENERGY] = branch.energy().unwrap_or(0);
    values[index::TEMPERATURE] = branch.temperature.unwrap_or(0);
    values[index::SUPPLY_VOLTAGE] = branch.supply.unwrap_or(0);
    values[index::BALANCE] = balance(&cells);
    for (slot, cell) in values[index::CELLS..].iter_mut().zip(&cells) {
        *slot = *cell;
    }

    fields.finish(&mut points);
    points
}

/// Decodes the linked outlet pair of `frame` as one process.
///
/// Totals are the sums of both branches, the supply voltage is their
/// average and the balance spans the cells of both branches. Layouts without
/// a linked pair yield an empty, degraded result.
pub fn decode_linked(layout: &ChannelLayout, frame: &[u8]) -> MeasurementPoints {
    let outlets = layout
        .linked
        .and_then(|(a, b)| Some((layout.outlet(a)?, layout.outlet(b)?)));
    let Some((first, second)) = outlets else {
        let mut points = MeasurementPoints::zeroed(PointsKind::Linked, 0);
        points.degraded = true;
        return points;
    };

    let mut points = MeasurementPoints::zeroed(PointsKind::Linked, layout.linked_points_len());
    let mut fields = Fields::new(frame);
    let one = Branch::read(&mut fields, first);
    let two = Branch::read(&mut fields, second);
    let cells_one = fields.cells(first);
    let cells_two = fields.cells(second);

    let sum = |a: Option<i32>, b: Option<i32>| Some(a? + b?);
    let (p1, p2) = (one.power(), two.power());
    let (e1, e2) = (one.energy(), two.energy());

    use linked_index::*;
    let values = &mut points.values;
    values[VOLTAGE] = sum(one.voltage, two.voltage).unwrap_or(0);
    values[VOLTAGE_1] = one.voltage.unwrap_or(0);
    values[VOLTAGE_2] = two.voltage.unwrap_or(0);
    values[CURRENT] = sum(one.current, two.current).unwrap_or(0);
    values[CURRENT_1] = one.current.unwrap_or(0);
    values[CURRENT_2] = two.current.unwrap_or(0);
    values[CHARGE] = sum(one.charge, two.charge).unwrap_or(0);
    values[CHARGE_1] = one.charge.unwrap_or(0);
    values[CHARGE_2] = two.charge.unwrap_or(0);
    values[POWER] = sum(p1, p2).unwrap_or(0);
    values[POWER_1] = p1.unwrap_or(0);
    values[POWER_2] = p2.unwrap_or(0);
    values[ENERGY] = sum(e1, e2).unwrap_or(0);
    values[ENERGY_1] = e1.unwrap_or(0);
    values[ENERGY_2] = e2.unwrap_or(0);
    values[TEMPERATURE_1] = one.temperature.unwrap_or(0);
    values[TEMPERATURE_2] = two.temperature.unwrap_or(0);
    values[SUPPLY_VOLTAGE] = sum(one.supply, two.supply).map(|s| s / 2).unwrap_or(0);

    let all_cells: Vec<i32> = cells_one.iter().chain(&cells_two).copied().collect();
    values[BALANCE] = balance(&all_cells);
    let second_start = CELLS + first.cells.count;
    for (slot, cell) in values[CELLS..].iter_mut().zip(&cells_one) {
        *slot = *cell;
    }
    for (slot, cell) in values[second_start..].iter_mut().zip(&cells_two) {
        *slot = *cell;
    }

    fields.finish(&mut points);
    points
}
