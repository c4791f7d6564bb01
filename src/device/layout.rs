//! Static frame layouts.
//!
//! Every supported charger sends one fixed-length status frame whose fields
//! sit at fixed character offsets. A [`ChannelLayout`] describes those
//! offsets per outlet so a single decoder can serve all variants.

use crate::constants::FIELD_LEN;
use crate::device::classifier::ModeScheme;

/// Temperature reading: 4-digit value, 2-digit sign (`00` means negative)
/// and an optional 2-digit unit (`00` Celsius, `01` Fahrenheit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureField {
    pub value: usize,
    pub sign: usize,
    pub unit: Option<usize>,
}

/// A run of consecutive 4-digit cell voltages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBlock {
    pub start: usize,
    pub count: usize,
}

impl CellBlock {
    /// Offset of cell `n` (0-based).
    pub fn offset(&self, n: usize) -> usize {
        self.start + n * FIELD_LEN
    }

    /// First offset past the block.
    pub fn end(&self) -> usize {
        self.offset(self.count)
    }
}

/// Field offsets of one outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutletLayout {
    pub supply: usize,
    pub mode: usize,
    pub sub_type: Option<usize>,
    pub cycle: Option<usize>,
    pub memory: Option<usize>,
    pub voltage: usize,
    pub current: usize,
    pub charge: usize,
    pub temperature: Option<TemperatureField>,
    pub cells: CellBlock,
}

impl OutletLayout {
    /// Copy of this layout with every offset moved by `delta`.
    pub const fn shifted(&self, delta: usize) -> OutletLayout {
        OutletLayout {
            supply: self.supply + delta,
            mode: self.mode + delta,
            sub_type: match self.sub_type {
                Some(o) => Some(o + delta),
                None => None,
            },
            cycle: match self.cycle {
                Some(o) => Some(o + delta),
                None => None,
            },
            memory: match self.memory {
                Some(o) => Some(o + delta),
                None => None,
            },
            voltage: self.voltage + delta,
            current: self.current + delta,
            charge: self.charge + delta,
            temperature: match self.temperature {
                Some(t) => Some(TemperatureField {
                    value: t.value + delta,
                    sign: t.sign + delta,
                    unit: match t.unit {
                        Some(o) => Some(o + delta),
                        None => None,
                    },
                }),
                None => None,
            },
            cells: CellBlock {
                start: self.cells.start + delta,
                count: self.cells.count,
            },
        }
    }
}

/// Product identification carried at the start of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductField {
    /// Offset of the 2-digit product code
    pub offset: usize,
    /// Code this variant reports
    pub code: u8,
    /// Offset of the 2-digit firmware revision
    pub firmware: Option<usize>,
}

/// Complete frame description of one charger variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    pub name: &'static str,
    pub frame_len: usize,
    pub scheme: ModeScheme,
    pub outlets: &'static [OutletLayout],
    /// Outlet numbers that can run as one linked process
    pub linked: Option<(usize, usize)>,
    pub product: Option<ProductField>,
}

impl ChannelLayout {
    /// Layout of outlet `number` (1-based).
    pub fn outlet(&self, number: usize) -> Option<&OutletLayout> {
        number.checked_sub(1).and_then(|i| self.outlets.get(i))
    }

    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    /// Outlet numbers in frame order.
    pub fn outlet_numbers(&self) -> impl Iterator<Item = usize> {
        1..=self.outlets.len()
    }

    /// Length of the measurement array of a single outlet.
    pub fn points_len(&self, number: usize) -> usize {
        self.outlet(number)
            .map(|o| crate::device::decoder::index::CELLS + o.cells.count)
            .unwrap_or(0)
    }

    /// Length of the measurement array of the linked process.
    pub fn linked_points_len(&self) -> usize {
        match self.linked {
            Some((a, b)) => {
                let cells = |n| self.outlet(n).map(|o: &OutletLayout| o.cells.count).unwrap_or(0);
                crate::device::decoder::linked_index::CELLS + cells(a) + cells(b)
            }
            None => 0,
        }
    }

    /// Largest offset any field of the layout reaches, checked against the
    /// frame length in tests.
    pub fn max_field_end(&self) -> usize {
        self.outlets
            .iter()
            .map(|o| {
                let mut end = o.cells.end().max(o.charge + FIELD_LEN).max(o.supply + FIELD_LEN);
                if let Some(t) = o.temperature {
                    end = end.max(t.value + FIELD_LEN).max(t.unit.unwrap_or(t.sign) + 2);
                }
                end
            })
            .max()
            .unwrap_or(0)
    }
}
