//! Synthetic status frames.
//!
//! [`FrameBuilder`] produces well-formed frames for any variant, which is
//! what the tests, benchmarks and fuzz targets feed into the decoder and the
//! gatherer in place of a real charger.

use crate::constants::{FIELD_LEN, FRAME_BEGIN, FRAME_END};
use crate::device::layout::{ChannelLayout, OutletLayout};
use crate::protocol::frame::encode_checksum;
use crate::util::hex::{ascii_hex_u16, ascii_hex_u8};

/// Builder for a status frame of one variant.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    layout: &'static ChannelLayout,
    data: Vec<u8>,
}

impl FrameBuilder {
    /// All fields zero, temperatures positive, product code set.
    pub fn new(layout: &'static ChannelLayout) -> Self {
        let mut builder = FrameBuilder {
            layout,
            data: vec![b'0'; layout.frame_len],
        };
        for outlet in layout.outlets {
            if let Some(t) = outlet.temperature {
                builder.put(t.sign, &ascii_hex_u8(1));
            }
        }
        if let Some(product) = layout.product {
            builder.put(product.offset, &ascii_hex_u8(product.code));
        }
        builder
    }

    fn put(&mut self, offset: usize, bytes: &[u8]) {
        if let Some(slot) = self.data.get_mut(offset..offset + bytes.len()) {
            slot.copy_from_slice(bytes);
        }
    }

    fn with_outlet(mut self, number: usize, f: impl FnOnce(&OutletLayout, &mut Self)) -> Self {
        if let Some(outlet) = self.layout.outlet(number) {
            f(outlet, &mut self);
        }
        self
    }

    pub fn mode(self, number: usize, code: u8) -> Self {
        self.with_outlet(number, |o, b| b.put(o.mode, &ascii_hex_u8(code)))
    }

    pub fn sub_type(self, number: usize, code: u8) -> Self {
        self.with_outlet(number, |o, b| {
            if let Some(offset) = o.sub_type {
                b.put(offset, &ascii_hex_u8(code));
            }
        })
    }

    pub fn cycle(self, number: usize, cycle: u8) -> Self {
        self.with_outlet(number, |o, b| {
            if let Some(offset) = o.cycle {
                b.put(offset, &ascii_hex_u8(cycle));
            }
        })
    }

    pub fn memory(self, number: usize, memory: u8) -> Self {
        self.with_outlet(number, |o, b| {
            if let Some(offset) = o.memory {
                b.put(offset, &ascii_hex_u8(memory));
            }
        })
    }

    pub fn voltage(self, number: usize, millivolts: u16) -> Self {
        self.with_outlet(number, |o, b| b.put(o.voltage, &ascii_hex_u16(millivolts)))
    }

    pub fn current(self, number: usize, milliamps: u16) -> Self {
        self.with_outlet(number, |o, b| b.put(o.current, &ascii_hex_u16(milliamps)))
    }

    pub fn charge(self, number: usize, milliamp_hours: u16) -> Self {
        self.with_outlet(number, |o, b| b.put(o.charge, &ascii_hex_u16(milliamp_hours)))
    }

    pub fn supply(self, number: usize, millivolts: u16) -> Self {
        self.with_outlet(number, |o, b| b.put(o.supply, &ascii_hex_u16(millivolts)))
    }

    /// Sets magnitude and sign of the temperature reading.
    pub fn temperature(self, number: usize, value: i32) -> Self {
        self.with_outlet(number, |o, b| {
            if let Some(t) = o.temperature {
                b.put(t.value, &ascii_hex_u16(value.unsigned_abs().min(u16::MAX as u32) as u16));
                b.put(t.sign, &ascii_hex_u8(u8::from(value >= 0)));
            }
        })
    }

    pub fn unit(self, number: usize, unit: u8) -> Self {
        self.with_outlet(number, |o, b| {
            if let Some(offset) = o.temperature.and_then(|t| t.unit) {
                b.put(offset, &ascii_hex_u8(unit));
            }
        })
    }

    /// Sets the leading cell voltages; extra values are ignored.
    pub fn cells(self, number: usize, millivolts: &[u16]) -> Self {
        self.with_outlet(number, |o, b| {
            for (n, mv) in millivolts.iter().take(o.cells.count).enumerate() {
                b.put(o.cells.offset(n), &ascii_hex_u16(*mv));
            }
        })
    }

    pub fn product_code(mut self, code: u8) -> Self {
        if let Some(product) = self.layout.product {
            self.put(product.offset, &ascii_hex_u8(code));
        }
        self
    }

    pub fn firmware(mut self, revision: u8) -> Self {
        if let Some(offset) = self.layout.product.and_then(|p| p.firmware) {
            self.put(offset, &ascii_hex_u8(revision));
        }
        self
    }

    /// Overwrites raw payload bytes, e.g. to inject malformed fields.
    pub fn raw(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.put(offset, bytes);
        self
    }

    /// Adds sentinels and checksum.
    pub fn build(mut self) -> Vec<u8> {
        let len = self.data.len();
        self.data[0] = FRAME_BEGIN;
        self.data[len - 1] = FRAME_END;
        let checksum = encode_checksum(&self.data[1..len - 1 - FIELD_LEN]);
        self.data[len - 1 - FIELD_LEN..len - 1].copy_from_slice(&checksum);
        self.data
    }
}
