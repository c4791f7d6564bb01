//! Tests for the table-driven measurement decoder across charger variants.

use proptest::prelude::*;
use ultramat_rs::device::decoder::{balance, index, linked_index};
use ultramat_rs::{decode, decode_linked, DeviceVariant, FrameBuilder, PointsKind};

#[test]
fn test_udp60_outlet_one() {
    let layout = DeviceVariant::UltraDuoPlus60.layout();
    let frame = FrameBuilder::new(layout)
        .mode(1, 1)
        .sub_type(1, 2)
        .raw(21, b"0BB8")
        .raw(25, b"03E8")
        .charge(1, 500)
        .temperature(1, 25)
        .supply(1, 12500)
        .cells(1, &[4100, 4180, 4120])
        .build();

    let points = decode(layout, 1, &frame);
    assert_eq!(points.kind, PointsKind::Single);
    assert_eq!(points.len(), 8 + 7);
    assert!(!points.degraded);
    assert_eq!(points.get(index::VOLTAGE), 3000);
    assert_eq!(points.get(index::CURRENT), 1000);
    assert_eq!(points.get(index::POWER), 3000);
    assert_eq!(points.get(index::CHARGE), 500);
    assert_eq!(points.get(index::ENERGY), 1500);
    assert_eq!(points.get(index::TEMPERATURE), 25);
    assert_eq!(points.get(index::SUPPLY_VOLTAGE), 12500);
    assert_eq!(points.get(index::BALANCE), 80);
    assert_eq!(points.cells(), &[4100, 4180, 4120, 0, 0, 0, 0]);
}

#[test]
fn test_outlet_two_reads_its_own_offsets() {
    let layout = DeviceVariant::UltraDuoPlus60.layout();
    let frame = FrameBuilder::new(layout)
        .voltage(1, 1111)
        .voltage(2, 2222)
        .current(2, 500)
        .build();

    let points = decode(layout, 2, &frame);
    assert_eq!(points.get(index::VOLTAGE), 2222);
    assert_eq!(points.get(index::POWER), 1111);
}

#[test]
fn test_negative_temperature() {
    let layout = DeviceVariant::Ultramat18.layout();
    let frame = FrameBuilder::new(layout).temperature(1, -12).build();
    assert_eq!(decode(layout, 1, &frame).get(index::TEMPERATURE), -12);
}

#[test]
fn test_bad_field_keeps_earlier_values() {
    let layout = DeviceVariant::UltraDuoPlus60.layout();
    let frame = FrameBuilder::new(layout)
        .voltage(1, 3000)
        .raw(25, b"03G8")
        .charge(1, 100)
        .cells(1, &[4000])
        .build();

    let points = decode(layout, 1, &frame);
    assert!(points.degraded);
    assert_eq!(points.get(index::VOLTAGE), 3000);
    assert_eq!(points.get(index::CURRENT), 0);
    assert_eq!(points.get(index::CHARGE), 0);
    assert_eq!(points.get(index::POWER), 0);
    assert_eq!(points.cells()[0], 0);
}

#[test]
fn test_unknown_outlet_is_degraded() {
    let layout = DeviceVariant::Ultramat16S.layout();
    let frame = FrameBuilder::new(layout).build();
    let points = decode(layout, 2, &frame);
    assert!(points.degraded);
    assert!(points.is_empty());
}

#[test]
fn test_trio_outlets() {
    let layout = DeviceVariant::UltraTrioPlus16S.layout();
    let frame = FrameBuilder::new(layout)
        .voltage(1, 29600)
        .cells(1, &[3700; 8])
        .voltage(3, 4200)
        .current(3, 2000)
        .build();

    let first = decode(layout, 1, &frame);
    assert_eq!(first.len(), 16);
    assert_eq!(first.get(index::VOLTAGE), 29600);
    assert_eq!(first.get(index::BALANCE), 0);

    let third = decode(layout, 3, &frame);
    assert_eq!(third.len(), 11);
    assert_eq!(third.get(index::POWER), 8400);
}

#[test]
fn test_linked_pair() {
    let layout = DeviceVariant::UltraDuoPlus80.layout();
    let frame = FrameBuilder::new(layout)
        .voltage(1, 8000)
        .current(1, 2000)
        .charge(1, 100)
        .voltage(2, 8200)
        .current(2, 2000)
        .charge(2, 50)
        .supply(1, 12001)
        .supply(2, 12000)
        .temperature(2, 30)
        .cells(1, &[4000, 4000])
        .cells(2, &[4100, 4100])
        .build();

    let points = decode_linked(layout, &frame);
    assert_eq!(points.kind, PointsKind::Linked);
    assert_eq!(points.len(), 19 + 14);
    assert_eq!(points.get(linked_index::VOLTAGE), 16200);
    assert_eq!(points.get(linked_index::CURRENT), 4000);
    assert_eq!(points.get(linked_index::CHARGE), 150);
    assert_eq!(points.get(linked_index::POWER_1), 16000);
    assert_eq!(points.get(linked_index::POWER_2), 16400);
    assert_eq!(points.get(linked_index::POWER), 32400);
    assert_eq!(points.get(linked_index::ENERGY), 800 + 410);
    assert_eq!(points.get(linked_index::TEMPERATURE_2), 30);
    assert_eq!(points.get(linked_index::SUPPLY_VOLTAGE), 12000);
    assert_eq!(points.get(linked_index::BALANCE), 100);
    assert_eq!(&points.cells()[..2], &[4000, 4000]);
    assert_eq!(&points.cells()[7..9], &[4100, 4100]);
}

#[test]
fn test_linked_on_single_outlet_device() {
    let layout = DeviceVariant::UltraQuick70.layout();
    let frame = FrameBuilder::new(layout).build();
    let points = decode_linked(layout, &frame);
    assert!(points.degraded);
    assert!(points.is_empty());
}

proptest! {
    #[test]
    fn prop_decode_is_idempotent(
        voltage in any::<u16>(),
        current in any::<u16>(),
        charge in any::<u16>(),
        cells in proptest::collection::vec(any::<u16>(), 0..7),
    ) {
        let layout = DeviceVariant::UltraDuoPlus60.layout();
        let frame = FrameBuilder::new(layout)
            .voltage(1, voltage)
            .current(1, current)
            .charge(1, charge)
            .cells(1, &cells)
            .build();
        let first = decode(layout, 1, &frame);
        prop_assert_eq!(&first, &decode(layout, 1, &frame));
        prop_assert_eq!(
            first.get(index::POWER),
            (voltage as f64 * current as f64 / 1000.0).round() as i32
        );
    }

    #[test]
    fn prop_balance_spans_positive_cells(cells in proptest::collection::vec(-5000i32..5000, 0..16)) {
        let positive: Vec<i32> = cells.iter().copied().filter(|v| *v > 0).collect();
        let expected = match (positive.iter().max(), positive.iter().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        };
        prop_assert_eq!(balance(&cells), expected);
    }
}
