//! Derived-series backfill.
//!
//! Power and energy are stored alongside the raw readings. When a session is
//! complete both series are recomputed from the raw voltage, current and
//! charge columns, each on its own blocking task, over a snapshot taken under
//! the read lock. Appends racing the backfill only ever grow the tail past the
//! snapshot, which is left untouched.

use crate::device::decoder::{energy, index, linked_index, power, MeasurementPoints, PointsKind};
use crate::error::UltramatError;
use std::sync::{Arc, RwLock};

/// Record series shared between the gatherer's sink and its readers.
pub type SharedSeries = Arc<RwLock<Vec<MeasurementPoints>>>;

/// Recomputed total power and energy, one entry per snapshot record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedSeries {
    pub power: Vec<i32>,
    pub energy: Vec<i32>,
}

impl DerivedSeries {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

/// Clones the current records under the read lock.
pub fn snapshot(series: &SharedSeries) -> Vec<MeasurementPoints> {
    match series.read() {
        Ok(records) => records.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Per-branch and total power of one record.
fn record_power(points: &MeasurementPoints) -> (i32, i32, i32) {
    match points.kind {
        PointsKind::Single => {
            let p = power(points.get(index::VOLTAGE), points.get(index::CURRENT));
            (p, p, 0)
        }
        PointsKind::Linked => {
            use linked_index::*;
            let p1 = power(points.get(VOLTAGE_1), points.get(CURRENT_1));
            let p2 = power(points.get(VOLTAGE_2), points.get(CURRENT_2));
            (p1 + p2, p1, p2)
        }
    }
}

fn record_energy(points: &MeasurementPoints) -> (i32, i32, i32) {
    match points.kind {
        PointsKind::Single => {
            let e = energy(points.get(index::VOLTAGE), points.get(index::CHARGE));
            (e, e, 0)
        }
        PointsKind::Linked => {
            use linked_index::*;
            let e1 = energy(points.get(VOLTAGE_1), points.get(CHARGE_1));
            let e2 = energy(points.get(VOLTAGE_2), points.get(CHARGE_2));
            (e1 + e2, e1, e2)
        }
    }
}

/// Total power of every record.
pub fn power_series(records: &[MeasurementPoints]) -> Vec<i32> {
    records.iter().map(|p| record_power(p).0).collect()
}

/// Total energy of every record.
pub fn energy_series(records: &[MeasurementPoints]) -> Vec<i32> {
    records.iter().map(|p| record_energy(p).0).collect()
}

fn set(points: &mut MeasurementPoints, slot: usize, value: i32) {
    if let Some(v) = points.values.get_mut(slot) {
        *v = value;
    }
}

/// Writes derived values back into the records covered by the snapshot.
fn apply(series: &SharedSeries, records: &[MeasurementPoints], derived: &DerivedSeries) {
    let mut guard = match series.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    for ((target, source), (p, e)) in guard
        .iter_mut()
        .zip(records)
        .zip(derived.power.iter().zip(&derived.energy))
    {
        match target.kind {
            PointsKind::Single => {
                set(target, index::POWER, *p);
                set(target, index::ENERGY, *e);
            }
            PointsKind::Linked => {
                let (_, p1, p2) = record_power(source);
                let (_, e1, e2) = record_energy(source);
                set(target, linked_index::POWER, *p);
                set(target, linked_index::POWER_1, p1);
                set(target, linked_index::POWER_2, p2);
                set(target, linked_index::ENERGY, *e);
                set(target, linked_index::ENERGY_1, e1);
                set(target, linked_index::ENERGY_2, e2);
            }
        }
    }
}

/// Recomputes power and energy of `series` on two blocking tasks and writes
/// them back.
pub async fn backfill(series: &SharedSeries) -> Result<DerivedSeries, UltramatError> {
    let records = Arc::new(snapshot(series));

    let for_power = Arc::clone(&records);
    let power_task = tokio::task::spawn_blocking(move || power_series(&for_power));
    let for_energy = Arc::clone(&records);
    let energy_task = tokio::task::spawn_blocking(move || energy_series(&for_energy));

    let (power, energy) = tokio::try_join!(power_task, energy_task)
        .map_err(|e| UltramatError::Other(format!("backfill task failed: {e}")))?;
    let derived = DerivedSeries { power, energy };

    apply(series, &records, &derived);
    log::debug!("Backfilled {} records", derived.len());
    Ok(derived)
}

/// Same as [`backfill`] on the calling thread.
pub fn backfill_blocking(series: &SharedSeries) -> DerivedSeries {
    let records = snapshot(series);
    let derived = DerivedSeries {
        power: power_series(&records),
        energy: energy_series(&records),
    };
    apply(series, &records, &derived);
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(voltage: i32, current: i32, charge: i32) -> MeasurementPoints {
        let mut p = MeasurementPoints::zeroed(PointsKind::Single, 10);
        p.values[index::VOLTAGE] = voltage;
        p.values[index::CURRENT] = current;
        p.values[index::CHARGE] = charge;
        p
    }

    fn shared(records: Vec<MeasurementPoints>) -> SharedSeries {
        Arc::new(RwLock::new(records))
    }

    #[test]
    fn test_series_values() {
        let records = vec![single(3000, 1000, 0), single(3800, 1500, 2200)];
        assert_eq!(power_series(&records), vec![3000, 5700]);
        assert_eq!(energy_series(&records), vec![0, 8360]);
    }

    #[test]
    fn test_blocking_backfill_writes_back() {
        let series = shared(vec![single(4000, 500, 100)]);
        let derived = backfill_blocking(&series);
        assert_eq!(derived.power, vec![2000]);
        let records = series.read().unwrap();
        assert_eq!(records[0].get(index::POWER), 2000);
        assert_eq!(records[0].get(index::ENERGY), 400);
    }

    #[tokio::test]
    async fn test_backfill_linked_records() {
        let mut p = MeasurementPoints::zeroed(PointsKind::Linked, 19);
        p.values[linked_index::VOLTAGE_1] = 4000;
        p.values[linked_index::CURRENT_1] = 1000;
        p.values[linked_index::VOLTAGE_2] = 2000;
        p.values[linked_index::CURRENT_2] = 500;
        p.values[linked_index::CHARGE_2] = 1000;
        let series = shared(vec![p]);

        let derived = backfill(&series).await.unwrap();
        assert_eq!(derived.power, vec![5000]);
        assert_eq!(derived.energy, vec![2000]);

        let records = series.read().unwrap();
        assert_eq!(records[0].get(linked_index::POWER_1), 4000);
        assert_eq!(records[0].get(linked_index::POWER_2), 1000);
        assert_eq!(records[0].get(linked_index::ENERGY_2), 2000);
    }

    #[tokio::test]
    async fn test_backfill_empty_series() {
        let series = shared(Vec::new());
        let derived = backfill(&series).await.unwrap();
        assert!(derived.is_empty());
        assert!(series.read().unwrap().is_empty());
    }
}
