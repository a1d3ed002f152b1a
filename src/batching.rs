//! Bin-packing of an order's units into delivery and pickup batches.
//!
//! Each batch must fit one trailer. Units are placed first-fit in descending
//! spot weight; wash stations go last so they can ride free next to toilets.

use std::cmp::Reverse;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{UnitCatalog, UnitCategory, UnitQuantities, UnitTypeId};
use crate::resources::{spots_for_counts, trailer_spots};

/// A trailer-sized share of an order's units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// 1-based position among the order's batches of the same kind.
    pub sequence: u32,
    pub total: u32,
    pub quantities: UnitQuantities,
}

/// A batch being filled.
#[derive(Debug, Default)]
struct OpenBatch {
    standard: u32,
    accessible: u32,
    wash: u32,
    quantities: UnitQuantities,
}

impl OpenBatch {
    fn spots_with(&self, category: UnitCategory) -> u32 {
        let (mut standard, mut accessible, mut wash) = (self.standard, self.accessible, self.wash);
        match category {
            UnitCategory::Standard => standard += 1,
            UnitCategory::Accessible => accessible += 1,
            UnitCategory::WashStation => wash += 1,
        }
        spots_for_counts(standard, accessible, wash)
    }

    fn fits(&self, category: UnitCategory, capacity: u32) -> bool {
        self.spots_with(category) <= capacity
    }

    fn add(&mut self, unit_type: UnitTypeId, category: UnitCategory) {
        match category {
            UnitCategory::Standard => self.standard += 1,
            UnitCategory::Accessible => self.accessible += 1,
            UnitCategory::WashStation => self.wash += 1,
        }
        *self.quantities.entry(unit_type).or_insert(0) += 1;
    }

    fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

fn spot_weight(category: UnitCategory) -> (u32, u8) {
    // Weight first, then toilets ahead of wash stations at equal weight.
    match category {
        UnitCategory::Accessible => (2, 0),
        UnitCategory::Standard => (1, 0),
        UnitCategory::WashStation => (1, 1),
    }
}

/// Unit types with their category, heaviest first.
fn placement_order(
    quantities: &UnitQuantities,
    catalog: &UnitCatalog,
) -> Result<Vec<(UnitTypeId, UnitCategory, u32)>> {
    let mut units = quantities
        .iter()
        .filter(|(_, quantity)| **quantity > 0)
        .map(|(unit_type, quantity)| {
            let category = catalog.get(*unit_type)?.category;
            Ok((*unit_type, category, *quantity))
        })
        .collect::<Result<Vec<_>>>()?;
    units.sort_by_key(|(unit_type, category, _)| {
        let (weight, tie) = spot_weight(*category);
        (Reverse(weight), tie, *unit_type)
    });
    Ok(units)
}

fn seal(batches: Vec<UnitQuantities>) -> Vec<Batch> {
    let total = batches.len() as u32;
    batches
        .into_iter()
        .enumerate()
        .map(|(index, quantities)| Batch {
            sequence: index as u32 + 1,
            total,
            quantities,
        })
        .collect()
}

fn non_empty(quantities: &UnitQuantities) -> UnitQuantities {
    quantities
        .iter()
        .filter(|(_, quantity)| **quantity > 0)
        .map(|(unit_type, quantity)| (*unit_type, *quantity))
        .collect()
}

/// Split an order's units into delivery batches.
///
/// `capacities` are the fleet's distinct trailer capacities, ascending. With
/// no trailer configured everything goes out as one batch.
pub fn delivery_batches(
    quantities: &UnitQuantities,
    catalog: &UnitCatalog,
    capacities: &[u32],
) -> Result<Vec<Batch>> {
    let units = non_empty(quantities);
    if units.is_empty() {
        return Ok(Vec::new());
    }

    let required = trailer_spots(&units, catalog)?;
    let Some(&largest) = capacities.last() else {
        warn!(
            "No trailer capacity configured; delivering {} spots in one batch",
            required
        );
        return Ok(seal(vec![units]));
    };
    if capacities.iter().any(|capacity| *capacity >= required) {
        return Ok(seal(vec![units]));
    }

    let mut batches: Vec<OpenBatch> = Vec::new();
    for (unit_type, category, quantity) in placement_order(&units, catalog)? {
        for _ in 0..quantity {
            match batches.iter_mut().find(|batch| batch.fits(category, largest)) {
                Some(batch) => batch.add(unit_type, category),
                None => {
                    let mut batch = OpenBatch::default();
                    batch.add(unit_type, category);
                    batches.push(batch);
                }
            }
        }
    }

    debug!(
        "Split {} delivery spots into {} batches of {}",
        required,
        batches.len(),
        largest
    );
    let batches = batches.into_iter().map(|batch| batch.quantities).collect();
    Ok(seal(batches))
}

/// Split an order's units into pickup batches.
///
/// Each round picks the smallest trailer that holds everything left (or the
/// largest one), fills one batch, and repeats with what remains.
pub fn pickup_batches(
    quantities: &UnitQuantities,
    catalog: &UnitCatalog,
    capacities: &[u32],
) -> Result<Vec<Batch>> {
    let mut remaining = non_empty(quantities);
    if remaining.is_empty() {
        return Ok(Vec::new());
    }
    let Some(&largest) = capacities.last() else {
        warn!("No trailer capacity configured; picking up in one batch");
        return Ok(seal(vec![remaining]));
    };

    let mut batches = Vec::new();
    while !remaining.is_empty() {
        let required = trailer_spots(&remaining, catalog)?;
        let capacity = capacities
            .iter()
            .copied()
            .find(|capacity| *capacity >= required)
            .unwrap_or(largest);

        let mut batch = OpenBatch::default();
        for (unit_type, category, quantity) in placement_order(&remaining, catalog)? {
            for _ in 0..quantity {
                if batch.fits(category, capacity) {
                    batch.add(unit_type, category);
                }
            }
        }
        if batch.is_empty() {
            // A single unit wider than every trailer still has to move.
            let (unit_type, category, _) = placement_order(&remaining, catalog)?[0];
            batch.add(unit_type, category);
        }

        for (unit_type, placed) in &batch.quantities {
            if let Some(left) = remaining.get_mut(unit_type) {
                *left -= placed;
                if *left == 0 {
                    remaining.remove(unit_type);
                }
            }
        }
        batches.push(batch.quantities);
    }

    debug!("Split pickup into {} batches", batches.len());
    Ok(seal(batches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UnitRates, UnitType};

    fn catalog() -> UnitCatalog {
        let unit = |id: u64, category: UnitCategory| UnitType {
            id: UnitTypeId(id),
            name: format!("unit {}", id),
            category,
            rates: UnitRates::default(),
        };
        UnitCatalog::new([
            unit(1, UnitCategory::Standard),
            unit(2, UnitCategory::Accessible),
            unit(3, UnitCategory::WashStation),
        ])
    }

    fn units(pairs: &[(u64, u32)]) -> UnitQuantities {
        pairs
            .iter()
            .map(|(id, qty)| (UnitTypeId(*id), *qty))
            .collect()
    }

    fn totals(batches: &[Batch]) -> UnitQuantities {
        let mut sum = UnitQuantities::new();
        for batch in batches {
            for (unit_type, quantity) in &batch.quantities {
                *sum.entry(*unit_type).or_insert(0) += quantity;
            }
        }
        sum
    }

    #[test]
    fn test_delivery_splits_five_into_two_two_one() {
        let batches = delivery_batches(&units(&[(1, 5)]), &catalog(), &[2]).unwrap();
        let sizes: Vec<u32> = batches
            .iter()
            .map(|b| b.quantities[&UnitTypeId(1)])
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(batches.iter().all(|b| b.total == 3));
        let sequences: Vec<u32> = batches.iter().map(|b| b.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn test_delivery_single_batch_when_a_trailer_fits() {
        let batches = delivery_batches(&units(&[(1, 5)]), &catalog(), &[2, 6]).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].total, 1);
    }

    #[test]
    fn test_delivery_places_wash_stations_with_toilets() {
        let batches = delivery_batches(&units(&[(1, 4), (3, 2)]), &catalog(), &[2]).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].quantities, units(&[(1, 2), (3, 2)]));
        assert_eq!(batches[1].quantities, units(&[(1, 2)]));
    }

    #[test]
    fn test_delivery_without_trailer_is_one_batch() {
        let batches = delivery_batches(&units(&[(1, 40), (2, 3)]), &catalog(), &[]).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantities, units(&[(1, 40), (2, 3)]));
    }

    #[test]
    fn test_pickup_prefers_smallest_sufficient_trailer() {
        let batches = pickup_batches(&units(&[(1, 3)]), &catalog(), &[4, 8]).unwrap();
        assert_eq!(batches.len(), 1);

        let batches = pickup_batches(&units(&[(1, 10)]), &catalog(), &[4, 8]).unwrap();
        let sizes: Vec<u32> = batches
            .iter()
            .map(|b| b.quantities[&UnitTypeId(1)])
            .collect();
        assert_eq!(sizes, vec![8, 2]);
    }

    #[test]
    fn test_pickup_oversized_unit_still_moves() {
        let batches = pickup_batches(&units(&[(2, 2)]), &catalog(), &[1]).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(totals(&batches), units(&[(2, 2)]));
    }

    #[test]
    fn test_mixed_units_are_conserved() {
        let order = units(&[(1, 7), (2, 3), (3, 4)]);
        let delivery = delivery_batches(&order, &catalog(), &[3, 5]).unwrap();
        let pickup = pickup_batches(&order, &catalog(), &[3, 5]).unwrap();
        assert_eq!(totals(&delivery), order);
        assert_eq!(totals(&pickup), order);
    }

    #[test]
    fn test_empty_order_has_no_batches() {
        let delivery = delivery_batches(&units(&[(1, 0)]), &catalog(), &[2]).unwrap();
        let pickup = pickup_batches(&UnitQuantities::new(), &catalog(), &[2]).unwrap();
        assert!(delivery.is_empty());
        assert!(pickup.is_empty());
    }
}
