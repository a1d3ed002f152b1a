//! Resource draw of a single service event.

use crate::error::Result;
use crate::model::{ServiceEvent, UnitCatalog, UnitCategory, UnitQuantities};

/// Trailer spots and gallons consumed by one event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    pub trailer_spots: u32,
    pub clean_water_gallons: f64,
    pub waste_gallons: f64,
}

/// Spot weight of a mix of units.
///
/// Standard units take one spot, accessible units two. Wash stations ride
/// free up to the number of toilet-class units, then take a spot each.
pub fn trailer_spots(quantities: &UnitQuantities, catalog: &UnitCatalog) -> Result<u32> {
    let mut standard = 0u32;
    let mut accessible = 0u32;
    let mut wash = 0u32;
    for (unit_type, quantity) in quantities {
        match catalog.get(*unit_type)?.category {
            UnitCategory::Standard => standard += quantity,
            UnitCategory::Accessible => accessible += quantity,
            UnitCategory::WashStation => wash += quantity,
        }
    }
    Ok(spots_for_counts(standard, accessible, wash))
}

pub(crate) fn spots_for_counts(standard: u32, accessible: u32, wash: u32) -> u32 {
    standard + 2 * accessible + wash.saturating_sub(standard + accessible)
}

/// Compute what `event` draws from the truck and trailer.
pub fn resource_usage(event: &ServiceEvent, catalog: &UnitCatalog) -> Result<ResourceUsage> {
    let Some(operation) = event.event_type.operation() else {
        return Ok(ResourceUsage::default());
    };

    let mut usage = ResourceUsage::default();
    for (unit_type, quantity) in &event.quantities {
        let draw = catalog.get(*unit_type)?.rates.for_operation(operation);
        usage.clean_water_gallons += draw.clean_gallons * f64::from(*quantity);
        usage.waste_gallons += draw.waste_gallons * f64::from(*quantity);
    }

    if event.event_type.moves_units() {
        usage.trailer_spots = trailer_spots(&event.quantities, catalog)?;
    }
    if let Some(recorded) = event.recorded_waste_gallons {
        usage.waste_gallons = recorded;
    }

    Ok(usage)
}
