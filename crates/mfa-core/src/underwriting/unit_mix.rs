use super::{ListingInput, UnitMixEntry};

/// Bedrooms per unit assumed when a listing reports no bedroom total.
const DEFAULT_BEDROOMS_PER_UNIT: u32 = 2;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Determine the effective unit mix for a listing.
///
/// Precedence: a non-empty override mix, then a non-empty mix carried by the
/// listing, then a mix synthesized from the unit and bedroom totals. A listing
/// with zero units and no explicit mix resolves to an empty mix.
pub fn resolve_unit_mix(
    listing: &ListingInput,
    override_mix: Option<&[UnitMixEntry]>,
) -> Vec<UnitMixEntry> {
    if let Some(mix) = override_mix.filter(|m| !m.is_empty()) {
        return mix.to_vec();
    }

    if !listing.unit_mix.is_empty() {
        return listing.unit_mix.clone();
    }

    synthesize_default_mix(listing.units, listing.total_bedrooms)
}

/// Spread `total_bedrooms` across `units` as evenly as possible: every unit
/// gets `floor(avg)` bedrooms and `remainder` units get one more.
pub fn synthesize_default_mix(units: u32, total_bedrooms: u32) -> Vec<UnitMixEntry> {
    if units == 0 {
        return Vec::new();
    }

    let total_bedrooms = if total_bedrooms == 0 {
        DEFAULT_BEDROOMS_PER_UNIT * units
    } else {
        total_bedrooms
    };

    let floor_avg = total_bedrooms / units;
    let remainder = total_bedrooms - floor_avg * units;

    let mut mix = Vec::with_capacity(2);
    if units > remainder {
        mix.push(UnitMixEntry::new(floor_avg, units - remainder));
    }
    if remainder > 0 {
        mix.push(UnitMixEntry::new(floor_avg + 1, remainder));
    }

    if mix.is_empty() {
        mix.push(UnitMixEntry::new(DEFAULT_BEDROOMS_PER_UNIT, units));
    }

    mix
}

/// Total units represented by a mix.
pub fn mix_unit_count(mix: &[UnitMixEntry]) -> u32 {
    mix.iter().map(|e| e.count).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
