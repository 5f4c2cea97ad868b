use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use super::UnitMixEntry;
use crate::types::{Money, Rate};

/// Market tier reported when a ZIP code is missing from the rent table.
pub const UNKNOWN_MARKET_TIER: &str = "unknown";

// ---------------------------------------------------------------------------
// Rent mode
// ---------------------------------------------------------------------------

/// Where in the market a property's rents are assumed to land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RentMode {
    /// 90% of the benchmark rent
    Below,
    /// The benchmark rent itself
    #[default]
    Avg,
    /// 110% of the benchmark rent
    Agg,
}

impl RentMode {
    /// Decode a mode label. Unrecognised labels mean `Avg`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "below" => RentMode::Below,
            "agg" => RentMode::Agg,
            _ => RentMode::Avg,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RentMode::Below => "below",
            RentMode::Avg => "avg",
            RentMode::Agg => "agg",
        }
    }

    pub fn multiplier(&self) -> Rate {
        match self {
            RentMode::Below => dec!(0.90),
            RentMode::Avg => dec!(1.00),
            RentMode::Agg => dec!(1.10),
        }
    }
}

impl fmt::Display for RentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RentMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RentMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(RentMode::from_label).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Rent table
// ---------------------------------------------------------------------------

/// Benchmark rents and market metadata for one ZIP code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RentTableEntry {
    /// Monthly rent keyed by bedroom count ("0" = studio)
    #[serde(default)]
    pub rents: BTreeMap<String, Money>,
    #[serde(default, alias = "marketTier")]
    pub market_tier: String,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub town: String,
}

impl RentTableEntry {
    /// Monthly benchmark rent for a bedroom count, if the table has one.
    pub fn rent_for(&self, bedrooms: u32) -> Option<Money> {
        self.rents.get(&bedrooms.to_string()).copied()
    }
}

/// Read-only ZIP code → rent entry mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentTable(BTreeMap<String, RentTableEntry>);

impl RentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zip: impl Into<String>, entry: RentTableEntry) {
        self.0.insert(zip.into(), entry);
    }

    /// Look up a ZIP code, ignoring surrounding whitespace.
    pub fn lookup(&self, zip: &str) -> Option<&RentTableEntry> {
        self.0.get(zip.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, RentTableEntry)> for RentTable {
    fn from_iter<I: IntoIterator<Item = (String, RentTableEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Gross rent for a unit mix plus the market metadata it was priced against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentRoll {
    pub monthly_gross: Money,
    pub annual_gross: Money,
    pub market_tier: String,
    pub county: String,
    pub town: String,
    /// Whether the ZIP code was present in the rent table
    pub zip_found: bool,
    /// Bedroom counts in the mix that had no rent in the ZIP entry
    pub unpriced_bedrooms: Vec<u32>,
}

/// Price a unit mix against the rent table entry for `zip`.
///
/// Unknown ZIP codes and bedroom counts without a rent contribute zero.
pub fn aggregate_rent(
    unit_mix: &[UnitMixEntry],
    zip: &str,
    rent_table: &RentTable,
    mode: RentMode,
) -> RentRoll {
    let multiplier = mode.multiplier();
    let entry = rent_table.lookup(zip);

    let mut monthly_gross = Decimal::ZERO;
    let mut unpriced_bedrooms = Vec::new();

    for bucket in unit_mix {
        let rent = match entry.and_then(|e| e.rent_for(bucket.bedrooms)) {
            Some(r) => r,
            None => {
                if !unpriced_bedrooms.contains(&bucket.bedrooms) {
                    unpriced_bedrooms.push(bucket.bedrooms);
                }
                Decimal::ZERO
            }
        };
        monthly_gross += rent * multiplier * Decimal::from(bucket.count);
    }

    let (market_tier, county, town) = match entry {
        Some(e) => (e.market_tier.clone(), e.county.clone(), e.town.clone()),
        None => (UNKNOWN_MARKET_TIER.to_string(), String::new(), String::new()),
    };

    RentRoll {
        monthly_gross,
        annual_gross: monthly_gross * dec!(12),
        market_tier,
        county,
        town,
        zip_found: entry.is_some(),
        unpriced_bedrooms,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn allston_table() -> RentTable {
        let mut table = RentTable::new();
        table.insert(
            "02134",
            RentTableEntry {
                rents: [
                    ("0".to_string(), dec!(2426)),
                    ("1".to_string(), dec!(2607)),
                    ("2".to_string(), dec!(3100)),
                    ("3".to_string(), dec!(3749)),
                ]
                .into_iter()
                .collect(),
                market_tier: "A".into(),
                county: "Suffolk".into(),
                town: "Boston - Allston".into(),
            },
        );
        table
    }

    fn mix() -> Vec<UnitMixEntry> {
        vec![UnitMixEntry::new(1, 2), UnitMixEntry::new(3, 1)]
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(RentMode::from_label("below"), RentMode::Below);
        assert_eq!(RentMode::from_label(" AGG "), RentMode::Agg);
        assert_eq!(RentMode::from_label("avg"), RentMode::Avg);
        assert_eq!(RentMode::from_label("aggressive"), RentMode::Avg);
        assert_eq!(RentMode::from_label(""), RentMode::Avg);
    }

    #[test]
    fn test_mode_decodes_leniently() {
        let m: RentMode = serde_json::from_str("\"mystery\"").unwrap();
        assert_eq!(m, RentMode::Avg);
        let m: RentMode = serde_json::from_str("null").unwrap();
        assert_eq!(m, RentMode::Avg);
        assert_eq!(serde_json::to_string(&RentMode::Below).unwrap(), "\"below\"");
    }

    #[test]
    fn test_aggregate_avg() {
        let roll = aggregate_rent(&mix(), "02134", &allston_table(), RentMode::Avg);
        // 2 * 2607 + 3749 = 8963
        assert_eq!(roll.monthly_gross, dec!(8963));
        assert_eq!(roll.annual_gross, dec!(107556));
        assert_eq!(roll.market_tier, "A");
        assert_eq!(roll.county, "Suffolk");
        assert!(roll.zip_found);
        assert!(roll.unpriced_bedrooms.is_empty());
    }

    #[test]
    fn test_mode_ratios_are_exact() {
        let table = allston_table();
        let avg = aggregate_rent(&mix(), "02134", &table, RentMode::Avg);
        let below = aggregate_rent(&mix(), "02134", &table, RentMode::Below);
        let agg = aggregate_rent(&mix(), "02134", &table, RentMode::Agg);
        assert_eq!(below.monthly_gross, avg.monthly_gross * dec!(0.90));
        assert_eq!(agg.monthly_gross, avg.monthly_gross * dec!(1.10));
    }

    #[test]
    fn test_zip_is_trimmed() {
        let roll = aggregate_rent(&mix(), "  02134 ", &allston_table(), RentMode::Avg);
        assert!(roll.zip_found);
        assert_eq!(roll.monthly_gross, dec!(8963));
    }

    #[test]
    fn test_unknown_zip_is_zero_rent() {
        let roll = aggregate_rent(&mix(), "99999", &allston_table(), RentMode::Agg);
        assert_eq!(roll.monthly_gross, Decimal::ZERO);
        assert_eq!(roll.market_tier, UNKNOWN_MARKET_TIER);
        assert_eq!(roll.county, "");
        assert_eq!(roll.town, "");
        assert!(!roll.zip_found);
    }

    #[test]
    fn test_missing_bedroom_key_contributes_zero() {
        let mix = vec![UnitMixEntry::new(2, 1), UnitMixEntry::new(5, 2)];
        let roll = aggregate_rent(&mix, "02134", &allston_table(), RentMode::Avg);
        assert_eq!(roll.monthly_gross, dec!(3100));
        assert_eq!(roll.unpriced_bedrooms, vec![5]);
    }

    #[test]
    fn test_rent_table_deserializes_from_zip_map() {
        let table: RentTable = serde_json::from_value(serde_json::json!({
            "02351": {
                "rents": { "0": 1450, "1": 1520, "2": 1980 },
                "marketTier": "C",
                "county": "Plymouth",
                "town": "Abington"
            }
        }))
        .unwrap();
        let entry = table.lookup("02351").unwrap();
        assert_eq!(entry.rent_for(2), Some(dec!(1980)));
        assert_eq!(entry.market_tier, "C");
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
        assert!(RentTable::new().is_empty());
    }
}
