use mfa_core::underwriting::financing::{
    size_loan, AmortizingPayment, FinancingTerms, LoanConstraint, PrincipalSolver,
};
use mfa_core::underwriting::rent::{aggregate_rent, RentMode, RentTable, RentTableEntry};
use mfa_core::underwriting::unit_mix::resolve_unit_mix;
use mfa_core::underwriting::{
    analyze, analyze_with_terms, underwrite, ListingInput, Overrides, UnderwritingInput,
    UnitMixEntry,
};
use mfa_core::UnderwritingError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn rent_table() -> RentTable {
    let mut table = RentTable::new();
    table.insert(
        "01852",
        RentTableEntry {
            rents: [("2".to_string(), dec!(1800))].into_iter().collect(),
            market_tier: "B".into(),
            county: "Middlesex".into(),
            town: "Lowell".into(),
        },
    );
    table.insert(
        "02130",
        RentTableEntry {
            rents: [
                ("0".to_string(), dec!(2500)),
                ("1".to_string(), dec!(2680)),
                ("2".to_string(), dec!(3190)),
                ("3".to_string(), dec!(3860)),
                ("4".to_string(), dec!(4250)),
            ]
            .into_iter()
            .collect(),
            market_tier: "A".into(),
            county: "Suffolk".into(),
            town: "Boston - Jamaica Plain".into(),
        },
    );
    table
}

/// Jamaica Plain triple-decker with an explicit mix
fn triple_decker() -> ListingInput {
    ListingInput {
        list_no: Some("73300003".into()),
        address: Some("12 Green St".into()),
        town: Some("Boston".into()),
        state: Some("MA".into()),
        zip: "02130".into(),
        list_price: dec!(1_650_000),
        units: 3,
        total_bedrooms: 9,
        unit_mix: vec![UnitMixEntry::new(3, 2), UnitMixEntry::new(2, 1)],
        taxes: dec!(14_500),
    }
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn test_scenario_unknown_zip() {
    let listing = ListingInput {
        zip: "10001".into(),
        list_price: dec!(500_000),
        units: 4,
        taxes: dec!(5_000),
        ..Default::default()
    };
    let r = analyze(&listing, &rent_table(), RentMode::Avg, None);

    assert_eq!(r.monthly_gross, Decimal::ZERO);
    assert_eq!(r.market_tier, "unknown");
    assert_eq!(r.county, "");
    assert_eq!(r.town, "");
    // water 1600 + elec 1200 + taxes 5000
    assert_eq!(r.opex_total, dec!(7800));
    assert_eq!(r.noi, -r.opex_total);
    assert!(r.cap_at_ask_pct.unwrap() < Decimal::ZERO);
    assert_eq!(r.loan, Decimal::ZERO);
    assert_eq!(r.annual_debt_service, Decimal::ZERO);
    assert_eq!(r.dscr, None);
}

#[test]
fn test_scenario_default_mix_avg_rent() {
    let listing = ListingInput {
        zip: "01852".into(),
        list_price: dec!(720_000),
        units: 4,
        total_bedrooms: 8,
        ..Default::default()
    };
    let r = analyze(&listing, &rent_table(), RentMode::Avg, None);
    assert_eq!(r.unit_mix, vec![UnitMixEntry::new(2, 4)]);
    assert_eq!(r.monthly_gross, dec!(7200));
    assert_eq!(r.annual_gross, dec!(86400));
}

#[test]
fn test_scenario_dscr_constrained_loan() {
    let terms = FinancingTerms::default();
    let sizing = size_loan(dec!(60_000), dec!(1_000_000), &terms);

    assert_eq!(sizing.loan_by_ltv, dec!(800_000));
    let payment = terms.payment();
    let ads_at_dscr_loan = payment.pmt(sizing.loan_by_dscr) * dec!(12);
    assert!(
        (ads_at_dscr_loan - dec!(50_000)).abs() < dec!(0.01),
        "debt service at DSCR loan = {ads_at_dscr_loan}"
    );
    assert_eq!(sizing.loan, sizing.loan_by_ltv.min(sizing.loan_by_dscr));
    assert_eq!(sizing.binding_constraint, LoanConstraint::Dscr);
    let dscr = sizing.dscr.unwrap();
    assert!(dscr >= dec!(1.1999), "dscr = {dscr}");
}

// ===========================================================================
// Properties
// ===========================================================================

#[test]
fn test_explicit_mix_passes_through() {
    let listing = triple_decker();
    assert_eq!(resolve_unit_mix(&listing, None), listing.unit_mix);
    let r = analyze(&listing, &rent_table(), RentMode::Avg, None);
    assert_eq!(r.unit_mix, listing.unit_mix);
    // 2 * 3860 + 3190
    assert_eq!(r.monthly_gross, dec!(10910));
}

#[test]
fn test_rent_mode_ratios() {
    let listing = triple_decker();
    let table = rent_table();
    let avg = aggregate_rent(&listing.unit_mix, &listing.zip, &table, RentMode::Avg);
    let below = aggregate_rent(&listing.unit_mix, &listing.zip, &table, RentMode::Below);
    let agg = aggregate_rent(&listing.unit_mix, &listing.zip, &table, RentMode::Agg);
    assert_eq!(below.monthly_gross, dec!(0.90) * avg.monthly_gross);
    assert_eq!(agg.monthly_gross, dec!(1.10) * avg.monthly_gross);
}

#[test]
fn test_loan_bounded_by_ltv_across_grid() {
    let terms = FinancingTerms::default();
    let prices = [dec!(0), dec!(75_000), dec!(640_000), dec!(2_250_000), dec!(48_000_000)];
    let nois = [dec!(0), dec!(4_000), dec!(52_500), dec!(180_000), dec!(3_900_000)];
    for price in prices {
        for noi in nois {
            let s = size_loan(noi, price, &terms);
            assert!(s.loan <= price * dec!(0.80), "price={price} noi={noi}");
            assert!(s.loan <= price, "price={price} noi={noi}");
        }
    }
}

#[test]
fn test_zero_rate_payment() {
    let payment = AmortizingPayment::new(Decimal::ZERO, 360);
    for p in [dec!(1), dec!(99_999.99), dec!(1_234_567)] {
        assert_eq!(payment.pmt(p), p / dec!(360));
    }

    let interest_free = FinancingTerms {
        annual_rate: Decimal::ZERO,
        ..Default::default()
    };
    let s = size_loan(dec!(120_000), dec!(10_000_000), &interest_free);
    // Limit 100,000 / 12 a month for 360 months
    assert!((s.loan_by_dscr - dec!(3_000_000)).abs() < dec!(0.01));
}

#[test]
fn test_dscr_is_rounded_noi_over_debt_service() {
    let listing = triple_decker();
    let table = rent_table();
    let r = analyze(&listing, &table, RentMode::Agg, None);

    let roll = aggregate_rent(&listing.unit_mix, &listing.zip, &table, RentMode::Agg);
    let opex = mfa_core::underwriting::compute_opex(
        roll.annual_gross,
        listing.units,
        listing.taxes,
        None,
    );
    let noi = roll.annual_gross - opex.total;
    let s = size_loan(noi, listing.list_price, &FinancingTerms::default());
    let expected = (noi / s.annual_debt_service * dec!(100) + dec!(0.5)).floor() / dec!(100);
    assert_eq!(r.dscr, Some(expected));
}

#[test]
fn test_analyze_is_idempotent() {
    let listing = triple_decker();
    let table = rent_table();
    let ov = Overrides {
        unit_mix: Some(vec![UnitMixEntry::new(4, 1), UnitMixEntry::new(1, 2)]),
        ..Default::default()
    };
    let a = serde_json::to_string(&analyze(&listing, &table, RentMode::Below, Some(&ov))).unwrap();
    let b = serde_json::to_string(&analyze(&listing, &table, RentMode::Below, Some(&ov))).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_closed_form_terms_match_bisection() {
    let listing = triple_decker();
    let table = rent_table();
    let closed = FinancingTerms {
        solver: PrincipalSolver::ClosedForm,
        ..Default::default()
    };
    let a = analyze_with_terms(&listing, &table, RentMode::Avg, None, &FinancingTerms::default());
    let b = analyze_with_terms(&listing, &table, RentMode::Avg, None, &closed);
    assert!((a.loan - b.loan).abs() <= Decimal::ONE);
    assert_eq!(a.noi, b.noi);
}

#[test]
fn test_override_mix_replaces_listing_mix() {
    let listing = triple_decker();
    let ov = Overrides {
        unit_mix: Some(vec![UnitMixEntry::new(0, 3)]),
        ..Default::default()
    };
    let r = analyze(&listing, &rent_table(), RentMode::Avg, Some(&ov));
    assert_eq!(r.unit_mix, vec![UnitMixEntry::new(0, 3)]);
    assert_eq!(r.monthly_gross, dec!(7500));
}

// ===========================================================================
// Request boundary
// ===========================================================================

#[test]
fn test_underwrite_from_json_request() {
    let request = serde_json::json!({
        "listing": {
            "listNo": "73300003",
            "zip": " 02130 ",
            "listPrice": 1650000,
            "units": 3,
            "unitMix": [{ "bedrooms": 3, "count": 2 }, { "bedrooms": 2, "count": 1 }],
            "taxes": 14500
        },
        "rentTable": {
            "02130": { "rents": { "2": 3190, "3": 3860 }, "marketTier": "A",
                       "county": "Suffolk", "town": "Boston - Jamaica Plain" }
        },
        "rentMode": "below",
        "overrides": { "opex": { "waterSewer": 0 } }
    });
    let input: UnderwritingInput = serde_json::from_value(request).unwrap();
    let out = underwrite(&input).unwrap();
    let r = &out.result;

    assert_eq!(r.rent_mode, RentMode::Below);
    // 10910 * 0.9
    assert_eq!(r.monthly_gross, dec!(9819));
    assert_eq!(r.opex.water_sewer, Decimal::ZERO);
    assert_eq!(r.market_tier, "A");
    assert_eq!(out.assumptions["financing"]["amortization_years"], 30);
}

#[test]
fn test_underwrite_rejects_negative_taxes() {
    let mut listing = triple_decker();
    listing.taxes = dec!(-1);
    let input = UnderwritingInput {
        listing,
        rent_table: rent_table(),
        rent_mode: RentMode::Avg,
        overrides: None,
    };
    match underwrite(&input).unwrap_err() {
        UnderwritingError::InvalidInput { field, .. } => assert_eq!(field, "taxes"),
        other => panic!("Expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn test_underwrite_warns_on_unpriced_bedrooms() {
    let mut listing = triple_decker();
    listing.unit_mix = vec![UnitMixEntry::new(6, 3)];
    let input = UnderwritingInput {
        listing,
        rent_table: rent_table(),
        rent_mode: RentMode::Avg,
        overrides: None,
    };
    let out = underwrite(&input).unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("6BR")));
}
