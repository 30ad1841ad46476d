use super::types::{AgeGroup, DeductionSummary, Deductions, Investments, Regime, TaxInput, TaxResult};

const SECTION_80C_CAP: f64 = 150_000.0;
const NPS_ADDITIONAL_CAP: f64 = 50_000.0;
const NEW_REGIME_STANDARD_DEDUCTION: f64 = 50_000.0;
const CESS_RATE: f64 = 0.04;

const OLD_REGIME_REBATE_LIMIT: f64 = 500_000.0;
const OLD_REGIME_REBATE: f64 = 12_500.0;
const NEW_REGIME_REBATE_LIMIT: f64 = 700_000.0;
const NEW_REGIME_REBATE: f64 = 25_000.0;

/// Computes the tax liability for one filer.
///
/// Pure: the result depends only on `input`. No numeric input is rejected;
/// with zero income the effective rate is NaN.
pub fn compute(input: &TaxInput) -> TaxResult {
    let summary = aggregate_deductions(&input.deductions, &input.investments);

    let (taxable_income, tax) = match input.regime {
        Regime::Old => {
            let taxable = input.income - input.hra_exempt - summary.total_with_nps;
            (taxable, old_regime_tax(taxable, input.age_group))
        }
        Regime::New => {
            let taxable = input.income - input.hra_exempt - NEW_REGIME_STANDARD_DEDUCTION;
            (taxable, new_regime_tax(taxable))
        }
    };

    let cess = tax * CESS_RATE;
    let total_tax = tax + cess;

    TaxResult {
        income: input.income,
        taxable_income,
        tax,
        cess,
        total_tax,
        effective_tax_rate: (total_tax / input.income) * 100.0,
        regime: input.regime,
        deductions: summary.total_with_nps,
    }
}

/// Folds deduction claims and investments into the old-regime totals.
pub fn aggregate_deductions(deductions: &Deductions, investments: &Investments) -> DeductionSummary {
    let amount = |v: Option<f64>| v.unwrap_or(0.0);

    let section80c_bucket = (amount(deductions.section80c)
        + amount(investments.ppf)
        + amount(investments.elss)
        + amount(investments.fd)
        + amount(investments.home_loan))
    .min(SECTION_80C_CAP);

    let total_deductions = section80c_bucket
        + amount(deductions.section80d)
        + amount(deductions.section80e)
        + amount(deductions.section80g)
        + amount(deductions.other_deductions);

    let nps_additional = amount(investments.nps).min(NPS_ADDITIONAL_CAP);

    DeductionSummary {
        section80c_bucket,
        total_deductions,
        nps_additional,
        total_with_nps: total_deductions + nps_additional,
    }
}

pub fn old_regime_tax(income: f64, age_group: AgeGroup) -> f64 {
    let exemption_limit = age_group.exemption_limit();
    if income <= exemption_limit {
        return 0.0;
    }

    let adjusted = income - exemption_limit;
    let tax = old_regime_slab_tax(adjusted);
    if adjusted <= OLD_REGIME_REBATE_LIMIT {
        (tax - OLD_REGIME_REBATE).max(0.0)
    } else {
        tax
    }
}

pub fn new_regime_tax(income: f64) -> f64 {
    let tax = new_regime_slab_tax(income);
    if income <= NEW_REGIME_REBATE_LIMIT {
        (tax - NEW_REGIME_REBATE).max(0.0)
    } else {
        tax
    }
}

/// Slab tax on income above the age-based exemption.
fn old_regime_slab_tax(adjusted: f64) -> f64 {
    if adjusted <= 250_000.0 {
        0.0
    } else if adjusted <= 500_000.0 {
        (adjusted - 250_000.0) * 0.05
    } else if adjusted <= 1_000_000.0 {
        12_500.0 + (adjusted - 500_000.0) * 0.20
    } else {
        112_500.0 + (adjusted - 1_000_000.0) * 0.30
    }
}

fn new_regime_slab_tax(income: f64) -> f64 {
    if income <= 300_000.0 {
        0.0
    } else if income <= 600_000.0 {
        (income - 300_000.0) * 0.05
    } else if income <= 900_000.0 {
        15_000.0 + (income - 600_000.0) * 0.10
    } else if income <= 1_200_000.0 {
        45_000.0 + (income - 900_000.0) * 0.15
    } else if income <= 1_500_000.0 {
        90_000.0 + (income - 1_200_000.0) * 0.20
    } else {
        150_000.0 + (income - 1_500_000.0) * 0.30
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn old_input(age_group: AgeGroup, income: f64) -> TaxInput {
        TaxInput {
            age_group,
            ..TaxInput::new(Regime::Old, income)
        }
    }

    #[test]
    fn new_regime_slab_breakpoints() {
        for (income, expected) in [
            (300_000.0, 0.0),
            (600_000.0, 15_000.0),
            (900_000.0, 45_000.0),
            (1_200_000.0, 90_000.0),
            (1_500_000.0, 150_000.0),
        ] {
            assert_approx(new_regime_slab_tax(income), expected);
        }
    }

    #[test]
    fn new_regime_breakpoints_above_rebate_limit_are_unchanged() {
        assert_approx(new_regime_tax(900_000.0), 45_000.0);
        assert_approx(new_regime_tax(1_200_000.0), 90_000.0);
        assert_approx(new_regime_tax(1_500_000.0), 150_000.0);
        assert_approx(new_regime_tax(2_000_000.0), 300_000.0);
    }

    #[test]
    fn new_regime_rebate_boundary_is_inclusive() {
        assert_approx(new_regime_slab_tax(700_000.0), 25_000.0);
        assert_approx(new_regime_tax(700_000.0), 0.0);
        assert_approx(new_regime_tax(600_000.0), 0.0);

        let just_above = new_regime_tax(700_001.0);
        assert!((just_above - 25_000.1).abs() < 1e-6, "got {just_above}");
    }

    #[test]
    fn new_regime_negative_income_is_untaxed() {
        assert_eq!(new_regime_tax(-50_000.0), 0.0);
        assert_eq!(new_regime_tax(f64::MIN), 0.0);
    }

    #[test]
    fn old_regime_exemption_limits_by_age() {
        assert_eq!(old_regime_tax(250_000.0, AgeGroup::Below60), 0.0);
        assert_eq!(old_regime_tax(300_000.0, AgeGroup::From60To80), 0.0);
        assert_eq!(old_regime_tax(500_000.0, AgeGroup::Above80), 0.0);
    }

    #[test]
    fn old_regime_negative_income_is_untaxed_for_every_age_group() {
        for age_group in [AgeGroup::Below60, AgeGroup::From60To80, AgeGroup::Above80] {
            assert_eq!(old_regime_tax(-1.0, age_group), 0.0);
            assert_eq!(old_regime_tax(-1_000_000.0, age_group), 0.0);
        }
    }

    #[test]
    fn old_regime_rebate_boundary_on_adjusted_income() {
        // adjusted = 500_000: slab tax 12_500 is fully rebated
        assert_approx(old_regime_tax(750_000.0, AgeGroup::Below60), 0.0);
        // adjusted = 500_001: no rebate
        assert_approx(old_regime_tax(750_001.0, AgeGroup::Below60), 12_500.2);
    }

    #[test]
    fn old_regime_taxable_income_of_500k_is_fully_rebated() {
        let mut input = old_input(AgeGroup::Below60, 650_000.0);
        input.deductions.section80c = Some(150_000.0);
        let result = compute(&input);
        assert_approx(result.taxable_income, 500_000.0);
        assert_eq!(result.tax, 0.0);

        input.income = 650_001.0;
        let result = compute(&input);
        assert_approx(result.taxable_income, 500_001.0);
        assert_eq!(result.tax, 0.0);
    }

    #[test]
    fn old_regime_slab_breakpoints_are_inclusive() {
        for (adjusted, expected) in [
            (250_000.0, 0.0),
            (250_001.0, 0.05),
            (500_000.0, 12_500.0),
            (500_001.0, 12_500.2),
            (1_000_000.0, 112_500.0),
            (1_000_001.0, 112_500.3),
        ] {
            assert_approx(old_regime_slab_tax(adjusted), expected);
        }
    }

    #[test]
    fn old_regime_top_slab_boundary_per_age_group() {
        // adjusted = 1_000_000 sits in the 20% slab, one more rupee enters 30%
        for age_group in [AgeGroup::Below60, AgeGroup::From60To80, AgeGroup::Above80] {
            let at_boundary = 1_000_000.0 + age_group.exemption_limit();
            assert_approx(old_regime_tax(at_boundary, age_group), 112_500.0);
            assert_approx(old_regime_tax(at_boundary + 1.0, age_group), 112_500.3);
        }
        assert_approx(old_regime_tax(1_250_000.0, AgeGroup::Below60), 112_500.0);
    }

    #[test]
    fn old_regime_top_slab() {
        // adjusted = 1_200_000
        assert_approx(
            old_regime_tax(1_450_000.0, AgeGroup::Below60),
            112_500.0 + 200_000.0 * 0.30,
        );
        // senior exemption shifts the slabs
        assert_approx(
            old_regime_tax(1_100_000.0, AgeGroup::From60To80),
            12_500.0 + 300_000.0 * 0.20,
        );
    }

    #[test]
    fn section_80c_pool_is_capped() {
        let deductions = Deductions {
            section80c: Some(100_000.0),
            ..Deductions::default()
        };
        let investments = Investments {
            ppf: Some(100_000.0),
            ..Investments::default()
        };
        let summary = aggregate_deductions(&deductions, &investments);
        assert_approx(summary.section80c_bucket, 150_000.0);
        assert_approx(summary.total_deductions, 150_000.0);
        assert_approx(summary.total_with_nps, 150_000.0);
    }

    #[test]
    fn section_80c_pool_includes_all_eligible_investments() {
        let investments = Investments {
            ppf: Some(10_000.0),
            elss: Some(20_000.0),
            fd: Some(30_000.0),
            home_loan: Some(40_000.0),
            nps: Some(0.0),
        };
        let summary = aggregate_deductions(&Deductions::default(), &investments);
        assert_approx(summary.section80c_bucket, 100_000.0);
    }

    #[test]
    fn nps_bucket_is_independent_of_80c_cap() {
        let deductions = Deductions {
            section80c: Some(200_000.0),
            ..Deductions::default()
        };
        let investments = Investments {
            nps: Some(60_000.0),
            ..Investments::default()
        };
        let summary = aggregate_deductions(&deductions, &investments);
        assert_approx(summary.nps_additional, 50_000.0);
        assert_approx(summary.total_with_nps, 200_000.0);

        let empty = aggregate_deductions(&Deductions::default(), &investments);
        assert_approx(empty.total_with_nps, 50_000.0);
    }

    #[test]
    fn other_deductions_are_uncapped() {
        let deductions = Deductions {
            section80c: Some(10_000.0),
            section80d: Some(25_000.0),
            section80e: Some(400_000.0),
            section80g: Some(5_000.0),
            other_deductions: Some(1_000.0),
        };
        let summary = aggregate_deductions(&deductions, &Investments::default());
        assert_approx(summary.total_deductions, 441_000.0);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let summary = aggregate_deductions(&Deductions::default(), &Investments::default());
        assert_eq!(summary.section80c_bucket, 0.0);
        assert_eq!(summary.total_with_nps, 0.0);
    }

    #[test]
    fn new_regime_end_to_end() {
        let result = compute(&TaxInput::new(Regime::New, 1_000_000.0));
        assert_approx(result.income, 1_000_000.0);
        assert_approx(result.taxable_income, 950_000.0);
        assert_approx(result.tax, 52_500.0);
        assert_approx(result.cess, 2_100.0);
        assert_approx(result.total_tax, 54_600.0);
        assert_approx(result.effective_tax_rate, 5.46);
        assert_eq!(result.regime, Regime::New);
        assert_eq!(result.deductions, 0.0);
    }

    #[test]
    fn old_regime_end_to_end() {
        let result = compute(&old_input(AgeGroup::Below60, 800_000.0));
        assert_approx(result.taxable_income, 800_000.0);
        assert_approx(result.tax, 22_500.0);
        assert_approx(result.cess, 900.0);
        assert_approx(result.total_tax, 23_400.0);
        assert_approx(result.effective_tax_rate, 2.925);
    }

    #[test]
    fn old_regime_subtracts_hra_and_deductions() {
        let mut input = old_input(AgeGroup::Below60, 1_500_000.0);
        input.hra_exempt = 100_000.0;
        input.deductions.section80d = Some(25_000.0);
        input.investments.elss = Some(150_000.0);
        input.investments.nps = Some(50_000.0);

        let result = compute(&input);
        assert_approx(result.deductions, 225_000.0);
        assert_approx(result.taxable_income, 1_175_000.0);
        // adjusted 925_000
        assert_approx(result.tax, 12_500.0 + 425_000.0 * 0.20);
    }

    #[test]
    fn new_regime_reports_old_regime_deductions_without_using_them() {
        let mut input = TaxInput::new(Regime::New, 1_000_000.0);
        input.deductions.section80c = Some(150_000.0);
        input.investments.nps = Some(50_000.0);

        let result = compute(&input);
        assert_approx(result.deductions, 200_000.0);
        assert_approx(result.taxable_income, 950_000.0);
        assert_approx(result.tax, 52_500.0);
    }

    #[test]
    fn new_regime_subtracts_hra_before_standard_deduction() {
        let mut input = TaxInput::new(Regime::New, 1_000_000.0);
        input.hra_exempt = 50_000.0;
        let result = compute(&input);
        assert_approx(result.taxable_income, 900_000.0);
        assert_approx(result.tax, 45_000.0);
    }

    #[test]
    fn zero_income_yields_nan_effective_rate() {
        for regime in [Regime::Old, Regime::New] {
            let result = compute(&TaxInput::new(regime, 0.0));
            assert_eq!(result.tax, 0.0);
            assert_eq!(result.total_tax, 0.0);
            assert!(result.effective_tax_rate.is_nan());
        }
    }

    #[test]
    fn zero_income_rate_serializes_as_null() {
        let result = compute(&TaxInput::new(Regime::New, 0.0));
        let json = serde_json::to_value(&result).expect("result should serialize");
        assert!(json["effectiveTaxRate"].is_null());
        assert_eq!(json["taxableIncome"], serde_json::json!(-50_000.0));
    }

    #[test]
    fn infinite_income_overflows_deterministically() {
        let first = compute(&TaxInput::new(Regime::New, f64::INFINITY));
        let second = compute(&TaxInput::new(Regime::New, f64::INFINITY));
        assert_eq!(first.tax, f64::INFINITY);
        assert_eq!(first.total_tax, f64::INFINITY);
        assert!(first.effective_tax_rate.is_nan());
        assert_eq!(first.tax.to_bits(), second.tax.to_bits());
        assert_eq!(
            first.effective_tax_rate.to_bits(),
            second.effective_tax_rate.to_bits()
        );
    }

    #[test]
    fn largest_finite_income_stays_finite() {
        let result = compute(&TaxInput::new(Regime::Old, f64::MAX));
        assert!(result.tax.is_finite());
        assert!(result.total_tax.is_finite());
        assert!(result.effective_tax_rate.is_finite());
    }

    #[test]
    fn compute_is_idempotent() {
        let mut input = old_input(AgeGroup::From60To80, 1_234_567.0);
        input.hra_exempt = 12_345.0;
        input.deductions.section80c = Some(90_000.0);
        input.investments.nps = Some(70_000.0);

        let first = compute(&input);
        let second = compute(&input);
        for (a, b) in [
            (first.taxable_income, second.taxable_income),
            (first.tax, second.tax),
            (first.cess, second.cess),
            (first.total_tax, second.total_tax),
            (first.effective_tax_rate, second.effective_tax_rate),
            (first.deductions, second.deductions),
        ] {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(256))]

        #[test]
        fn prop_new_regime_slab_tax_is_non_decreasing(
            base in 0u32..3_000_000,
            step in 1u32..200_000
        ) {
            let low = base as f64;
            let high = low + step as f64;
            prop_assert!(new_regime_slab_tax(high) + 1e-9 >= new_regime_slab_tax(low));
        }

        #[test]
        fn prop_new_regime_slab_tax_is_continuous(base in 0u32..3_000_000) {
            let income = base as f64;
            let delta = new_regime_slab_tax(income + 1.0) - new_regime_slab_tax(income);
            prop_assert!((-1e-9..=0.30 + 1e-9).contains(&delta), "jump of {} at {}", delta, income);
        }

        #[test]
        fn prop_old_regime_tax_is_never_negative(
            income in -2_000_000i64..5_000_000,
            age in 0usize..3
        ) {
            let age_group = [AgeGroup::Below60, AgeGroup::From60To80, AgeGroup::Above80][age];
            prop_assert!(old_regime_tax(income as f64, age_group) >= 0.0);
        }

        #[test]
        fn prop_cess_and_total_follow_tax(
            income in 1u32..10_000_000,
            hra in 0u32..500_000,
            section80c in 0u32..300_000,
            nps in 0u32..100_000,
            old in proptest::bool::ANY
        ) {
            let regime = if old { Regime::Old } else { Regime::New };
            let mut input = TaxInput::new(regime, income as f64);
            input.hra_exempt = hra as f64;
            input.deductions.section80c = Some(section80c as f64);
            input.investments.nps = Some(nps as f64);

            let result = compute(&input);
            prop_assert!(result.tax >= 0.0);
            prop_assert!(result.cess == result.tax * 0.04);
            prop_assert!(result.total_tax == result.tax + result.cess);
            prop_assert!(result.effective_tax_rate.is_finite());
        }
    }
}
