use jiff::civil::date;

use super::types::{Gender, PersonProfile, SavingsBalances};

pub(crate) const EPS: f64 = 1e-6;

pub(crate) fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= EPS,
        "expected {expected}, got {actual}"
    );
}

pub(crate) fn sample_profile() -> PersonProfile {
    PersonProfile {
        birth_date: date(1980, 6, 15),
        valuation_date: date(2025, 1, 1),
        gender: Gender::Female,
        annual_salary: 75_000.0,
        monthly_expenses: 3_000.0,
        service_years: 15.0,
        full_time_fraction: 1.0,
        retirement_age: 61,
        savings: SavingsBalances {
            registered: 120_000.0,
            tax_free: 40_000.0,
            non_registered: 10_000.0,
            cash: 5_000.0,
        },
        expected_universal_pension_at_65: 12_000.0,
        universal_pension_start_age: 65,
        retirement_taxable_income: None,
        partner: None,
    }
}
