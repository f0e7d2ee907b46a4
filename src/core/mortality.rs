use super::error::EngineError;
use super::types::{Gender, MortalityResult, PersonProfile};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MortalityTableEntry {
    pub age: u32,
    pub male: f64,
    pub female: f64,
}

impl MortalityTableEntry {
    fn expectancy(&self, gender: Gender) -> f64 {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
        }
    }
}

pub const TABLE_SOURCE: &str = "CPM2014";

/// Remaining life expectancy in years, CPM2014 with improvement scale.
#[rustfmt::skip]
pub const CPM2014: [MortalityTableEntry; 9] = [
    MortalityTableEntry { age: 60, male: 25.8, female: 28.4 },
    MortalityTableEntry { age: 65, male: 21.6, female: 24.0 },
    MortalityTableEntry { age: 70, male: 17.6, female: 19.9 },
    MortalityTableEntry { age: 75, male: 14.0, female: 16.0 },
    MortalityTableEntry { age: 80, male: 10.7, female: 12.4 },
    MortalityTableEntry { age: 85, male: 7.9, female: 9.2 },
    MortalityTableEntry { age: 90, male: 5.6, female: 6.5 },
    MortalityTableEntry { age: 95, male: 3.9, female: 4.5 },
    MortalityTableEntry { age: 100, male: 2.7, female: 3.1 },
];

/// Expectancy added per year of age below the first tabulated row.
pub const YEARS_PER_AGE_BELOW_TABLE: f64 = 0.2;
pub const PLANNING_BUFFER_YEARS: f64 = 3.0;
pub const PLANNING_AGE_CAP: f64 = 100.0;
const TERMINAL_AGE: f64 = 105.0;
const ABOVE_TABLE_MAX_YEARS: f64 = 2.0;

pub fn life_expectancy(age: f64, gender: Gender) -> Result<f64, EngineError> {
    if !age.is_finite() || age < 0.0 {
        return Err(EngineError::InvalidAge(age));
    }

    let first = &CPM2014[0];
    let last = &CPM2014[CPM2014.len() - 1];

    if age < f64::from(first.age) {
        let years_below = f64::from(first.age) - age;
        return Ok(first.expectancy(gender) + years_below * YEARS_PER_AGE_BELOW_TABLE);
    }
    if age > f64::from(last.age) {
        return Ok((TERMINAL_AGE - age).clamp(1.0, ABOVE_TABLE_MAX_YEARS));
    }

    for pair in CPM2014.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        if age <= f64::from(hi.age) {
            let span = f64::from(hi.age - lo.age);
            let t = (age - f64::from(lo.age)) / span;
            let lo_value = lo.expectancy(gender);
            let hi_value = hi.expectancy(gender);
            return Ok(lo_value + (hi_value - lo_value) * t);
        }
    }

    Ok(last.expectancy(gender))
}

pub fn recommended_planning_age(age: f64, gender: Gender) -> Result<u32, EngineError> {
    let expectancy = life_expectancy(age, gender)?;
    Ok(planning_age_from(age, expectancy))
}

fn planning_age_from(age: f64, expectancy: f64) -> u32 {
    (age + expectancy + PLANNING_BUFFER_YEARS)
        .min(PLANNING_AGE_CAP)
        .round() as u32
}

pub fn mortality(age: f64, gender: Gender) -> Result<MortalityResult, EngineError> {
    let expectancy = life_expectancy(age, gender)?;
    Ok(MortalityResult {
        life_expectancy_years: expectancy,
        final_age: age + expectancy,
        recommended_planning_age: planning_age_from(age, expectancy),
        source: TABLE_SOURCE.to_string(),
    })
}

/// Last-survivor horizon of the household, expressed in the primary's age.
pub fn household_planning_age(profile: &PersonProfile) -> Result<u32, EngineError> {
    let age = profile.age();
    let own = recommended_planning_age(f64::from(age), profile.gender)?;

    let (Some(partner), Some(partner_age)) = (&profile.partner, profile.partner_age()) else {
        return Ok(own);
    };
    let partner_horizon = recommended_planning_age(f64::from(partner_age), partner.gender)?;
    let years_left = partner_horizon.saturating_sub(partner_age);
    let in_primary_age = (age + years_left).min(PLANNING_AGE_CAP as u32);

    Ok(own.max(in_primary_age))
}
