use clap::{Args, Parser, Subcommand, ValueEnum};
use jiff::civil::Date;
use serde::Deserialize;

use crate::core::{AssumptionSet, Gender, PartnerProfile, PersonProfile, SavingsBalances};

use super::error::{ApiError, ApiResult};

#[derive(Parser, Debug)]
#[command(
    name = "retraite",
    about = "Retirement readiness planner (defined-benefit pension + public pensions + savings)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level; RUST_LOG overrides it"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(
            long,
            default_value_t = 300,
            help = "Seconds a computed plan stays cached; 0 disables the cache"
        )]
        cache_ttl_secs: u64,
    },
    /// Print a full plan report as JSON.
    Plan(ProfileArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGender {
    Male,
    Female,
}

impl From<CliGender> for Gender {
    fn from(value: CliGender) -> Self {
        match value {
            CliGender::Male => Gender::Male,
            CliGender::Female => Gender::Female,
        }
    }
}

impl From<Gender> for CliGender {
    fn from(value: Gender) -> Self {
        match value {
            Gender::Male => CliGender::Male,
            Gender::Female => CliGender::Female,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssumptionPreset {
    #[default]
    Standard,
    Generic,
    Conservative,
}

impl AssumptionPreset {
    pub fn assumption_set(self) -> AssumptionSet {
        match self {
            AssumptionPreset::Standard => AssumptionSet::standard(),
            AssumptionPreset::Generic => AssumptionSet::generic(),
            AssumptionPreset::Conservative => AssumptionSet::conservative(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(long, help = "Birth date, YYYY-MM-DD")]
    pub birth_date: Date,
    #[arg(long, help = "Date the balances are valued at; defaults to today")]
    pub valuation_date: Option<Date>,
    #[arg(long, value_enum)]
    pub gender: CliGender,
    #[arg(long, default_value_t = 0.0)]
    pub annual_salary: f64,
    #[arg(long, default_value_t = 0.0)]
    pub monthly_expenses: f64,
    #[arg(long, default_value_t = 0.0, help = "Pension plan service already credited")]
    pub service_years: f64,
    #[arg(long, default_value_t = 1.0)]
    pub full_time_fraction: f64,
    #[arg(long, default_value_t = 65)]
    pub retirement_age: u32,
    #[arg(long, default_value_t = 0.0)]
    pub registered_savings: f64,
    #[arg(long, default_value_t = 0.0)]
    pub tax_free_savings: f64,
    #[arg(long, default_value_t = 0.0)]
    pub non_registered_savings: f64,
    #[arg(long, default_value_t = 0.0)]
    pub cash_savings: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Government pension at 65 from the contributor statement"
    )]
    pub universal_pension_at_65: f64,
    #[arg(long, default_value_t = 65)]
    pub universal_pension_start_age: u32,
    #[arg(
        long,
        help = "Household taxable income once retired; estimated when omitted"
    )]
    pub retirement_taxable_income: Option<f64>,
    #[arg(long)]
    pub partner_birth_date: Option<Date>,
    #[arg(long, value_enum)]
    pub partner_gender: Option<CliGender>,
    #[arg(long, default_value_t = 0.0)]
    pub partner_pension_income: f64,
    #[arg(long, default_value_t = 60.0, help = "Survivor benefit in percent")]
    pub survivor_percentage: f64,
    #[arg(long, value_enum, default_value_t = AssumptionPreset::Standard)]
    pub assumptions: AssumptionPreset,
}

pub fn build_profile(args: &ProfileArgs, today: Date) -> ApiResult<PersonProfile> {
    let partner = match (args.partner_birth_date, args.partner_gender) {
        (Some(birth_date), Some(gender)) => Some(PartnerProfile {
            birth_date,
            gender: gender.into(),
            annual_pension_income: args.partner_pension_income,
        }),
        (None, None) => None,
        _ => {
            return Err(ApiError::Validation(vec![
                "--partner-birth-date and --partner-gender must be given together".to_string(),
            ]));
        }
    };

    let mut errors = Vec::new();
    if !(0.0..=100.0).contains(&args.survivor_percentage) {
        errors.push("--survivor-percentage must be between 0 and 100".to_string());
    }

    let profile = PersonProfile {
        birth_date: args.birth_date,
        valuation_date: args.valuation_date.unwrap_or(today),
        gender: args.gender.into(),
        annual_salary: args.annual_salary,
        monthly_expenses: args.monthly_expenses,
        service_years: args.service_years,
        full_time_fraction: args.full_time_fraction,
        retirement_age: args.retirement_age,
        savings: SavingsBalances {
            registered: args.registered_savings,
            tax_free: args.tax_free_savings,
            non_registered: args.non_registered_savings,
            cash: args.cash_savings,
        },
        expected_universal_pension_at_65: args.universal_pension_at_65,
        universal_pension_start_age: args.universal_pension_start_age,
        retirement_taxable_income: args.retirement_taxable_income,
        partner,
    };

    errors.extend(profile.validate());
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(profile)
}
