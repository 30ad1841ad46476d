use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::auth::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};
use crate::core::{AgeGroup, Deductions, Investments, Regime, TaxInput};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliRegime {
    Old,
    New,
}

impl From<CliRegime> for Regime {
    fn from(value: CliRegime) -> Self {
        match value {
            CliRegime::Old => Regime::Old,
            CliRegime::New => Regime::New,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliAgeGroup {
    #[value(name = "below-60")]
    Below60,
    #[value(name = "60-80")]
    From60To80,
    #[value(name = "above-80")]
    Above80,
}

impl From<CliAgeGroup> for AgeGroup {
    fn from(value: CliAgeGroup) -> Self {
        match value {
            CliAgeGroup::Below60 => AgeGroup::Below60,
            CliAgeGroup::From60To80 => AgeGroup::From60To80,
            CliAgeGroup::Above80 => AgeGroup::Above80,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "itax",
    about = "Income tax estimator (old and new regime) with an HTTP API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Compute one tax estimate and print it as JSON
    Calculate(CalculateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,
    #[arg(
        long,
        env = "JWT_SECRET",
        hide_env_values = true,
        help = "Secret used to sign auth tokens"
    )]
    pub jwt_secret: String,
    #[arg(
        long,
        default_value_t = DEFAULT_TOKEN_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECS),
        help = "Lifetime of issued auth tokens in seconds"
    )]
    pub token_ttl_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CalculateArgs {
    #[arg(long, value_enum)]
    pub regime: CliRegime,
    #[arg(long, value_enum, default_value_t = CliAgeGroup::Below60)]
    pub age_group: CliAgeGroup,
    #[arg(long, help = "Gross annual income")]
    pub income: f64,
    #[arg(long, default_value_t = 0.0, help = "Exempt house rent allowance")]
    pub hra_exempt: f64,
    #[arg(long)]
    pub section80c: Option<f64>,
    #[arg(long, help = "Health insurance premiums")]
    pub section80d: Option<f64>,
    #[arg(long, help = "Education loan interest")]
    pub section80e: Option<f64>,
    #[arg(long, help = "Donations")]
    pub section80g: Option<f64>,
    #[arg(long)]
    pub other_deductions: Option<f64>,
    #[arg(long)]
    pub ppf: Option<f64>,
    #[arg(long)]
    pub elss: Option<f64>,
    #[arg(long, help = "NPS contribution; up to 50000 is deducted on top of the 80C pool")]
    pub nps: Option<f64>,
    #[arg(long)]
    pub fd: Option<f64>,
    #[arg(long, help = "Home loan principal repaid")]
    pub home_loan: Option<f64>,
}

pub fn build_tax_input(args: CalculateArgs) -> Result<TaxInput, String> {
    let input = TaxInput {
        age_group: args.age_group.into(),
        regime: args.regime.into(),
        income: args.income,
        hra_exempt: args.hra_exempt,
        deductions: Deductions {
            section80c: args.section80c,
            section80d: args.section80d,
            section80e: args.section80e,
            section80g: args.section80g,
            other_deductions: args.other_deductions,
        },
        investments: Investments {
            ppf: args.ppf,
            elss: args.elss,
            nps: args.nps,
            fd: args.fd,
            home_loan: args.home_loan,
        },
    };
    input.validate().map_err(|errors| errors.join("; "))?;
    Ok(input)
}
