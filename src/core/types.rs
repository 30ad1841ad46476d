use serde::{Deserialize, Serialize, Serializer};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum AgeGroup {
    #[default]
    #[serde(rename = "below-60")]
    Below60,
    #[serde(rename = "60-80")]
    From60To80,
    #[serde(rename = "above-80")]
    Above80,
}

impl AgeGroup {
    /// Basic exemption limit under the old regime.
    pub fn exemption_limit(self) -> f64 {
        match self {
            AgeGroup::Below60 => 250_000.0,
            AgeGroup::From60To80 => 300_000.0,
            AgeGroup::Above80 => 500_000.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Old,
    New,
}

/// Deduction claims. Absent fields count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Deductions {
    pub section80c: Option<f64>,
    pub section80d: Option<f64>,
    pub section80e: Option<f64>,
    pub section80g: Option<f64>,
    pub other_deductions: Option<f64>,
}

/// Investments that feed the 80C pool (ppf, elss, fd, home loan) or the NPS bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Investments {
    pub ppf: Option<f64>,
    pub elss: Option<f64>,
    pub nps: Option<f64>,
    pub fd: Option<f64>,
    pub home_loan: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxInput {
    pub age_group: AgeGroup,
    pub regime: Regime,
    pub income: f64,
    pub hra_exempt: f64,
    pub deductions: Deductions,
    pub investments: Investments,
}

impl TaxInput {
    pub fn new(regime: Regime, income: f64) -> Self {
        Self {
            age_group: AgeGroup::default(),
            regime,
            income,
            hra_exempt: 0.0,
            deductions: Deductions::default(),
            investments: Investments::default(),
        }
    }

    /// Caller-side shape check; `compute` itself accepts any f64.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let d = &self.deductions;
        let i = &self.investments;
        let fields = [
            ("income", Some(self.income)),
            ("hraExempt", Some(self.hra_exempt)),
            ("deductions.section80c", d.section80c),
            ("deductions.section80d", d.section80d),
            ("deductions.section80e", d.section80e),
            ("deductions.section80g", d.section80g),
            ("deductions.otherDeductions", d.other_deductions),
            ("investments.ppf", i.ppf),
            ("investments.elss", i.elss),
            ("investments.nps", i.nps),
            ("investments.fd", i.fd),
            ("investments.homeLoan", i.home_loan),
        ];

        let errors: Vec<String> = fields
            .into_iter()
            .filter_map(|(name, value)| match value {
                Some(v) if !v.is_finite() || v < 0.0 => {
                    Some(format!("{name} must be a non-negative number"))
                }
                _ => None,
            })
            .collect();

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Fully populated deduction figures used by the old regime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeductionSummary {
    pub section80c_bucket: f64,
    pub total_deductions: f64,
    pub nps_additional: f64,
    pub total_with_nps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    pub income: f64,
    pub taxable_income: f64,
    pub tax: f64,
    pub cess: f64,
    pub total_tax: f64,
    /// NaN when income is zero; serialized as `null` whenever non-finite.
    #[serde(serialize_with = "serialize_rate", deserialize_with = "deserialize_rate")]
    pub effective_tax_rate: f64,
    pub regime: Regime,
    /// Old-regime deduction total, reported under both regimes.
    pub deductions: f64,
}

fn serialize_rate<S: Serializer>(rate: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if rate.is_finite() {
        serializer.serialize_f64(*rate)
    } else {
        serializer.serialize_none()
    }
}

fn deserialize_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
