use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{RiskError, RiskResult};

use super::{PriceFeedData, PriceOracle};

/// Supported real-world asset classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RwaCategory {
    RealEstate,
    CarbonCredits,
    PreciousMetals,
    Commodities,
    Certificates,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealEstateSpec {
    pub square_feet: f64,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub location: Option<String>,
}

impl Default for RealEstateSpec {
    fn default() -> Self {
        Self {
            square_feet: 2000.0,
            bedrooms: 3.0,
            bathrooms: 2.0,
            location: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CarbonCreditSpec {
    pub credit_type: String,
    /// Issuance year. Defaults to the current year.
    pub vintage: Option<i32>,
    pub standard: String,
}

impl Default for CarbonCreditSpec {
    fn default() -> Self {
        Self {
            credit_type: "forest_conservation".to_string(),
            vintage: None,
            standard: "VCS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreciousMetalSpec {
    pub metal_type: String,
    pub weight_oz: f64,
    pub purity: f64,
}

impl Default for PreciousMetalSpec {
    fn default() -> Self {
        Self {
            metal_type: "gold".to_string(),
            weight_oz: 1.0,
            purity: 0.999,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommoditySpec {
    pub commodity_type: String,
    pub quantity: f64,
    pub unit: String,
}

impl Default for CommoditySpec {
    fn default() -> Self {
        Self {
            commodity_type: "oil".to_string(),
            quantity: 1.0,
            unit: "barrel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CertificateSpec {
    pub certificate_type: String,
    pub institution: String,
    pub level: String,
}

impl Default for CertificateSpec {
    fn default() -> Self {
        Self {
            certificate_type: "diploma".to_string(),
            institution: "unknown".to_string(),
            level: "bachelor".to_string(),
        }
    }
}

const REAL_ESTATE_BASE: f64 = 250_000.0;
const CARBON_BASE_PER_TON: f64 = 15.0;
const REFERENCE_METAL_PRICE: f64 = 2000.0;
const PRESTIGIOUS_INSTITUTIONS: [&str; 5] = ["harvard", "mit", "stanford", "oxford", "cambridge"];

/// Price a real-world asset from its category-specific specification.
///
/// Gold and silver resolve through the `XAU` and `XAG` feeds; every other
/// category uses a static valuation model. A `location` given here overrides
/// the one inside a real-estate specification.
pub async fn rwa_price(
    oracle: &dyn PriceOracle,
    category: RwaCategory,
    specifications: serde_json::Value,
    location: Option<String>,
    now: DateTime<Utc>,
) -> RiskResult<PriceFeedData> {
    let price = match category {
        RwaCategory::RealEstate => {
            let mut spec: RealEstateSpec = parse_spec(specifications)?;
            if location.is_some() {
                spec.location = location;
            }
            real_estate_price(&spec, now)
        }
        RwaCategory::CarbonCredits => carbon_credit_price(&parse_spec(specifications)?, now),
        RwaCategory::PreciousMetals => {
            precious_metal_price(oracle, &parse_spec(specifications)?, now).await?
        }
        RwaCategory::Commodities => commodity_price(&parse_spec(specifications)?, now),
        RwaCategory::Certificates => certificate_price(&parse_spec(specifications)?, now),
    };

    tracing::debug!(?category, asset = %price.asset, price = price.price, "Priced RWA");
    Ok(price)
}

fn parse_spec<T: DeserializeOwned + Default>(specifications: serde_json::Value) -> RiskResult<T> {
    if specifications.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(specifications)
        .map_err(|e| RiskError::invalid(format!("invalid specifications: {}", e)))
}

fn modelled(asset: String, price: f64, decimals: u8, source: &str, now: DateTime<Utc>) -> PriceFeedData {
    PriceFeedData {
        asset,
        price,
        decimals,
        updated_at: now.timestamp().max(0) as u64,
        round_id: now.timestamp_millis().to_string(),
        source: source.to_string(),
    }
}

pub fn real_estate_price(spec: &RealEstateSpec, now: DateTime<Utc>) -> PriceFeedData {
    let mut price = REAL_ESTATE_BASE;
    price += (spec.square_feet - 2000.0) * 150.0;
    price += (spec.bedrooms - 3.0) * 25_000.0;
    price += (spec.bathrooms - 2.0) * 15_000.0;

    let multiplier = match spec.location.as_deref().map(str::to_lowercase).as_deref() {
        Some("california") => 2.5,
        Some("new_york") => 2.2,
        Some("texas") => 1.1,
        Some("florida") => 1.3,
        _ => 1.0,
    };

    modelled(
        "Real Estate".to_string(),
        price * multiplier,
        0,
        "RWA Oracle - Real Estate",
        now,
    )
}

pub fn carbon_credit_price(spec: &CarbonCreditSpec, now: DateTime<Utc>) -> PriceFeedData {
    let type_multiplier = match spec.credit_type.as_str() {
        "renewable_energy" => 1.2,
        "forest_conservation" => 1.0,
        "direct_air_capture" => 3.0,
        "methane_capture" => 0.8,
        _ => 1.0,
    };

    let current_year = now.year();
    let vintage = spec.vintage.unwrap_or(current_year);
    let age_discount = (f64::from(current_year - vintage) * 0.05).max(0.0);

    // credits older than twenty years bottom out at zero
    let mut price = CARBON_BASE_PER_TON * type_multiplier * (1.0 - age_discount).max(0.0);
    if spec.standard == "Gold Standard" {
        price *= 1.15;
    }

    modelled(
        "Carbon Credits".to_string(),
        price,
        2,
        "RWA Oracle - Carbon Credits",
        now,
    )
}

pub async fn precious_metal_price(
    oracle: &dyn PriceOracle,
    spec: &PreciousMetalSpec,
    now: DateTime<Utc>,
) -> RiskResult<PriceFeedData> {
    let metal = spec.metal_type.to_lowercase();
    let feed_symbol = match metal.as_str() {
        "gold" => Some("XAU"),
        "silver" => Some("XAG"),
        _ => None,
    };

    let base = match feed_symbol {
        Some(symbol) => oracle
            .price(symbol)
            .await
            .map_err(|e| RiskError::unavailable("price feed", e))?
            .ok_or_else(|| {
                RiskError::unavailable("price feed", format!("no {} feed for {}", symbol, spec.metal_type))
            })?,
        None => modelled(spec.metal_type.clone(), REFERENCE_METAL_PRICE, 2, "Reference Price", now),
    };

    Ok(PriceFeedData {
        asset: format!(
            "{} ({}oz, {}% pure)",
            spec.metal_type,
            spec.weight_oz,
            spec.purity * 100.0
        ),
        price: base.price * spec.weight_oz * spec.purity,
        decimals: base.decimals,
        updated_at: base.updated_at,
        round_id: base.round_id,
        source: base.source,
    })
}

pub fn commodity_price(spec: &CommoditySpec, now: DateTime<Utc>) -> PriceFeedData {
    let unit_price = match spec.commodity_type.to_lowercase().as_str() {
        "oil" => 80.0,
        "natural_gas" => 3.5,
        "wheat" => 7.5,
        "corn" => 6.2,
        "soybeans" => 14.8,
        "copper" => 8500.0,
        "aluminum" => 2200.0,
        _ => 100.0,
    };

    modelled(
        format!("{} ({} {})", spec.commodity_type, spec.quantity, spec.unit),
        unit_price * spec.quantity,
        2,
        "RWA Oracle - Commodities",
        now,
    )
}

pub fn certificate_price(spec: &CertificateSpec, now: DateTime<Utc>) -> PriceFeedData {
    let mut price = match spec.certificate_type.as_str() {
        "diploma" => 50_000.0,
        "certificate" => 10_000.0,
        "license" => 25_000.0,
        "patent" => 100_000.0,
        "trademark" => 75_000.0,
        _ => 10_000.0,
    };

    let institution = spec.institution.to_lowercase();
    if PRESTIGIOUS_INSTITUTIONS.iter().any(|inst| institution.contains(inst)) {
        price *= 2.0;
    }

    price *= match spec.level.as_str() {
        "associate" => 0.5,
        "bachelor" => 1.0,
        "master" => 1.5,
        "doctorate" => 2.5,
        "professional" => 2.0,
        _ => 1.0,
    };

    modelled(
        format!("{} - {}", spec.certificate_type, spec.institution),
        price,
        0,
        "RWA Oracle - Certificates",
        now,
    )
}
