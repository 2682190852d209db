//! Service configuration
//!
//! Everything is read from the environment once at startup. Pricing
//! constants are carried in an explicit [`PricingConfig`] that gets injected
//! into the cart and checkout logic rather than read ambiently.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub pricing: PricingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse().context("PORT must be a number")?,
            Err(_) => 8083,
        };
        Ok(Self {
            database_url,
            port,
            pricing: PricingConfig::from_env()?,
        })
    }
}

/// Flat delivery fee and the subtotal at which it is waived.
#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub delivery_price: Decimal,
    pub free_delivery_threshold: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_price: Decimal::from(1500),
            free_delivery_threshold: Decimal::from(25000),
        }
    }
}

impl PricingConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            delivery_price: env_decimal("DELIVERY_PRICE", defaults.delivery_price)?,
            free_delivery_threshold: env_decimal(
                "FREE_DELIVERY_THRESHOLD",
                defaults.free_delivery_threshold,
            )?,
        })
    }

    /// 0 once the subtotal reaches the free-delivery threshold, the flat
    /// fee otherwise.
    pub fn delivery_fee(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_delivery_threshold {
            Decimal::ZERO
        } else {
            self.delivery_price
        }
    }

    /// How much more must be added to the cart before delivery is free.
    pub fn amount_to_free_delivery(&self, subtotal: Decimal) -> Decimal {
        (self.free_delivery_threshold - subtotal).max(Decimal::ZERO)
    }
}

fn env_decimal(key: &str, default: Decimal) -> Result<Decimal> {
    match std::env::var(key) {
        Ok(v) => Decimal::from_str(&v).with_context(|| format!("{key} must be a decimal")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_waived_at_threshold() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.delivery_fee(Decimal::from(25000)), Decimal::ZERO);
        assert_eq!(pricing.delivery_fee(Decimal::from(53000)), Decimal::ZERO);
    }

    #[test]
    fn flat_fee_below_threshold() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.delivery_fee(Decimal::from(24999)), Decimal::from(1500));
        assert_eq!(pricing.delivery_fee(Decimal::ZERO), Decimal::from(1500));
    }

    #[test]
    fn amount_to_free_delivery_never_negative() {
        let pricing = PricingConfig::default();
        assert_eq!(
            pricing.amount_to_free_delivery(Decimal::from(20000)),
            Decimal::from(5000)
        );
        assert_eq!(pricing.amount_to_free_delivery(Decimal::from(30000)), Decimal::ZERO);
    }
}
