//! Derived board prices. Everything here is a pure function of the 24k spot
//! price (or the silver spot price) and the current offsets.

use serde::Serialize;

use super::adjustments::AdjustmentSet;
use super::market::SpotPrice;

pub const KARAT_24: f64 = 24.0;
/// Grams per troy ounce, as used by the board.
pub const TROY_OUNCE_GRAMS: f64 = 31.1;
/// Fixed KWD -> USD rate behind the per-ounce bulk figure.
pub const KWD_TO_USD: f64 = 3.271;
pub const GRAMS_PER_KG: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoldPrices {
    pub gold24: f64,
    pub gold22: f64,
    pub gold21: f64,
    pub gold18: f64,
    /// One troy ounce of 24k, converted at [`KWD_TO_USD`].
    pub bulk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SilverPrices {
    pub per_gram: f64,
    /// What the board shows: one kilogram plus the silver offset.
    pub per_kg: f64,
}

/// One cycle's worth of board numbers. A half is `None` when the feed had no
/// entry for that metal, in which case its fields keep their old text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DisplayValues {
    pub gold: Option<GoldPrices>,
    pub silver: Option<SilverPrices>,
}

/// Price of `karat` gold derived from an already adjusted 24k price.
pub fn purity_price(price24: f64, karat: f64, offset: f64) -> f64 {
    price24 * (karat / KARAT_24) + offset
}

pub fn gold_prices(buy_price24: f64, adj: &AdjustmentSet) -> GoldPrices {
    let gold24 = buy_price24 + adj.gold24;
    GoldPrices {
        gold24,
        gold22: purity_price(gold24, 22.0, adj.gold22),
        gold21: purity_price(gold24, 21.0, adj.gold21),
        gold18: purity_price(gold24, 18.0, adj.gold18),
        bulk: gold24 * TROY_OUNCE_GRAMS * KWD_TO_USD + adj.bulk,
    }
}

pub fn silver_prices(per_gram: f64, adj: &AdjustmentSet) -> SilverPrices {
    SilverPrices { per_gram, per_kg: per_gram * GRAMS_PER_KG + adj.silver }
}

pub fn compute(spot: &SpotPrice, adj: &AdjustmentSet) -> DisplayValues {
    DisplayValues {
        gold: spot.gold24.map(|p| gold_prices(p, adj)),
        silver: spot.silver.map(|p| silver_prices(p, adj)),
    }
}
