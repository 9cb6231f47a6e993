// Price pipeline: offsets + spot feed -> derived board numbers
pub mod adjustments; // offsets loaded from the document store
pub mod client;      // shared reqwest helpers
pub mod compute;     // purity / bulk / silver arithmetic
pub mod format;      // "1,234.500" rendering
pub mod market;      // external spot price feed
pub mod numeric;     // lenient JSON number coercion

pub use adjustments::{AdjustmentLoader, AdjustmentSet, AdjustmentSource, HttpAdjustmentSource, LoadOutcome};
pub use compute::{compute, DisplayValues, GoldPrices, SilverPrices};
pub use format::{format_price, format_with_currency};
pub use market::{HttpMarketSource, MarketResponse, MarketSource, SpotPrice};
