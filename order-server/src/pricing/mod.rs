//! 价格解析
//!
//! Authoritative name/price lookup for cart items.

mod resolver;

pub use resolver::{PricingResolver, ResolvedPrice};
