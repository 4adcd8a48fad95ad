pub mod usage;
pub mod view;

pub use usage::{BillingItem, PremiumUsage, UsageLimitConfig, UsageSnapshot};
pub use view::{DerivedView, ErrorView, PremiumStats, UsageBasedStats};
