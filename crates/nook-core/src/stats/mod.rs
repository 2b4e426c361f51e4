//! Statistics folding, migration and derived analytics.

pub mod analytics;
pub mod fold;
pub mod schema;

pub use analytics::{Dashboard, EstimateVerdict, EstimationAccuracy, WeekSplit};
pub use fold::{fold_focus, is_long_break, pause_bucket, record_pause, FocusCredit, FocusFold};
