//! Domain types for TrendCast

pub mod bar;
pub mod series;

pub use bar::Bar;
pub use series::{PriceSeries, SeriesError};

/// Symbol type alias
pub type Symbol = String;
