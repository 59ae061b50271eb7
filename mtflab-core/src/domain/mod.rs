//! Domain types shared by every stage of the confluence pipeline.

pub mod bar;
pub mod granularity;
pub mod series;

pub use bar::Bar;
pub use granularity::{Granularity, ParseGranularityError};
pub use series::TimeSeries;
