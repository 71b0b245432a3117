pub mod archive;
pub mod partition;
pub mod store;

pub use store::{HistoricalStore, RangeQuery};
