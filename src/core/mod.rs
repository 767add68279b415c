pub mod aggregator;
pub mod etl;

pub use crate::domain::model::{IndicatorBundle, TransformResult};
pub use crate::domain::ports::{ConfigProvider, DocumentFetcher, Pipeline, Storage};
pub use crate::utils::error::Result;
