pub mod indicator_pipeline;

pub use indicator_pipeline::IndicatorPipeline;
