pub mod stellar_pipeline;

pub use stellar_pipeline::StellarPipeline;
