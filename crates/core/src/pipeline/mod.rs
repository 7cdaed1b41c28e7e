pub mod intake_sweep;
pub mod report;
pub mod runner;
pub mod source_pipeline;
