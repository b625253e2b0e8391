pub mod config;
pub mod mode;
pub mod report;
pub mod session;

mod error;
mod eval_export;

pub use config::{PipelineConfig, RunConfig};
pub use error::{PipelineError, Result};
pub use mode::RunMode;
pub use session::TrainingSession;
