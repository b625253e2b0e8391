use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// What a session does with its model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Train a newly initialised model.
    Fresh,
    /// Continue training from a checkpoint.
    Resume { checkpoint: PathBuf },
    /// Score a checkpoint on the test split once.
    Evaluate { checkpoint: PathBuf },
}

impl RunMode {
    pub fn from_flags(model_file: Option<PathBuf>, test_only: bool) -> Result<Self> {
        match (model_file, test_only) {
            (None, false) => Ok(RunMode::Fresh),
            (Some(checkpoint), false) => Ok(RunMode::Resume { checkpoint }),
            (Some(checkpoint), true) => Ok(RunMode::Evaluate { checkpoint }),
            (None, true) => Err(PipelineError::EvaluateWithoutCheckpoint),
        }
    }

    pub fn is_training(&self) -> bool {
        !matches!(self, RunMode::Evaluate { .. })
    }

    pub fn checkpoint(&self) -> Option<&Path> {
        match self {
            RunMode::Fresh => None,
            RunMode::Resume { checkpoint } | RunMode::Evaluate { checkpoint } => Some(checkpoint),
        }
    }
}
