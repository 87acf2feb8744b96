pub mod acquisition;
pub mod generation;
pub mod paper;

pub use acquisition::{AcquisitionResult, DataKind, FailureReason, Payload, SourceKind, Stage};
pub use generation::{GenerationMode, Phase, PipelineStatus};
pub use paper::{KimiSummary, PaperId, PaperMetadata};
