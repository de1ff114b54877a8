// Application layer - Use case interactors

pub mod container;
pub mod transcode_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use transcode_interactor::{
    progress_channel, OperationOutcome, TranscodeInteractor, TranscodeOperation,
};
