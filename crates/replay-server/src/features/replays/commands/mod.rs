pub mod delete;
pub mod save;

pub use delete::{DeleteReplayCommand, DeleteReplayError};
pub use save::{SaveReplayCommand, SaveReplayError};
