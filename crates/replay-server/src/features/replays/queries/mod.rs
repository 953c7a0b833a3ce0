pub mod get;
pub mod list;

pub use get::{GetReplayError, GetReplayQuery};
pub use list::{ListReplaysError, ListReplaysQuery, ListReplaysResponse};
