pub mod session;
pub mod time_entry;

pub use session::SessionStatus;
pub use time_entry::{EntryPatch, TimeEntry};
