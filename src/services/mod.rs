pub mod clock_service;
pub mod correction_service;
pub mod error;
pub mod session_tracker;
pub mod timesheet_service;

pub use clock_service::{ClockOutcome, ClockService};
pub use correction_service::{parse_hours, parse_updates, Correction, CorrectionService, RetimeRequest};
pub use error::{TimesheetError, TimesheetResult};
pub use session_tracker::{SessionTracker, StatusReport};
pub use timesheet_service::{group_by_day, DayGroup, SortOrder, TimesheetService, TimesheetSummary};
