pub mod boot;
pub mod clock;
pub mod error;
pub mod messages;
pub mod persistence;
pub mod scheduler;
pub mod standup;

pub use boot::{BootConfig, Booted, boot};
pub use clock::{Clock, SystemClock};
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::Scheduler;
