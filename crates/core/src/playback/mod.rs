pub mod clock;
pub mod scheduler;

pub use clock::{CancelToken, Clock, SystemClock};
pub use scheduler::{PlaybackOutcome, Scheduler, SchedulerConfig};
