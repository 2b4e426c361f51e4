mod clock;
mod controller;
mod engine;
mod mode;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{SessionContext, TimerController, TimerFlags};
pub use engine::{IntermissionAction, TimerEngine, TimerState};
pub use mode::TimerMode;
