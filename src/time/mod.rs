//! Report-step schedules and temporal resampling.
//!
//! Regional and site models report on independent schedules. Boundary values
//! computed at regional report times are carried to the site schedule by
//! [`resample`]; the site schedule itself may be a telescoped refinement of
//! the regional one.

mod resample;
mod schedule;

pub use resample::{TimeInterpolation, report_series, resample};
pub use schedule::{
    InjectionPeriod, PerStep, SECONDS_PER_DAY, Schedule, ScheduleError, regional_schedule,
    site_schedule, telescoping_partition,
};
