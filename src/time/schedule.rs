//! Report-step schedules.

use serde::Deserialize;
use thiserror::Error;

/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Errors from schedule construction.
#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    /// Times must start at zero and strictly increase.
    #[error("schedule is not strictly increasing from 0 at entry {index}")]
    NotIncreasing {
        /// First offending entry.
        index: usize,
    },

    /// A per-step array does not match the number of steps.
    #[error("{name} has {found} entries but the schedule has {expected} steps")]
    LengthMismatch {
        /// Array name.
        name: &'static str,
        /// Entries given.
        found: usize,
        /// Steps expected.
        expected: usize,
    },

    /// Non-positive durations, step sizes or counts.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Offending quantity.
        name: &'static str,
        /// What is wrong.
        reason: String,
    },
}

/// Cumulative elapsed seconds at each report step, starting at 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    times: Vec<f64>,
}

impl Schedule {
    /// Validate and wrap a time list.
    pub fn new(times: Vec<f64>) -> Result<Self, ScheduleError> {
        if times.first() != Some(&0.0) {
            return Err(ScheduleError::NotIncreasing { index: 0 });
        }
        if let Some(index) = times.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(ScheduleError::NotIncreasing { index: index + 1 });
        }
        Ok(Self { times })
    }

    /// Build from step lengths in seconds.
    pub fn from_steps(steps: &[f64]) -> Result<Self, ScheduleError> {
        let mut times = Vec::with_capacity(steps.len() + 1);
        times.push(0.0);
        let mut t = 0.0;
        for dt in steps {
            t += dt;
            times.push(t);
        }
        Self::new(times)
    }

    /// Times in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of entries, including `t = 0`.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false; a schedule holds at least `t = 0`.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of report intervals.
    pub fn n_steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Final time.
    pub fn end(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Interval lengths.
    pub fn step_sizes(&self) -> Vec<f64> {
        self.times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Subdivide every interval `i` into `frequency[i]` telescoped sub-steps
    /// with coefficient `telescoping[i]`.
    pub fn refine(
        &self,
        frequency: &PerStep<usize>,
        telescoping: &PerStep<f64>,
    ) -> Result<Schedule, ScheduleError> {
        let n = self.n_steps();
        let counts = frequency.resolve("frequency", n)?;
        let coefficients = telescoping.resolve("telescoping", n)?;
        if let Some(i) = counts.iter().position(|c| *c == 0) {
            return Err(ScheduleError::Invalid {
                name: "frequency",
                reason: format!("entry {i} is zero"),
            });
        }
        let mut times = vec![0.0];
        for (i, w) in self.times.windows(2).enumerate() {
            let part = telescoping_partition(w[0], w[1], counts[i], coefficients[i]);
            times.extend_from_slice(&part[1..]);
        }
        Schedule::new(times)
    }
}

/// Exponentially graded partition of `[start, end]` into `n` pieces.
///
/// With `coefficient == 0` the pieces are equal. Otherwise the fractions are
/// `1 - (exp(a * (1 - s)) - 1) / (exp(a) - 1)` for `s = 0, 1/n, ..., 1`,
/// which for `a > 0` makes the pieces shrink towards `end`.
///
/// # Example
///
/// ```
/// use expreccs::time::telescoping_partition;
///
/// let t = telescoping_partition(0.0, 10.0, 4, 0.0);
/// assert_eq!(t, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
///
/// let g = telescoping_partition(0.0, 10.0, 4, 3.0);
/// assert!(g[1] - g[0] > g[4] - g[3]);
/// ```
pub fn telescoping_partition(start: f64, end: f64, n: usize, coefficient: f64) -> Vec<f64> {
    let n = n.max(1);
    let span = end - start;
    let mut out: Vec<f64> = (0..=n)
        .map(|m| {
            let s = m as f64 / n as f64;
            let fraction = if coefficient == 0.0 {
                s
            } else {
                1.0 - ((coefficient * (1.0 - s)).exp() - 1.0) / (coefficient.exp() - 1.0)
            };
            start + span * fraction
        })
        .collect();
    // Pin the ends exactly.
    out[0] = start;
    out[n] = end;
    out
}

/// A scalar applied to every step, or one value per step.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PerStep<T> {
    /// Broadcast to all steps.
    Scalar(T),
    /// One entry per step.
    Each(Vec<T>),
}

impl<T: Clone> PerStep<T> {
    /// Expand to `n` values; a list of the wrong length is an error.
    pub fn resolve(&self, name: &'static str, n: usize) -> Result<Vec<T>, ScheduleError> {
        match self {
            PerStep::Scalar(v) => Ok(vec![v.clone(); n]),
            PerStep::Each(values) if values.len() == n => Ok(values.clone()),
            PerStep::Each(values) if values.len() == 1 => Ok(vec![values[0].clone(); n]),
            PerStep::Each(values) => Err(ScheduleError::LengthMismatch {
                name,
                found: values.len(),
                expected: n,
            }),
        }
    }
}

/// One injection period, in days.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InjectionPeriod {
    /// Period length.
    pub duration_days: f64,
    /// Regional report step.
    pub regional_step_days: f64,
    /// Site report step.
    pub site_step_days: f64,
}

impl InjectionPeriod {
    /// From a `[duration, regional_step, site_step]` row.
    pub fn from_row(row: [f64; 3]) -> Self {
        Self {
            duration_days: row[0],
            regional_step_days: row[1],
            site_step_days: row[2],
        }
    }
}

fn steps_for(periods: &[InjectionPeriod], step: impl Fn(&InjectionPeriod) -> f64) -> Result<Vec<f64>, ScheduleError> {
    let mut steps = Vec::new();
    for (i, p) in periods.iter().enumerate() {
        let dt = step(p);
        if !(p.duration_days > 0.0) || !(dt > 0.0) {
            return Err(ScheduleError::Invalid {
                name: "injection",
                reason: format!("row {i} needs positive duration and step"),
            });
        }
        let n = (p.duration_days / dt).round().max(1.0) as usize;
        steps.extend(std::iter::repeat_n(dt * SECONDS_PER_DAY, n));
    }
    Ok(steps)
}

/// Regional schedule: `round(duration / regional_step)` steps per period.
pub fn regional_schedule(periods: &[InjectionPeriod]) -> Result<Schedule, ScheduleError> {
    Schedule::from_steps(&steps_for(periods, |p| p.regional_step_days)?)
}

/// Site schedule from the periods' own site step.
pub fn site_schedule(periods: &[InjectionPeriod]) -> Result<Schedule, ScheduleError> {
    Schedule::from_steps(&steps_for(periods, |p| p.site_step_days)?)
}
