//! Transfer of per-step values between independent schedules.

use serde::Deserialize;

use super::{Schedule, ScheduleError};

/// How values are taken at target times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInterpolation {
    /// Piecewise linear, extrapolated past both ends.
    #[default]
    Interp,
    /// Value of the first source entry at or after the target time.
    Step,
}

/// Pair simulator report times with their values as a schedule starting at
/// zero. A first report after zero is held back to time zero.
///
/// ```
/// use expreccs::time::report_series;
///
/// let (schedule, values) = report_series(&[10.0, 20.0], vec![vec![1.0], vec![2.0]]).unwrap();
/// assert_eq!(schedule.times(), &[0.0, 10.0, 20.0]);
/// assert_eq!(values[0], values[1]);
/// ```
pub fn report_series(
    times: &[f64],
    mut values: Vec<Vec<f64>>,
) -> Result<(Schedule, Vec<Vec<f64>>), ScheduleError> {
    let mut times = times.to_vec();
    if times.first().is_some_and(|t| *t > 0.0) {
        times.insert(0, 0.0);
        if let Some(first) = values.first().cloned() {
            values.insert(0, first);
        }
    }
    Ok((Schedule::new(times)?, values))
}

/// Index of the first source time `>= t`, clamped to the last entry.
fn next_index(times: &[f64], t: f64) -> usize {
    times.partition_point(|s| *s < t).min(times.len() - 1)
}

/// Bracketing interval and (unclamped) weight for linear interpolation.
fn bracket(times: &[f64], t: f64) -> (usize, f64) {
    let i = times
        .partition_point(|s| *s <= t)
        .saturating_sub(1)
        .min(times.len() - 2);
    (i, (t - times[i]) / (times[i + 1] - times[i]))
}

/// Resample a series of value vectors (one per source entry, one value per
/// degree of freedom) onto the target schedule.
///
/// Non-finite source values stay non-finite in linear mode, so a face
/// without a value at some step keeps propagating that gap.
///
/// # Example
///
/// ```
/// use expreccs::time::{Schedule, TimeInterpolation, resample};
///
/// let source = Schedule::new(vec![0.0, 10.0]).unwrap();
/// let target = Schedule::new(vec![0.0, 5.0, 10.0, 15.0]).unwrap();
/// let values = vec![vec![1.0], vec![3.0]];
///
/// let lin = resample(&source, &values, &target, TimeInterpolation::Interp);
/// assert_eq!(lin, vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
///
/// let step = resample(&source, &values, &target, TimeInterpolation::Step);
/// assert_eq!(step, vec![vec![1.0], vec![3.0], vec![3.0], vec![3.0]]);
/// ```
pub fn resample(
    source: &Schedule,
    values: &[Vec<f64>],
    target: &Schedule,
    mode: TimeInterpolation,
) -> Vec<Vec<f64>> {
    let times = source.times();
    let n = times.len().min(values.len());
    if n == 0 {
        return vec![Vec::new(); target.len()];
    }
    let times = &times[..n];
    let dofs = values[..n].iter().map(Vec::len).min().unwrap_or(0);
    target
        .times()
        .iter()
        .map(|&t| match mode {
            TimeInterpolation::Step => values[next_index(times, t)][..dofs].to_vec(),
            TimeInterpolation::Interp if n == 1 => values[0][..dofs].to_vec(),
            TimeInterpolation::Interp => {
                let (i, alpha) = bracket(times, t);
                let (a, b) = (&values[i], &values[i + 1]);
                (0..dofs).map(|d| a[d] + alpha * (b[d] - a[d])).collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn source() -> Schedule {
        Schedule::new(vec![0.0, 10.0, 20.0, 40.0]).unwrap()
    }

    fn series() -> Vec<Vec<f64>> {
        vec![vec![0.0, 5.0], vec![10.0, 5.0], vec![30.0, 6.0], vec![10.0, 7.0]]
    }

    #[test]
    fn test_step_exact_times() {
        let out = resample(&source(), &series(), &source(), TimeInterpolation::Step);
        assert_eq!(out, series());
    }

    #[test]
    fn test_step_takes_next_sample() {
        let target = Schedule::new(vec![0.0, 1.0, 10.0, 25.0, 50.0]).unwrap();
        let out = resample(&source(), &series(), &target, TimeInterpolation::Step);
        assert_eq!(out[1], vec![10.0, 5.0]);
        assert_eq!(out[2], vec![10.0, 5.0]);
        assert_eq!(out[3], vec![10.0, 7.0]);
        // Past the end: last sample.
        assert_eq!(out[4], vec![10.0, 7.0]);
    }

    #[test]
    fn test_linear_with_extrapolation() {
        let target = Schedule::new(vec![0.0, 15.0, 30.0, 50.0]).unwrap();
        let out = resample(&source(), &series(), &target, TimeInterpolation::Interp);
        assert!((out[1][0] - 20.0).abs() < TOL);
        assert!((out[2][0] - 20.0).abs() < TOL);
        assert!((out[3][0] - 0.0).abs() < TOL);
        assert!((out[3][1] - 7.5).abs() < TOL);
    }

    #[test]
    fn test_gaps_propagate() {
        let s = Schedule::new(vec![0.0, 1.0]).unwrap();
        let target = Schedule::new(vec![0.0, 0.5]).unwrap();
        let out = resample(&s, &[vec![f64::NAN], vec![1.0]], &target, TimeInterpolation::Interp);
        assert!(out[1][0].is_nan());
    }

    #[test]
    fn test_single_entry() {
        let s = Schedule::new(vec![0.0]).unwrap();
        let target = Schedule::new(vec![0.0, 3.0]).unwrap();
        let out = resample(&s, &[vec![4.0]], &target, TimeInterpolation::Interp);
        assert_eq!(out, vec![vec![4.0], vec![4.0]]);
    }
}
