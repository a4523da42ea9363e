use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, i.e. equal values
/// keep their input order. Incomparable values (NaN) are treated as equal.
pub fn argsort<T: std::cmp::PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => {
            indices.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal))
        }
        SortOrder::Descending => {
            indices.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap_or(Ordering::Equal))
        }
    }
    indices
}

/// lin_interp returns the linearly interpolated value at x for given discrete data points xp, fp.
/// xp must be increasing. Inspired by numpy.interp, values outside of xp are clamped to the
/// first and last value of fp. Returns None if xp is empty or the lengths do not match.
pub fn lin_interp(x: f64, xp: &[f64], fp: &[f64]) -> Option<f64> {
    if xp.is_empty() || xp.len() != fp.len() {
        return None;
    }

    if x <= xp[0] {
        return Some(fp[0]);
    }

    for i in 1..xp.len() {
        if x <= xp[i] {
            return Some(segment(x, xp[i - 1], xp[i], fp[i - 1], fp[i]));
        }
    }

    fp.last().copied()
}

/// lin_interp_extrap behaves like lin_interp but continues the slope of the last segment for
/// x beyond the last data point. The extrapolated value never drops below the last value of fp.
pub fn lin_interp_extrap(x: f64, xp: &[f64], fp: &[f64]) -> Option<f64> {
    let n = xp.len();
    if n < 2 || x <= xp[n - 1] {
        return lin_interp(x, xp, fp);
    }

    let extrap = segment(x, xp[n - 2], xp[n - 1], fp[n - 2], fp[n - 1]);
    Some(extrap.max(fp[n - 1]))
}

fn segment(x: f64, x0: f64, x1: f64, f0: f64, f1: f64) -> f64 {
    if x1 - x0 == 0.0 {
        return f1;
    }
    f0 + (x - x0) * (f1 - f0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn argsort_is_stable_for_ties() {
        let x = [3.0, 1.0, 3.0, 0.5];
        assert_eq!(argsort(&x, SortOrder::Ascending), vec![3, 1, 0, 2]);
        assert_eq!(argsort(&x, SortOrder::Descending), vec![0, 2, 1, 3]);
    }

    #[test]
    fn lin_interp_clamps_outside_range() {
        let xp = [0.0, 0.5, 1.0];
        let fp = [0.0, 1.0, 3.0];
        assert_abs_diff_eq!(lin_interp(-1.0, &xp, &fp).unwrap(), 0.0);
        assert_abs_diff_eq!(lin_interp(0.25, &xp, &fp).unwrap(), 0.5);
        assert_abs_diff_eq!(lin_interp(0.75, &xp, &fp).unwrap(), 2.0);
        assert_abs_diff_eq!(lin_interp(2.0, &xp, &fp).unwrap(), 3.0);
        assert!(lin_interp(0.5, &[], &[]).is_none());
    }

    #[test]
    fn lin_interp_extrap_continues_last_slope() {
        let xp = [0.0, 0.5, 0.8];
        let fp = [0.0, 0.4, 1.0];
        assert_abs_diff_eq!(lin_interp_extrap(1.0, &xp, &fp).unwrap(), 1.4, epsilon = 1e-9);
        // a falling last segment is not extrapolated below its end value
        let fp_down = [0.0, 1.0, 0.8];
        assert_abs_diff_eq!(lin_interp_extrap(1.0, &xp, &fp_down).unwrap(), 0.8);
        // single point falls back to clamping
        assert_abs_diff_eq!(lin_interp_extrap(1.0, &[0.5], &[0.7]).unwrap(), 0.7);
    }
}
