use crate::mass::Tolerance;
use crate::spectrum::Peak;

/// Observed peaks matched against one theoretical ion ladder
#[derive(Clone, Default, Debug, PartialEq)]
pub struct MatchResult {
    /// M/z of each matched peak
    pub mz: Vec<f64>,
    /// Intensity of each matched peak
    pub intensity: Vec<f64>,
    /// Index into the ion ladder that each peak was matched to
    pub ions: Vec<usize>,
    /// Absolute difference between theoretical and observed m/z for each match
    pub errors: Vec<f64>,
    /// Longest run of consecutive ions with at least one matched peak
    pub longest_run: usize,
}

impl MatchResult {
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    pub fn summed_intensity(&self) -> f64 {
        self.intensity.iter().sum()
    }
}

/// Running count of consecutive matched ions
#[derive(Default, Debug)]
struct Run {
    length: usize,
    longest: usize,
}

impl Run {
    /// Called when the ladder cursor leaves an ion's window
    fn advance(&mut self, matched: bool) {
        if matched {
            self.length += 1;
            self.longest = self.longest.max(self.length);
        } else {
            self.length = 0;
        }
    }
}

/// Match an increasing ion ladder against peaks sorted by ascending m/z.
///
/// A single pass over the peaks: the ladder cursor moves on to the next ion
/// when a peak lies above the current ion's window, so the sweep is
/// O(peaks + ions).
pub fn match_series(series: &[f64], peaks: &[Peak], tolerance: Tolerance) -> MatchResult {
    debug_assert!(peaks.windows(2).all(|w| w[0].mz <= w[1].mz));

    let mut result = MatchResult::default();
    if series.is_empty() {
        return result;
    }

    let mut idx = 0;
    let mut run = Run::default();
    let mut matched = false;
    let (mut lo, mut hi) = tolerance.bounds(series[idx]);

    for peak in peaks {
        if peak.mz > hi {
            if idx + 1 == series.len() {
                // No more ions, and every remaining peak is past the last window
                break;
            }
            run.advance(matched);
            matched = false;
            idx += 1;
            (lo, hi) = tolerance.bounds(series[idx]);
        }

        if peak.mz >= lo && peak.mz <= hi {
            result.mz.push(peak.mz);
            result.intensity.push(peak.intensity);
            result.ions.push(idx);
            result.errors.push((series[idx] - peak.mz).abs());
            matched = true;
        }
    }

    result.longest_run = run.longest;
    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn peaks(mz: &[f64]) -> Vec<Peak> {
        mz.iter()
            .map(|&mz| Peak {
                mz,
                intensity: mz * 2.0,
            })
            .collect()
    }

    #[test]
    fn longest_series() {
        let mut run = Run::default();
        run.advance(true);
        run.advance(true);
        run.advance(true);
        assert_eq!(run.length, 3);
        assert_eq!(run.longest, 3);

        run.advance(false);
        assert_eq!(run.length, 0);
        run.advance(true);
        assert_eq!(run.length, 1);
        assert_eq!(run.longest, 3);
    }

    #[test]
    fn empty_inputs() {
        let tol = Tolerance::new(0.5, 0.5);
        let r = match_series(&[100.0, 200.0], &[], tol);
        assert!(r.is_empty());
        assert_eq!(r.longest_run, 0);

        let r = match_series(&[], &peaks(&[100.0]), tol);
        assert!(r.is_empty());
        assert_eq!(r.longest_run, 0);
    }

    #[test]
    fn matches_within_window() {
        let tol = Tolerance::new(0.5, 0.25);
        let series = [100.0, 200.0, 300.0, 400.0];
        let spectrum = peaks(&[99.7, 99.8, 100.4, 150.0, 200.1, 299.0, 300.5, 450.0]);
        let r = match_series(&series, &spectrum, tol);

        assert_eq!(r.mz, vec![99.8, 100.4, 200.1, 300.5]);
        assert_eq!(r.ions, vec![0, 0, 1, 2]);
        assert_eq!(r.intensity, vec![199.6, 200.8, 400.2, 601.0]);
        assert_eq!(r.errors.len(), 4);
        assert!((r.errors[0] - 0.2).abs() < 1e-9);
        assert!((r.errors[2] - 0.1).abs() < 1e-9);
        assert!((r.summed_intensity() - 1401.6).abs() < 1e-9);

        // Windows 0 and 1 are left after a match, window 2 is left when 450.0
        // moves the cursor onto the last ion
        assert_eq!(r.longest_run, 3);
    }

    #[test]
    fn run_resets_on_unmatched_window() {
        let tol = Tolerance::new(0.1, 0.1);
        let series = [100.0, 200.0, 300.0, 400.0, 500.0];
        let spectrum = peaks(&[100.0, 150.0, 250.0, 300.0, 350.0, 400.0, 450.0, 550.0]);
        let r = match_series(&series, &spectrum, tol);
        assert_eq!(r.ions, vec![0, 2, 3]);
        assert_eq!(r.longest_run, 2);
    }

    #[test]
    fn cursor_advances_one_ion_per_peak() {
        let tol = Tolerance::new(0.1, 0.1);
        let series = [100.0, 101.0, 102.0];
        // 102.0 first moves the cursor from ion 0 to ion 1 only; it is not
        // inside ion 1's window, so it is not matched
        let r = match_series(&series, &peaks(&[102.0]), tol);
        assert!(r.is_empty());
    }

    #[test]
    fn last_window_is_not_counted() {
        let tol = Tolerance::new(0.1, 0.1);
        let r = match_series(&[100.0], &peaks(&[100.0, 100.05]), tol);
        assert_eq!(r.len(), 2);
        assert_eq!(r.longest_run, 0);
    }
}
