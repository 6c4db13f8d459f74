//! Bridge short data outages before run-length bloom detection.
use chrono::Duration;
use log::debug;

use crate::series::TimeSeries;

/// Fill interior missing runs whose span between bounding observations does
/// not exceed `max_gap`: the first half of the run copies the observation
/// before it (forward fill), the second half the observation after it
/// (backward fill). Leading and trailing gaps have only one bound and are
/// never filled.
///
/// Returns the indices that were filled, in ascending order.
pub fn fill_short_gaps(series: &mut TimeSeries, max_gap: Duration) -> Vec<usize> {
    let n = series.len();
    let mut filled = Vec::new();
    let mut i = 0;

    while i < n {
        if series.values[i].is_finite() {
            i += 1;
            continue;
        }
        // Missing run [i, j)
        let mut j = i;
        while j < n && !series.values[j].is_finite() {
            j += 1;
        }
        let interior = i > 0 && j < n;
        if interior {
            let span = series.times[j] - series.times[i - 1];
            if span <= max_gap {
                let before = series.values[i - 1];
                let after = series.values[j];
                let run = j - i;
                for (offset, k) in (i..j).enumerate() {
                    series.values[k] = if offset < run.div_ceil(2) { before } else { after };
                    filled.push(k);
                }
                debug!(
                    "filled {} missing points spanning {} hours",
                    run,
                    span.num_hours()
                );
            }
        }
        i = j;
    }
    filled
}
