//! Cumulative edit aggregation for the gamelogs analytics endpoint.

use crate::models::{CumulativeEditPoint, EditDayCount};

/// Turns per-day edit counts into a running total per day.
///
/// For each input date d, the output carries the sum of counts for every
/// input date <= d. Output is ordered by date ascending. Days absent from
/// the input stay absent — no interpolation across gaps.
pub fn accumulate_edits(mut day_counts: Vec<EditDayCount>) -> Vec<CumulativeEditPoint> {
    day_counts.sort_by_key(|d| d.date);

    let mut running_total = 0;
    day_counts
        .into_iter()
        .map(|day| {
            running_total += day.num;
            CumulativeEditPoint {
                date: day.date,
                accumulate_edits: running_total,
            }
        })
        .collect()
}
