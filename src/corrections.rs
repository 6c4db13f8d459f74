//! One-off peak-date overrides for species-years where the automatic
//! detector lands on the wrong sample, kept as data rather than re-derived.
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::{Deserialize, Serialize};

use crate::bloom::DetectedBloom;
use crate::resample::Resolution;

/// A manual override of one bloom's peak date for a taxon-year at one
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakCorrection {
    pub taxon: String,
    pub year: i32,
    pub resolution: Resolution,
    pub peak_date: NaiveDate,
}

impl PeakCorrection {
    fn corrected_time(&self) -> NaiveDateTime {
        // Noon keeps the corrected peak inside the intended day at every
        // resolution's grid alignment.
        self.peak_date.and_hms_opt(12, 0, 0).unwrap()
    }
}

/// The known species-year fixes carried over from the published analysis.
pub fn builtin_corrections() -> Vec<PeakCorrection> {
    [
        ("Skeletonema spp.", 2018, Resolution::Weekly, (2018, 7, 30)),
        ("Guinardia delicatula", 2018, Resolution::Satellite, (2018, 4, 19)),
        ("Thalassiosira spp.", 2019, Resolution::Weekly, (2019, 2, 11)),
        ("Dactyliosolen fragilissimus", 2019, Resolution::Daily, (2019, 8, 2)),
    ]
    .into_iter()
    .map(|(taxon, year, resolution, (y, m, d))| PeakCorrection {
        taxon: taxon.to_string(),
        year,
        resolution,
        peak_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
    })
    .collect()
}

/// Re-point the peak timestamps of `blooms` according to the corrections
/// matching `taxon` and `resolution`.
///
/// A correction moves the peak of the bloom whose interval contains the
/// corrected date; if no bloom contains it, the bloom with the nearest peak
/// in the same year is adjusted. Corrections never add or remove blooms.
///
/// Returns the number of corrections applied.
pub fn apply_corrections(
    taxon: &str,
    resolution: Resolution,
    blooms: &mut [DetectedBloom],
    corrections: &[PeakCorrection],
) -> usize {
    let mut applied = 0;
    for correction in corrections
        .iter()
        .filter(|c| c.taxon == taxon && c.resolution == resolution)
    {
        let target = correction.corrected_time();

        let chosen = blooms
            .iter()
            .position(|b| b.contains(target))
            .or_else(|| {
                blooms
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.year() == correction.year)
                    .min_by_key(|(_, b)| (b.peak_time - target).num_seconds().abs())
                    .map(|(i, _)| i)
            });

        if let Some(bloom) = chosen.map(|i| &mut blooms[i]) {
            info!(
                "correcting {} {} peak {} -> {}",
                taxon, resolution, bloom.peak_time, target
            );
            bloom.peak_time = target;
            applied += 1;
        }
    }
    applied
}
