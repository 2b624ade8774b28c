// roughness.rs — DAN / DON road roughness
//
// DAN is the decayed RMS of the accelerometer's deviation from its own
// low-passed baseline; DON is the same on the gyroscope. Both are averaged
// over fixed sample blocks (RoadDAN / RoadDON) and each block boundary with a
// real GPS position becomes a geotagged segment.

use serde::{Deserialize, Serialize};

use crate::geohash::{self, SEGMENT_PRECISION};
use crate::smoothing::{BlockAverager, DecayedRms};
use crate::types::{GpsFix, Vec3};

/// DON decay is not tunable.
pub const DON_DECAY: f64 = 0.95;

/// One geotagged roughness block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadDanSegment {
    pub geohash8: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "roadDAN")]
    pub road_dan: f64,
    #[serde(rename = "roadDON")]
    pub road_don: f64,
    #[serde(rename = "speedMph")]
    pub speed_mph: f64,
    pub timestamp: f64,
}

impl RoadDanSegment {
    pub fn at_fix(fix: &GpsFix, road_dan: f64, road_don: f64) -> Self {
        Self {
            geohash8: geohash::encode(fix.lat, fix.lng, SEGMENT_PRECISION),
            lat: fix.lat,
            lng: fix.lng,
            road_dan,
            road_don,
            speed_mph: fix.mph,
            timestamp: fix.timestamp,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RoughnessSample {
    pub dan: f64,
    pub don: f64,
    /// Held block averages.
    pub road_dan: f64,
    pub road_don: f64,
    /// Set only on block boundaries that had a valid fix.
    pub segment: Option<RoadDanSegment>,
}

#[derive(Clone, Debug)]
pub struct RoughnessEstimator {
    dan: DecayedRms,
    don: DecayedRms,
    road_dan: BlockAverager,
    road_don: BlockAverager,
    boundaries: usize,
    boundaries_without_fix: usize,
}

impl RoughnessEstimator {
    pub fn new(dan_decay: f64, segment_len: usize) -> Self {
        Self {
            dan: DecayedRms::new(dan_decay),
            don: DecayedRms::new(DON_DECAY),
            road_dan: BlockAverager::new(segment_len),
            road_don: BlockAverager::new(segment_len),
            boundaries: 0,
            boundaries_without_fix: 0,
        }
    }

    /// Advance one sample. `fix` is the interpolated GPS fix when it is valid.
    pub fn update(
        &mut self,
        accel: &Vec3,
        accel_filtered: &Vec3,
        gyro: &Vec3,
        gyro_filtered: &Vec3,
        fix: Option<&GpsFix>,
    ) -> RoughnessSample {
        let dan = self.dan.update((accel - accel_filtered).norm_squared());
        let don = self.don.update((gyro - gyro_filtered).norm_squared());

        let dan_block = self.road_dan.push(dan);
        let don_block = self.road_don.push(don);

        let segment = match (dan_block, don_block) {
            (Some(road_dan), Some(road_don)) => {
                self.boundaries += 1;
                match fix {
                    Some(fix) => Some(RoadDanSegment::at_fix(fix, road_dan, road_don)),
                    None => {
                        self.boundaries_without_fix += 1;
                        None
                    }
                }
            }
            _ => None,
        };

        RoughnessSample {
            dan,
            don,
            road_dan: self.road_dan.held(),
            road_don: self.road_don.held(),
            segment,
        }
    }

    /// Completed blocks so far, and how many of them had no fix.
    pub fn boundary_counts(&self) -> (usize, usize) {
        (self.boundaries, self.boundaries_without_fix)
    }
}
