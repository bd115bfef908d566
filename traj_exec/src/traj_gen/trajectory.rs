//! # Trajectory
//!
//! The output of trajectory generation, a time-ordered sequence of samples
//! that a trajectory follower walks through as time advances.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single sample of a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajSample {
    /// Position of the robot.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading of the robot, counter-clockwise from +X.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Signed curvature of the path, positive turning counter-clockwise.
    ///
    /// Units: 1/meters
    pub curv_m: f64,

    /// Linear velocity of the robot.
    ///
    /// Units: meters/second
    pub vel_ms: f64,

    /// Angular velocity of the robot, positive counter-clockwise.
    ///
    /// Units: radians/second
    pub ang_vel_rads: f64,

    /// Time since the start of the trajectory.
    ///
    /// Units: seconds
    pub time_s: f64,
}

/// A flat version of [`TrajSample`] suitable for CSV archives.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TrajRecord {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub curv_m: f64,
    pub vel_ms: f64,
    pub ang_vel_rads: f64,
}

/// A time-parameterised trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    samples: Vec<TrajSample>,

    /// Index of the sample at each input waypoint
    waypoint_indices: Vec<usize>,
}

/// Walks through a trajectory as time advances.
///
/// The cursor only ever moves forwards, so a control loop calling `advance`
/// each cycle does constant work on average.
#[derive(Debug, Clone)]
pub struct TrajCursor<'a> {
    traj: &'a Trajectory,
    index: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a trajectory from its samples.
    ///
    /// Samples must be in time order, this is only checked in debug builds.
    pub fn new(samples: Vec<TrajSample>, waypoint_indices: Vec<usize>) -> Self {
        debug_assert!(samples.windows(2).all(|s| s[1].time_s >= s[0].time_s));
        debug_assert!(waypoint_indices.iter().all(|&i| i < samples.len()));

        Self {
            samples,
            waypoint_indices,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrajSample> {
        self.samples.get(index)
    }

    pub fn first(&self) -> Option<&TrajSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TrajSample> {
        self.samples.last()
    }

    pub fn samples(&self) -> &[TrajSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrajSample> {
        self.samples.iter()
    }

    /// Index of the sample at each of the waypoints used to build the
    /// trajectory.
    pub fn waypoint_indices(&self) -> &[usize] {
        &self.waypoint_indices
    }

    /// Total duration of the trajectory.
    ///
    /// Units: seconds
    pub fn duration_s(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.time_s)
    }

    /// Index of the first sample whose time is strictly after `elapsed_s`, or
    /// of the last sample once the trajectory has finished.
    ///
    /// Returns `None` for an empty trajectory.
    pub fn index_after(&self, elapsed_s: f64) -> Option<usize> {
        if self.samples.is_empty() {
            return None;
        }

        let index = self.samples.partition_point(|s| s.time_s <= elapsed_s);

        Some(index.min(self.samples.len() - 1))
    }

    /// The first sample whose time is strictly after `elapsed_s`, or the last
    /// sample once the trajectory has finished.
    pub fn next_after(&self, elapsed_s: f64) -> Option<&TrajSample> {
        self.index_after(elapsed_s).map(|i| &self.samples[i])
    }

    /// The sample closest in time to `elapsed_s`.
    pub fn nearest(&self, elapsed_s: f64) -> Option<&TrajSample> {
        let after = self.samples.partition_point(|s| s.time_s <= elapsed_s);

        let candidates = [after.checked_sub(1), Some(after)];

        candidates
            .iter()
            .filter_map(|&i| i.and_then(|i| self.samples.get(i)))
            .min_by(|a, b| {
                let da = (a.time_s - elapsed_s).abs();
                let db = (b.time_s - elapsed_s).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Get a cursor at the start of the trajectory.
    pub fn cursor(&self) -> TrajCursor<'_> {
        TrajCursor {
            traj: self,
            index: 0,
        }
    }

    /// The samples as flat records, suitable for archiving.
    pub fn records(&self) -> impl Iterator<Item = TrajRecord> + '_ {
        self.samples.iter().map(TrajRecord::from)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TrajSample;
    type IntoIter = std::slice::Iter<'a, TrajSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl From<&TrajSample> for TrajRecord {
    fn from(s: &TrajSample) -> Self {
        Self {
            time_s: s.time_s,
            x_m: s.position_m.x,
            y_m: s.position_m.y,
            heading_rad: s.heading_rad,
            curv_m: s.curv_m,
            vel_ms: s.vel_ms,
            ang_vel_rads: s.ang_vel_rads,
        }
    }
}

impl<'a> TrajCursor<'a> {
    /// Advance the cursor to the first sample after `elapsed_s` and return
    /// it. Once the trajectory is finished the last sample is returned.
    ///
    /// Returns `None` for an empty trajectory.
    pub fn advance(&mut self, elapsed_s: f64) -> Option<&'a TrajSample> {
        let samples = self.traj.samples();

        while self.index + 1 < samples.len() && samples[self.index].time_s <= elapsed_s {
            self.index += 1;
        }

        samples.get(self.index)
    }

    /// Index of the current target sample.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` once the elapsed time has passed the final sample.
    pub fn is_finished(&self, elapsed_s: f64) -> bool {
        elapsed_s >= self.traj.duration_s()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(time_s: f64) -> TrajSample {
        TrajSample {
            position_m: Vector2::new(time_s, 0.0),
            heading_rad: 0.0,
            curv_m: 0.0,
            vel_ms: 1.0,
            ang_vel_rads: 0.0,
            time_s,
        }
    }

    fn traj() -> Trajectory {
        Trajectory::new(
            vec![sample(0.0), sample(0.5), sample(1.0), sample(2.0)],
            vec![0, 3],
        )
    }

    #[test]
    fn test_queries() {
        let traj = traj();

        assert_eq!(traj.len(), 4);
        assert_eq!(traj.duration_s(), 2.0);
        assert_eq!(traj.waypoint_indices(), &[0, 3]);

        assert_eq!(traj.index_after(-1.0), Some(0));
        assert_eq!(traj.index_after(0.0), Some(1));
        assert_eq!(traj.index_after(0.7), Some(2));
        assert_eq!(traj.index_after(1.0), Some(3));
        assert_eq!(traj.index_after(5.0), Some(3));
        assert_eq!(traj.next_after(0.7).unwrap().time_s, 1.0);

        assert_eq!(traj.nearest(0.7).unwrap().time_s, 0.5);
        assert_eq!(traj.nearest(0.8).unwrap().time_s, 1.0);
        assert_eq!(traj.nearest(-3.0).unwrap().time_s, 0.0);
        assert_eq!(traj.nearest(9.0).unwrap().time_s, 2.0);

        let empty = Trajectory::new(vec![], vec![]);
        assert!(empty.next_after(0.0).is_none());
        assert!(empty.nearest(0.0).is_none());
        assert_eq!(empty.duration_s(), 0.0);
    }

    #[test]
    fn test_cursor() {
        let traj = traj();
        let mut cursor = traj.cursor();

        let mut elapsed_s = 0.0;
        let mut seen = vec![];
        while !cursor.is_finished(elapsed_s) {
            let target = cursor.advance(elapsed_s).unwrap();
            assert!(target.time_s > elapsed_s);
            assert_eq!(target, traj.next_after(elapsed_s).unwrap());
            seen.push(cursor.index());
            elapsed_s += 0.1;
        }

        assert!(seen.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(*seen.last().unwrap(), 3);
        assert_eq!(cursor.advance(10.0).unwrap().time_s, 2.0);
    }

    #[test]
    fn test_records() {
        let traj = traj();
        let records: Vec<TrajRecord> = traj.records().collect();

        assert_eq!(records.len(), traj.len());
        assert_eq!(records[2].x_m, 1.0);
        assert_eq!(records[2].time_s, 1.0);
    }
}
