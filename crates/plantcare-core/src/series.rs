//! Bounded soil moisture history for the dashboard chart.

use std::collections::VecDeque;

use plantcare_types::MoisturePoint;

/// Default number of points kept per session.
pub const DEFAULT_CAPACITY: usize = 20;

/// Append-only ring buffer of moisture points.
///
/// Once `capacity` points are stored, each new point evicts the oldest one.
#[derive(Debug, Clone, PartialEq)]
pub struct MoistureSeries {
    points: VecDeque<MoisturePoint>,
    capacity: usize,
}

impl Default for MoistureSeries {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MoistureSeries {
    /// Create an empty series. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: MoisturePoint) {
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent point.
    pub fn latest(&self) -> Option<&MoisturePoint> {
        self.points.back()
    }

    /// Points oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &MoisturePoint> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<MoisturePoint> {
        self.points.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::{Duration, OffsetDateTime};

    fn point(offset_secs: i64, value: u8) -> MoisturePoint {
        MoisturePoint {
            timestamp: OffsetDateTime::UNIX_EPOCH + Duration::seconds(offset_secs),
            value,
        }
    }

    #[test]
    fn test_push_and_latest() {
        let mut series = MoistureSeries::new(3);
        assert!(series.is_empty());
        assert!(series.latest().is_none());

        series.push(point(0, 50));
        series.push(point(2, 48));
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().unwrap().value, 48);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut series = MoistureSeries::new(3);
        for (i, v) in [10, 20, 30, 40, 50].into_iter().enumerate() {
            series.push(point(i as i64, v));
        }
        let values: Vec<u8> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![30, 40, 50]);
    }

    #[test]
    fn test_clear() {
        let mut series = MoistureSeries::default();
        series.push(point(0, 1));
        series.clear();
        assert!(series.is_empty());
        assert_eq!(series.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut series = MoistureSeries::new(0);
        series.push(point(0, 1));
        series.push(point(1, 2));
        assert_eq!(series.capacity(), 1);
        assert_eq!(series.to_vec(), vec![point(1, 2)]);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity_and_keeps_newest(
            capacity in 1usize..50,
            values in proptest::collection::vec(0u8..=100, 0..200),
        ) {
            let mut series = MoistureSeries::new(capacity);
            for (i, v) in values.iter().enumerate() {
                series.push(point(i as i64, *v));
            }
            prop_assert!(series.len() <= capacity);

            let expected: Vec<u8> = values
                .iter()
                .skip(values.len().saturating_sub(capacity))
                .copied()
                .collect();
            let actual: Vec<u8> = series.iter().map(|p| p.value).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
