//! Raw listmode events in (ToF channel, energy channel) space.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single detector coincidence event.
///
/// Channels are raw ADC integers; `event_number` is the running index the
/// event had in its measurement file, which element-loss splitting keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventPoint {
    /// Time-of-flight channel.
    pub tof: i64,
    /// Energy channel.
    pub energy: i64,
    /// Running event number within the measurement.
    pub event_number: i64,
}

impl EventPoint {
    /// Creates a new event point.
    #[inline]
    #[must_use]
    pub fn new(tof: i64, energy: i64, event_number: i64) -> Self {
        Self {
            tof,
            energy,
            event_number,
        }
    }
}

/// Row types whose numeric columns a histogram can be built over.
pub trait Columned {
    /// Returns column `index` as a float, or `None` when the row has no
    /// such column.
    fn column(&self, index: usize) -> Option<f64>;
}

impl Columned for EventPoint {
    #[allow(clippy::cast_precision_loss)]
    fn column(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.tof as f64),
            1 => Some(self.energy as f64),
            2 => Some(self.event_number as f64),
            _ => None,
        }
    }
}

impl Columned for (f64, f64) {
    fn column(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.0),
            1 => Some(self.1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_columns() {
        let e = EventPoint::new(120, 340, 7);
        assert_eq!(e.column(0), Some(120.0));
        assert_eq!(e.column(1), Some(340.0));
        assert_eq!(e.column(2), Some(7.0));
        assert_eq!(e.column(3), None);
    }
}
