//! Assigns measurement events to selections.

use rayon::prelude::*;
use tofe_core::EventPoint;

use crate::selection::{AxesLimits, Selection};

/// Events caught by one selection, in measurement order.
#[derive(Debug, Clone)]
pub struct ClassifiedCut {
    /// Index of the selection in the input slice.
    pub selection_index: usize,
    /// Matching events.
    pub events: Vec<EventPoint>,
}

/// Tests every event against every selection.
///
/// Selections are checked in parallel; an event matching several
/// selections is recorded in each of them. The union bounding box of all
/// selections rejects the bulk of the events before any polygon test.
/// Output order follows the selection order and every selection gets an
/// entry, empty ones included.
#[must_use]
pub fn classify(events: &[EventPoint], selections: &[Selection]) -> Vec<ClassifiedCut> {
    let union = union_limits(selections);
    let candidates: Vec<EventPoint> = match union {
        None => Vec::new(),
        #[allow(clippy::cast_precision_loss)]
        Some(limits) => events
            .iter()
            .filter(|e| limits.contains(e.tof as f64, e.energy as f64))
            .copied()
            .collect(),
    };

    selections
        .par_iter()
        .enumerate()
        .map(|(selection_index, selection)| {
            #[allow(clippy::cast_precision_loss)]
            let events = candidates
                .iter()
                .filter(|e| selection.contains(e.tof as f64, e.energy as f64))
                .copied()
                .collect();
            ClassifiedCut {
                selection_index,
                events,
            }
        })
        .collect()
}

fn union_limits(selections: &[Selection]) -> Option<AxesLimits> {
    let mut iter = selections.iter().filter_map(Selection::limits);
    let first = iter.next()?;
    Some(iter.fold(first, |acc, l| AxesLimits {
        x_min: acc.x_min.min(l.x_min),
        x_max: acc.x_max.max(l.x_max),
        y_min: acc.y_min.min(l.y_min),
        y_max: acc.y_max.max(l.y_max),
    }))
}
