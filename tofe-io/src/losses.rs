//! Element losses: how each element's event count develops across the
//! course of a measurement.
//!
//! The reference cut's event numbers divide the measurement into equal
//! slices; counting every other cut's events per slice shows whether an
//! element is depleting under the beam.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cut::{delete_cut_files, CutFile, CutName};
use crate::error::Result;

/// Counts each cut's events per reference slice.
///
/// Returns one entry per checked cut, keyed like the spectra
/// (`<element>.<suffix>.<n>`), each holding `splits` counts. The
/// reference cut itself is excluded; its counts would be the slice sizes
/// by construction.
#[must_use]
pub fn element_losses(
    reference: &CutFile,
    cuts: &[CutFile],
    splits: u32,
) -> BTreeMap<String, Vec<usize>> {
    let reference_key = reference.name.as_ref().map(CutName::key);
    cuts.iter()
        .filter_map(|cut| {
            let key = cut.name.as_ref()?.key();
            if Some(&key) == reference_key.as_ref() {
                return None;
            }
            let counts = cut
                .split_by_reference(reference, splits)
                .iter()
                .map(Vec::len)
                .collect();
            Some((key, counts))
        })
        .collect()
}

/// Writes every split of every checked cut as its own cut file into
/// `directory`, clearing previous `.cut` files there first.
///
/// Split files are marked as element-loss products and named with the
/// five-part convention, the split number last.
///
/// # Errors
///
/// Propagates filesystem errors.
pub fn save_split_cuts(
    directory: &Path,
    measurement: &str,
    reference: &CutFile,
    cuts: &[CutFile],
    splits: u32,
) -> Result<Vec<PathBuf>> {
    delete_cut_files(directory)?;
    let reference_key = reference.name.as_ref().map(CutName::key);
    let mut written = Vec::new();
    for cut in cuts {
        if cut.name.as_ref().map(CutName::key) == reference_key {
            continue;
        }
        for (index, events) in cut
            .split_by_reference(reference, splits)
            .into_iter()
            .enumerate()
        {
            if events.is_empty() {
                continue;
            }
            let mut split_cut = CutFile {
                is_elem_loss: true,
                split_count: splits,
                events,
                name: None,
                ..cut.clone()
            };
            #[allow(clippy::cast_possible_truncation)]
            let split_number = index as u32;
            written.push(split_cut.save(directory, measurement, Some(split_number))?);
        }
    }
    Ok(written)
}
