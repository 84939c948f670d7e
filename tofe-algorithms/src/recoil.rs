//! Builds box-shaped recoil concentration distributions from optimizer
//! gene vectors.

/// Smallest concentration a distribution point may carry; simulators
/// reject exact zeros inside the profile.
pub const MIN_CONCENTRATION: f64 = 0.0001;

/// Depth where every distribution is terminated, in nm.
pub const MAX_DEPTH_NM: f64 = 120.0;

/// Horizontal gap between a box edge and the drop after it, in nm.
const EDGE_GAP_NM: f64 = 0.01;

/// Expands a gene vector into recoil distribution points.
///
/// Two genes `[x1, y0]` make a single box: concentration `y0` from the
/// surface to depth `x1`, dropping to the floor value right after. Four
/// genes `[x1, y0, x2, y1]` make a two-step box with a second plateau of
/// height `y1` out to `x2`. Depth genes are sorted and separated by at
/// least the edge gap so the point list stays strictly increasing in
/// depth. Any other gene count returns `None`.
#[must_use]
pub fn form_box_recoil(genes: &[f64]) -> Option<Vec<(f64, f64)>> {
    match genes {
        [x1, y0] => {
            let x1 = x1.clamp(EDGE_GAP_NM, MAX_DEPTH_NM - 2.0 * EDGE_GAP_NM);
            Some(vec![
                (0.0, *y0),
                (x1, *y0),
                (x1 + EDGE_GAP_NM, MIN_CONCENTRATION),
                (MAX_DEPTH_NM, MIN_CONCENTRATION),
            ])
        }
        [x1, y0, x2, y1] => {
            let (mut x1, mut x2) = if x1 <= x2 { (*x1, *x2) } else { (*x2, *x1) };
            x2 = x2.clamp(3.0 * EDGE_GAP_NM, MAX_DEPTH_NM - 2.0 * EDGE_GAP_NM);
            x1 = x1.clamp(EDGE_GAP_NM, x2 - 2.0 * EDGE_GAP_NM);
            Some(vec![
                (0.0, *y0),
                (x1, *y0),
                (x1 + EDGE_GAP_NM, *y1),
                (x2, *y1),
                (x2 + EDGE_GAP_NM, MIN_CONCENTRATION),
                (MAX_DEPTH_NM, MIN_CONCENTRATION),
            ])
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strictly_increasing_depths(points: &[(f64, f64)]) -> bool {
        points.windows(2).all(|w| w[0].0 < w[1].0)
    }

    #[test]
    fn single_box_shape() {
        let points = form_box_recoil(&[40.0, 0.5]).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], (0.0, 0.5));
        assert_eq!(points[1], (40.0, 0.5));
        assert_eq!(points[3], (MAX_DEPTH_NM, MIN_CONCENTRATION));
        assert!(strictly_increasing_depths(&points));
    }

    #[test]
    fn two_step_box_orders_depths() {
        let points = form_box_recoil(&[80.0, 0.5, 30.0, 0.2]).unwrap();
        assert_eq!(points.len(), 6);
        assert!(strictly_increasing_depths(&points));
        // Depth genes arrive unordered; the shallower one becomes the
        // first edge.
        assert_eq!(points[1].0, 30.0);
        assert_eq!(points[3].0, 80.0);
    }

    #[test]
    fn depths_are_capped_at_the_profile_end() {
        let points = form_box_recoil(&[500.0, 0.3]).unwrap();
        assert!(strictly_increasing_depths(&points));
        assert!(points.iter().all(|p| p.0 <= MAX_DEPTH_NM));
    }

    #[test]
    fn unsupported_gene_counts() {
        assert!(form_box_recoil(&[1.0]).is_none());
        assert!(form_box_recoil(&[1.0, 2.0, 3.0]).is_none());
    }
}
