//! Polygon intersection and union with defensive acceptance rules.
//!
//! A coarse `intersects` test can report true for shapes that share
//! only a boundary, and n-ary unions can come back empty or smaller
//! than their inputs under numeric stress. The operations here encode
//! the acceptance rules the coverage calculator depends on: an
//! intersection counts only with positive area, and a union is only
//! accepted when it did not shrink.

use geo::{BooleanOps, Intersects, MultiPolygon, Polygon, unary_union};

use crate::GeometryError;
use crate::primitives::multi_area_m2;

/// Absolute slack, in square meters, granted to area comparisons to
/// absorb floating-point slop.
const AREA_SLOP_M2: f64 = 1e-6;

/// Cheap boolean overlap test, used as a pre-filter before the more
/// expensive [`intersection`].
#[must_use]
pub fn intersects(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    a.intersects(b)
}

/// Computes the geometric intersection of two polygons.
///
/// Returns `Some` only for a result with at least one non-empty ring
/// and positive, finite area. Boundary-only contact (a zero-area
/// intersection) yields `None`: it contributes nothing to coverage,
/// and is not an error.
#[must_use]
pub fn intersection(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<MultiPolygon<f64>> {
    let result = a.intersection(b);
    if result.0.iter().all(|part| part.exterior().0.is_empty()) {
        return None;
    }
    let area = multi_area_m2(&result);
    if area.is_finite() && area > 0.0 {
        Some(result)
    } else {
        None
    }
}

/// Unions one or more possibly-overlapping intersection pieces.
///
/// Tries a single batched union first. If that comes back empty,
/// non-finite, or smaller than the largest input piece, falls back to
/// a left-to-right fold where each step's result is accepted only if
/// its area did not shrink below the accumulator's.
///
/// A single-element slice is returned unchanged. Callers must not pass
/// an empty slice.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateResult`] if called with zero
/// pieces or if no strategy produced a result with positive area.
pub fn union_pieces(pieces: &[MultiPolygon<f64>]) -> Result<MultiPolygon<f64>, GeometryError> {
    let Some(first) = pieces.first() else {
        return Err(GeometryError::degenerate("union of zero pieces"));
    };
    if pieces.len() == 1 {
        return Ok(first.clone());
    }

    let largest_piece = pieces
        .iter()
        .map(multi_area_m2)
        .fold(0.0_f64, f64::max);

    let batched = unary_union(pieces.iter());
    let batched_area = multi_area_m2(&batched);
    if batched_area.is_finite() && batched_area + AREA_SLOP_M2 >= largest_piece && batched_area > 0.0
    {
        return Ok(batched);
    }
    log::warn!(
        "Batched union of {} pieces came back degenerate (area {batched_area}, largest piece {largest_piece}); falling back to incremental union",
        pieces.len()
    );

    let (accumulator, accumulator_area) = incremental_union(first, &pieces[1..]);
    if accumulator_area.is_finite() && accumulator_area > 0.0 {
        Ok(accumulator)
    } else {
        Err(GeometryError::degenerate(
            "no union strategy produced a result with positive area",
        ))
    }
}

/// Left-to-right union fold where each step's result is accepted only
/// if its area did not shrink below the accumulator's.
fn incremental_union(
    first: &MultiPolygon<f64>,
    rest: &[MultiPolygon<f64>],
) -> (MultiPolygon<f64>, f64) {
    let mut accumulator = first.clone();
    let mut accumulator_area = multi_area_m2(&accumulator);
    for piece in rest {
        let candidate = accumulator.union(piece);
        (accumulator, accumulator_area) = merge_step(accumulator, accumulator_area, candidate);
    }
    (accumulator, accumulator_area)
}

/// One guarded step of the incremental fold: the candidate replaces
/// the accumulator only if its area is finite and did not shrink.
fn merge_step(
    accumulator: MultiPolygon<f64>,
    accumulator_area: f64,
    candidate: MultiPolygon<f64>,
) -> (MultiPolygon<f64>, f64) {
    let candidate_area = multi_area_m2(&candidate);
    if candidate_area.is_finite() && candidate_area + AREA_SLOP_M2 >= accumulator_area {
        (candidate, candidate_area)
    } else {
        log::warn!(
            "Incremental union step shrank the accumulator ({accumulator_area} -> {candidate_area}); keeping previous accumulator"
        );
        (accumulator, accumulator_area)
    }
}

#[cfg(test)]
mod tests {
    use geo::LineString;

    use super::*;
    use crate::primitives::area_m2;

    fn square(west: f64, south: f64, side_deg: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (west, south),
                (west + side_deg, south),
                (west + side_deg, south + side_deg),
                (west, south + side_deg),
                (west, south),
            ]),
            Vec::new(),
        )
    }

    #[test]
    fn overlapping_squares_intersect_with_positive_area() {
        let a = square(13.40, 52.50, 0.01);
        let b = square(13.405, 52.505, 0.01);
        assert!(intersects(&a, &b));
        let piece = intersection(&a, &b).unwrap();
        assert!(multi_area_m2(&piece) > 0.0);
    }

    #[test]
    fn boundary_contact_is_not_coverage() {
        // Shares an edge only; the coarse test may say true, but the
        // zero-area intersection must be rejected.
        let a = square(13.40, 52.50, 0.01);
        let b = square(13.41, 52.50, 0.01);
        assert!(intersection(&a, &b).is_none());
    }

    #[test]
    fn disjoint_squares_do_not_intersect() {
        let a = square(13.40, 52.50, 0.01);
        let b = square(13.45, 52.55, 0.01);
        assert!(!intersects(&a, &b));
        assert!(intersection(&a, &b).is_none());
    }

    #[test]
    fn union_deduplicates_overlap() {
        let a = MultiPolygon(vec![square(13.40, 52.50, 0.01)]);
        let b = MultiPolygon(vec![square(13.405, 52.505, 0.01)]);
        let sum = multi_area_m2(&a) + multi_area_m2(&b);
        let union = union_pieces(&[a.clone(), b]).unwrap();
        let union_area = multi_area_m2(&union);
        assert!(union_area < sum, "union {union_area} not below naive sum {sum}");
        assert!(union_area > multi_area_m2(&a));
    }

    #[test]
    fn union_of_identical_pieces_matches_single_area() {
        let a = MultiPolygon(vec![square(13.40, 52.50, 0.01)]);
        let single = multi_area_m2(&a);
        let union = union_pieces(&[a.clone(), a]).unwrap();
        assert!((multi_area_m2(&union) - single).abs() / single < 1e-6);
    }

    #[test]
    fn union_of_disjoint_pieces_sums_areas() {
        let a = MultiPolygon(vec![square(13.40, 52.50, 0.01)]);
        let b = MultiPolygon(vec![square(13.45, 52.55, 0.01)]);
        let sum = multi_area_m2(&a) + multi_area_m2(&b);
        let union = union_pieces(&[a, b]).unwrap();
        assert!((multi_area_m2(&union) - sum).abs() / sum < 1e-6);
    }

    #[test]
    fn single_piece_union_is_a_no_op() {
        let a = MultiPolygon(vec![square(13.40, 52.50, 0.01)]);
        let union = union_pieces(std::slice::from_ref(&a)).unwrap();
        let expected = area_m2(&a.0[0]).unwrap();
        assert!((multi_area_m2(&union) - expected).abs() < AREA_SLOP_M2);
    }

    #[test]
    fn incremental_union_of_disjoint_pieces_sums_areas() {
        let a = MultiPolygon(vec![square(13.40, 52.50, 0.01)]);
        let b = MultiPolygon(vec![square(13.45, 52.55, 0.01)]);
        let sum = multi_area_m2(&a) + multi_area_m2(&b);
        let (_, area) = incremental_union(&a, std::slice::from_ref(&b));
        assert!((area - sum).abs() / sum < 1e-6);
    }

    #[test]
    fn shrinking_union_step_keeps_the_previous_accumulator() {
        let accumulator = MultiPolygon(vec![square(13.40, 52.50, 0.01)]);
        let accumulator_area = multi_area_m2(&accumulator);
        // An empty candidate has area 0, strictly below the accumulator.
        let degenerate = MultiPolygon(Vec::new());

        let (kept, kept_area) = merge_step(accumulator, accumulator_area, degenerate);
        assert!((kept_area - accumulator_area).abs() < AREA_SLOP_M2);
        assert!((multi_area_m2(&kept) - accumulator_area).abs() < AREA_SLOP_M2);
    }

    #[test]
    fn growing_union_step_replaces_the_accumulator() {
        let accumulator = MultiPolygon(vec![square(13.40, 52.50, 0.01)]);
        let accumulator_area = multi_area_m2(&accumulator);
        let grown = MultiPolygon(vec![square(13.40, 52.50, 0.02)]);
        let grown_area = multi_area_m2(&grown);

        let (kept, kept_area) = merge_step(accumulator, accumulator_area, grown);
        assert!(kept_area > accumulator_area);
        assert!((multi_area_m2(&kept) - grown_area).abs() < AREA_SLOP_M2);
    }

    #[test]
    fn union_of_zero_pieces_is_rejected() {
        let err = union_pieces(&[]).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateResult { .. }));
    }
}
