use nalgebra::Point2;

/// Merges fragments of one cone that were split into several blobs.
///
/// `points` must be sorted nearest-first (descending y). Walking adjacent
/// pairs, the first of a pair is dropped when both its x and y distance to
/// the next point are below `range`, and the pair at the same position is
/// examined again. Only consecutive points in the sort order are merged, so
/// two fragments separated by an unrelated cone in y order both survive.
pub fn dedup_adjacent(mut points: Vec<Point2<f64>>, range: f64) -> Vec<Point2<f64>> {
    let mut i = 0;
    while i + 1 < points.len() {
        let dx = (points[i].x - points[i + 1].x).abs();
        let dy = (points[i].y - points[i + 1].y).abs();
        if dx < range && dy < range {
            // index stays put, the next point moved into slot i
            points.remove(i);
        } else {
            i += 1;
        }
    }

    points
}
