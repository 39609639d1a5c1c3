use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

use crate::Point2D;

/// Corners of the unit square in marker-local order (TL, TR, BR, BL).
pub const UNIT_SQUARE: [Point2D; 4] = [
    Point2::new(0.0, 0.0),
    Point2::new(1.0, 0.0),
    Point2::new(1.0, 1.0),
    Point2::new(0.0, 1.0),
];

/// Planar projective transform with `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    /// Map `p` through the homography. Returns `None` for points sent to infinity.
    #[inline]
    pub fn apply(&self, p: Point2D) -> Option<Point2D> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if w.abs() < 1e-12 {
            return None;
        }
        Some(Point2::new(v[0] / w, v[1] / w))
    }
}

/// Similarity transform moving the centroid to the origin with mean radius sqrt(2).
fn normalize_quad(pts: &[Point2D; 4]) -> ([Point2D; 4], Matrix3<f64>) {
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let out = pts.map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)));
    (out, t)
}

/// Compute H such that `dst ~ H * src` from four point correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// when three or more points are collinear (the linear system is singular).
pub fn homography_from_4pt(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], h33 = 1.
    let (src_n, t_src) = normalize_quad(src);
    let (dst_n, t_dst) = normalize_quad(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (k, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    if x.iter().any(|c| !c.is_finite()) {
        return None;
    }

    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);
    let h = t_dst.try_inverse()? * hn * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_close(a: Point2D, b: Point2D, tol: f64) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = tol);
        assert_abs_diff_eq!(a.y, b.y, epsilon = tol);
    }

    #[test]
    fn unit_square_to_quad_recovers_ground_truth() {
        let ground_truth = Homography::new(Matrix3::new(
            80.0, 6.0, 120.0, //
            -3.0, 95.0, 80.0, //
            0.09, -0.04, 1.0,
        ));
        let dst = UNIT_SQUARE.map(|p| ground_truth.apply(p).expect("finite"));

        let recovered = homography_from_4pt(&UNIT_SQUARE, &dst).expect("recoverable");
        for p in [
            Point2::new(-0.25, -0.25),
            Point2::new(0.5, 0.5),
            Point2::new(1.25, 1.1),
        ] {
            assert_close(
                recovered.apply(p).expect("finite"),
                ground_truth.apply(p).expect("finite"),
                1e-6,
            );
        }
    }

    #[test]
    fn collapsed_quad_is_rejected() {
        let dst = [Point2::new(3.0, 3.0); 4];
        assert!(homography_from_4pt(&UNIT_SQUARE, &dst).is_none());
    }
}
