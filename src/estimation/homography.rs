//! Plane-to-plane homography estimation.
//!
//! Minimal samples are solved directly from the 8×8 system with `h33 = 1`;
//! larger sets go through the normalized DLT.

use glam::Vec2;
use log::debug;
use nalgebra as na;

use super::Correspondence;

/// Smallest triangle area, in squared pixels, a sample may span.
const MIN_TRIANGLE_AREA: f64 = 1.0;

/// Maps `p` through `h`. `None` when the point lands at infinity.
pub fn project(h: &na::Matrix3<f64>, p: Vec2) -> Option<Vec2> {
    let v = h * na::Vector3::new(p.x as f64, p.y as f64, 1.0);
    if v[2].abs() < 1e-12 {
        return None;
    }
    let out = Vec2::new((v[0] / v[2]) as f32, (v[1] / v[2]) as f32);
    out.is_finite().then_some(out)
}

fn triangle_area(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    let ab = (b - a).as_dvec2();
    let ac = (c - a).as_dvec2();
    (ab.perp_dot(ac) / 2.0).abs()
}

/// True when three of the points are (nearly) collinear.
fn has_collinear_triple(points: &[Vec2; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES
        .iter()
        .any(|&(i, j, k)| triangle_area(points[i], points[j], points[k]) < MIN_TRIANGLE_AREA)
}

/// Exact homography through four correspondences.
pub fn solve_four_point(sample: &[Correspondence]) -> Option<na::Matrix3<f64>> {
    if sample.len() != 4 {
        return None;
    }
    let src = [sample[0].model, sample[1].model, sample[2].model, sample[3].model];
    let dst = [sample[0].frame, sample[1].frame, sample[2].frame, sample[3].frame];
    if has_collinear_triple(&src) || has_collinear_triple(&dst) {
        return None;
    }

    let mut a = na::SMatrix::<f64, 8, 8>::zeros();
    let mut b = na::SVector::<f64, 8>::zeros();
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y) = (s.x as f64, s.y as f64);
        let (u, v) = (d.x as f64, d.y as f64);
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -x * u;
        a[(r, 7)] = -y * u;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -x * v;
        a[(r + 1, 7)] = -y * v;
        b[r + 1] = v;
    }
    let h = a.lu().solve(&b)?;
    let mat = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    mat.iter().all(|v| v.is_finite()).then_some(mat)
}

/// Translates the centroid to the origin and scales the mean distance to √2.
fn normalizing_transform(points: &[Vec2]) -> na::Matrix3<f64> {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = points
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    na::Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn apply_affine(t: &na::Matrix3<f64>, p: Vec2) -> (f64, f64) {
    let (x, y) = (p.x as f64, p.y as f64);
    (
        t[(0, 0)] * x + t[(0, 1)] * y + t[(0, 2)],
        t[(1, 0)] * x + t[(1, 1)] * y + t[(1, 2)],
    )
}

/// Least-squares homography over four or more correspondences.
///
/// The solution is the eigenvector of `AᵀA` with the smallest eigenvalue,
/// computed on Hartley-normalized points.
pub fn fit_dlt(correspondences: &[Correspondence]) -> Option<na::Matrix3<f64>> {
    let n = correspondences.len();
    if n < 4 {
        return None;
    }
    let src: Vec<Vec2> = correspondences.iter().map(|c| c.model).collect();
    let dst: Vec<Vec2> = correspondences.iter().map(|c| c.frame).collect();
    let t_src = normalizing_transform(&src);
    let t_dst = normalizing_transform(&dst);

    let mut ata = na::SMatrix::<f64, 9, 9>::zeros();
    for (s, d) in src.iter().zip(dst.iter()) {
        let (sx, sy) = apply_affine(&t_src, *s);
        let (dx, dy) = apply_affine(&t_dst, *d);
        let r0 = na::SVector::<f64, 9>::from_column_slice(&[
            0.0,
            0.0,
            0.0,
            -sx,
            -sy,
            -1.0,
            dy * sx,
            dy * sy,
            dy,
        ]);
        let r1 = na::SVector::<f64, 9>::from_column_slice(&[
            sx,
            sy,
            1.0,
            0.0,
            0.0,
            0.0,
            -dx * sx,
            -dx * sy,
            -dx,
        ]);
        ata += r0 * r0.transpose() + r1 * r1.transpose();
    }

    let eig = na::SymmetricEigen::new(ata);
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;
    let v = eig.eigenvectors.column(min_idx);
    let h_norm = na::Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    let Some(t_dst_inv) = t_dst.try_inverse() else {
        debug!("destination normalization is singular");
        return None;
    };
    let h = t_dst_inv * h_norm * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        debug!("homography has h33 = 0");
        return None;
    }
    let h = h / scale;
    h.iter().all(|v| v.is_finite()).then_some(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_all(h: &na::Matrix3<f64>, pts: &[Vec2]) -> Vec<Correspondence> {
        pts.iter()
            .map(|&p| Correspondence {
                model: p,
                frame: project(h, p).unwrap(),
            })
            .collect()
    }

    fn ground_truth() -> na::Matrix3<f64> {
        na::Matrix3::new(1.1, 0.05, 40.0, -0.03, 0.95, 25.0, 1e-4, -2e-4, 1.0)
    }

    #[test]
    fn four_point_solution_recovers_homography() {
        let h = ground_truth();
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 0.0),
            Vec2::new(100.0, 80.0),
            Vec2::new(0.0, 80.0),
        ];
        let solved = solve_four_point(&map_all(&h, &pts)).unwrap();
        for p in [Vec2::new(50.0, 40.0), Vec2::new(10.0, 70.0)] {
            let a = project(&h, p).unwrap();
            let b = project(&solved, p).unwrap();
            assert!(a.distance(b) < 1e-2, "{a} vs {b}");
        }
    }

    #[test]
    fn collinear_sample_is_rejected() {
        let h = na::Matrix3::identity();
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(0.0, 30.0),
        ];
        assert!(solve_four_point(&map_all(&h, &pts)).is_none());
    }

    #[test]
    fn dlt_fits_many_points() {
        let h = ground_truth();
        let pts: Vec<Vec2> = (0..30)
            .map(|i| Vec2::new((i * 37 % 100) as f32, (i * 53 % 80) as f32))
            .collect();
        let solved = fit_dlt(&map_all(&h, &pts)).unwrap();
        let origin = project(&solved, Vec2::ZERO).unwrap();
        assert!(origin.distance(Vec2::new(40.0, 25.0)) < 1e-2, "{origin}");
    }

    #[test]
    fn too_few_points_for_dlt() {
        assert!(fit_dlt(&[]).is_none());
    }
}
