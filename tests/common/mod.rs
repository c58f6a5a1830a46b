#![allow(dead_code)]
extern crate nalgebra as na;

use na::{DMatrix,DVector,Vector2,Vector3,Vector4};
use rand::{Rng,SeedableRng,rngs::SmallRng};
use ekf_monoslam::Float;
use ekf_monoslam::ekf::camera_state::CameraState;
use ekf_monoslam::numerics::quaternion;

pub const FINITE_DIFFERENCE_STEP: Float = 1e-6;

/**
 * Central differences of f around x
 */
pub fn numeric_jacobian<F>(f: F, x: &DVector<Float>) -> DMatrix<Float> where F: Fn(&DVector<Float>) -> DVector<Float> {
    let f_x = f(x);
    let mut jacobian = DMatrix::<Float>::zeros(f_x.nrows(), x.nrows());
    for c in 0..x.nrows() {
        let mut x_plus = x.clone();
        let mut x_minus = x.clone();
        x_plus[c] += FINITE_DIFFERENCE_STEP;
        x_minus[c] -= FINITE_DIFFERENCE_STEP;
        let column = (f(&x_plus) - f(&x_minus))/(2.0*FINITE_DIFFERENCE_STEP);
        jacobian.set_column(c, &column);
    }
    jacobian
}

pub fn assert_matrix_close(analytic: &DMatrix<Float>, numeric: &DMatrix<Float>, tolerance: Float) -> () {
    assert_eq!(analytic.shape(), numeric.shape());
    for r in 0..analytic.nrows() {
        for c in 0..analytic.ncols() {
            let a = analytic[(r,c)];
            let n = numeric[(r,c)];
            assert!((a-n).abs() <= tolerance*(1.0 + n.abs()), "entry ({},{}) analytic {} numeric {}", r, c, a, n);
        }
    }
}

pub fn to_dvector(slice: &[Float]) -> DVector<Float> {
    DVector::<Float>::from_column_slice(slice)
}

pub fn random_unit_quaternion(rng: &mut SmallRng) -> Vector4<Float> {
    let axis_angle = Vector3::<Float>::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
    quaternion::from_rotation_vector(&axis_angle)
}

pub fn seeded_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/**
 * A camera looking roughly along +z, slightly rotated and moving
 */
pub fn moving_camera_state() -> CameraState {
    let orientation = quaternion::from_rotation_vector(&Vector3::<Float>::new(0.05, -0.1, 0.02));
    CameraState::new(
        &Vector3::<Float>::new(0.3, -0.2, 0.1),
        &orientation,
        &Vector3::<Float>::new(0.02, 0.01, -0.01),
        &Vector3::<Float>::new(0.01, -0.02, 0.03)
    )
}

pub fn image_pixels() -> Vec<Vector2<Float>> {
    vec![
        Vector2::<Float>::new(40.0, 30.0),
        Vector2::<Float>::new(160.0, 120.0),
        Vector2::<Float>::new(280.0, 50.0),
        Vector2::<Float>::new(70.0, 200.0),
        Vector2::<Float>::new(250.0, 210.0)
    ]
}

pub fn dynamic<R: na::Dim, C: na::Dim, S: na::storage::Storage<Float,R,C>>(matrix: &na::Matrix<Float,R,C,S>) -> DMatrix<Float> {
    DMatrix::<Float>::from_iterator(matrix.nrows(), matrix.ncols(), matrix.iter().cloned())
}
