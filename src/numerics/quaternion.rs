extern crate nalgebra as na;

use na::{Vector,Vector3,Vector4,Matrix3,Matrix3x4,Matrix4,Matrix4x3,U3,U1,base::storage::Storage};
use crate::Float;

/**
 * Quaternions are stored as (w,x,y,z). None of the functions below assume unit norm,
 * so the rotation matrix and its derivatives stay consistent for perturbed quaternions.
 */
pub const SMALL_ANGLE_EPS: Float = 1e-12;

pub fn identity() -> Vector4<Float> {
    Vector4::<Float>::new(1.0, 0.0, 0.0, 0.0)
}

pub fn conjugate(q: &Vector4<Float>) -> Vector4<Float> {
    Vector4::<Float>::new(q[0], -q[1], -q[2], -q[3])
}

/**
 * d conj(q) / d q
 */
pub fn conjugate_jacobian() -> Matrix4<Float> {
    Matrix4::<Float>::from_diagonal(&Vector4::<Float>::new(1.0, -1.0, -1.0, -1.0))
}

/**
 * q (x) r = left_product_matrix(q) * r
 */
pub fn left_product_matrix(q: &Vector4<Float>) -> Matrix4<Float> {
    Matrix4::<Float>::new(q[0], -q[1], -q[2], -q[3],
                          q[1],  q[0], -q[3],  q[2],
                          q[2],  q[3],  q[0], -q[1],
                          q[3], -q[2],  q[1],  q[0])
}

/**
 * q (x) r = right_product_matrix(r) * q
 */
pub fn right_product_matrix(r: &Vector4<Float>) -> Matrix4<Float> {
    Matrix4::<Float>::new(r[0], -r[1], -r[2], -r[3],
                          r[1],  r[0],  r[3], -r[2],
                          r[2], -r[3],  r[0],  r[1],
                          r[3],  r[2], -r[1],  r[0])
}

pub fn product(q: &Vector4<Float>, r: &Vector4<Float>) -> Vector4<Float> {
    left_product_matrix(q)*r
}

/**
 * Exponential map from a rotation vector (axis * angle) to a unit quaternion
 */
pub fn from_rotation_vector<T>(u: &Vector<Float,U3,T>) -> Vector4<Float> where T: Storage<Float,U3,U1> {
    let angle = u.norm();
    match angle {
        a if a < SMALL_ANGLE_EPS => identity(),
        a => {
            let (sin_half,cos_half) = (a/2.0).sin_cos();
            let axis = u/a;
            Vector4::<Float>::new(cos_half, sin_half*axis[0], sin_half*axis[1], sin_half*axis[2])
        }
    }
}

/**
 * Derivative of from_rotation_vector(omega*delta_t) with respect to omega
 */
pub fn rotation_vector_jacobian(omega: &Vector3<Float>, delta_t: Float) -> Matrix4x3<Float> {
    let omega_norm = omega.norm();
    let mut jacobian = Matrix4x3::<Float>::zeros();

    if omega_norm*delta_t < SMALL_ANGLE_EPS || omega_norm < SMALL_ANGLE_EPS {
        jacobian.fixed_view_mut::<3,3>(1,0).copy_from(&(Matrix3::<Float>::identity()*(delta_t/2.0)));
        return jacobian;
    }

    let (sin_half,cos_half) = (omega_norm*delta_t/2.0).sin_cos();
    let omega_norm_sqrd = omega_norm.powi(2);

    for b in 0..3 {
        jacobian[(0,b)] = -(delta_t/2.0)*(omega[b]/omega_norm)*sin_half;
    }

    for a in 0..3 {
        for b in 0..3 {
            jacobian[(a+1,b)] = match a == b {
                true => (delta_t/2.0)*(omega[a].powi(2)/omega_norm_sqrd)*cos_half + (1.0/omega_norm)*(1.0 - omega[a].powi(2)/omega_norm_sqrd)*sin_half,
                false => (omega[a]*omega[b]/omega_norm_sqrd)*((delta_t/2.0)*cos_half - (1.0/omega_norm)*sin_half)
            };
        }
    }

    jacobian
}

pub fn rotation_matrix(q: &Vector4<Float>) -> Matrix3<Float> {
    let (w,x,y,z) = (q[0],q[1],q[2],q[3]);
    Matrix3::<Float>::new(w*w+x*x-y*y-z*z, 2.0*(x*y-w*z), 2.0*(x*z+w*y),
                          2.0*(x*y+w*z), w*w-x*x+y*y-z*z, 2.0*(y*z-w*x),
                          2.0*(x*z-w*y), 2.0*(y*z+w*x), w*w-x*x-y*y+z*z)
}

/**
 * d (R(q)*a) / d q
 */
pub fn rotated_vector_jacobian(q: &Vector4<Float>, a: &Vector3<Float>) -> Matrix3x4<Float> {
    let (w,x,y,z) = (q[0],q[1],q[2],q[3]);

    let d_w = Matrix3::<Float>::new( w, -z,  y,
                                     z,  w, -x,
                                    -y,  x,  w);
    let d_x = Matrix3::<Float>::new( x,  y,  z,
                                     y, -x, -w,
                                     z,  w, -x);
    let d_y = Matrix3::<Float>::new(-y,  x,  w,
                                     x,  y,  z,
                                    -w,  z, -y);
    let d_z = Matrix3::<Float>::new(-z, -w,  x,
                                     w, -z,  y,
                                     x,  y,  z);

    let mut jacobian = Matrix3x4::<Float>::zeros();
    jacobian.set_column(0, &(2.0*d_w*a));
    jacobian.set_column(1, &(2.0*d_x*a));
    jacobian.set_column(2, &(2.0*d_y*a));
    jacobian.set_column(3, &(2.0*d_z*a));
    jacobian
}

/**
 * d (q/|q|) / d q
 */
pub fn normalization_jacobian(q: &Vector4<Float>) -> Matrix4<Float> {
    let norm_sqrd = q.norm_squared();
    let norm_cubed = norm_sqrd*norm_sqrd.sqrt();
    (Matrix4::<Float>::identity()*norm_sqrd - q*q.transpose())/norm_cubed
}
