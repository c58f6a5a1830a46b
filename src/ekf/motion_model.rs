extern crate nalgebra as na;

use na::{SMatrix,SVector,Matrix3,Matrix4x3,Vector3};
use crate::ekf::camera_state::{CameraState,CAMERA_STATE_SIZE,POSITION_OFFSET,ORIENTATION_OFFSET,VELOCITY_OFFSET,ANGULAR_VELOCITY_OFFSET};
use crate::numerics::quaternion;
use crate::Float;

pub type CameraJacobian = SMatrix<Float,CAMERA_STATE_SIZE,CAMERA_STATE_SIZE>;

/**
 * Impulse noise: linear and angular velocity perturbations accumulated over one step
 */
const NOISE_SIZE: usize = 6;

/**
 * Constant velocity, constant angular velocity model.
 * Returns the predicted camera state, the Jacobian F of the transition and the process noise Q.
 */
#[allow(non_snake_case)]
pub fn predict(delta_t: Float, std_acceleration: Float, std_angular_acceleration: Float, camera_state: &CameraState) -> (CameraState, CameraJacobian, CameraJacobian) {
    assert!(delta_t >= 0.0);

    let orientation = camera_state.get_orientation();
    let angular_velocity = camera_state.get_angular_velocity();
    let delta_rotation = quaternion::from_rotation_vector(&(angular_velocity*delta_t));

    let mut new_state = transition(delta_t, camera_state);
    new_state.normalize_orientation();

    let dq_domega = orientation_jacobian_wrt_angular_velocity(&orientation, &angular_velocity, delta_t);
    let F = transition_jacobian(&delta_rotation, &dq_domega, delta_t);
    let Q = process_noise(&dq_domega, delta_t, std_acceleration, std_angular_acceleration);

    (new_state, F, Q)
}

/**
 * The transition before the orientation is renormalized. F is the Jacobian of this function.
 */
pub fn transition(delta_t: Float, camera_state: &CameraState) -> CameraState {
    let position = camera_state.get_position();
    let orientation = camera_state.get_orientation();
    let velocity = camera_state.get_velocity();
    let angular_velocity = camera_state.get_angular_velocity();

    let new_position = position + velocity*delta_t;
    let delta_rotation = quaternion::from_rotation_vector(&(angular_velocity*delta_t));
    let new_orientation = quaternion::product(&orientation, &delta_rotation);

    CameraState::new(&new_position, &new_orientation, &velocity, &angular_velocity)
}

fn orientation_jacobian_wrt_angular_velocity(orientation: &na::Vector4<Float>, angular_velocity: &Vector3<Float>, delta_t: Float) -> Matrix4x3<Float> {
    quaternion::left_product_matrix(orientation)*quaternion::rotation_vector_jacobian(angular_velocity, delta_t)
}

#[allow(non_snake_case)]
fn transition_jacobian(delta_rotation: &na::Vector4<Float>, dq_domega: &Matrix4x3<Float>, delta_t: Float) -> CameraJacobian {
    let mut F = CameraJacobian::identity();
    F.fixed_view_mut::<3,3>(POSITION_OFFSET,VELOCITY_OFFSET).copy_from(&(Matrix3::<Float>::identity()*delta_t));
    F.fixed_view_mut::<4,4>(ORIENTATION_OFFSET,ORIENTATION_OFFSET).copy_from(&quaternion::right_product_matrix(delta_rotation));
    F.fixed_view_mut::<4,3>(ORIENTATION_OFFSET,ANGULAR_VELOCITY_OFFSET).copy_from(dq_domega);
    F
}

/**
 * Q = G*Pn*G^T where Pn holds the variances of the velocity impulses over delta_t
 */
#[allow(non_snake_case)]
fn process_noise(dq_domega: &Matrix4x3<Float>, delta_t: Float, std_acceleration: Float, std_angular_acceleration: Float) -> CameraJacobian {
    let linear_variance = (std_acceleration*delta_t).powi(2);
    let angular_variance = (std_angular_acceleration*delta_t).powi(2);
    let Pn = SMatrix::<Float,NOISE_SIZE,NOISE_SIZE>::from_diagonal(&SVector::<Float,NOISE_SIZE>::from_column_slice(&[
        linear_variance, linear_variance, linear_variance,
        angular_variance, angular_variance, angular_variance
    ]));

    let mut G = SMatrix::<Float,CAMERA_STATE_SIZE,NOISE_SIZE>::zeros();
    G.fixed_view_mut::<3,3>(POSITION_OFFSET,0).copy_from(&(Matrix3::<Float>::identity()*delta_t));
    G.fixed_view_mut::<4,3>(ORIENTATION_OFFSET,3).copy_from(dq_domega);
    G.fixed_view_mut::<3,3>(VELOCITY_OFFSET,0).copy_from(&Matrix3::<Float>::identity());
    G.fixed_view_mut::<3,3>(ANGULAR_VELOCITY_OFFSET,3).copy_from(&Matrix3::<Float>::identity());

    G*Pn*G.transpose()
}
