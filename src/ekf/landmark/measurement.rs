extern crate nalgebra as na;

use na::{Vector2,Vector3,Matrix3,SMatrix,DMatrix};
use crate::ekf::camera_state::{CameraState,CAMERA_STATE_SIZE,POSITION_OFFSET,ORIENTATION_OFFSET};
use crate::ekf::landmark::inverse_depth_landmark::{InverseDepthLandmark,LANDMARK_PARAM_SIZE};
use crate::numerics::quaternion;
use crate::sensors::camera::Camera;
use crate::Float;

pub const MEASUREMENT_SIZE: usize = 2;

/**
 * Predicted distorted pixel of one landmark and the non zero blocks of its measurement Jacobian
 */
#[derive(Debug,Copy,Clone)]
pub struct MeasurementPrediction {
    pub h: Vector2<Float>,
    pub jacobian_camera: SMatrix<Float,MEASUREMENT_SIZE,CAMERA_STATE_SIZE>,
    pub jacobian_landmark: SMatrix<Float,MEASUREMENT_SIZE,LANDMARK_PARAM_SIZE>
}

impl MeasurementPrediction {
    /**
     * Scatters the blocks into the 2 x (13 + 6N) Jacobian w.r.t. the full state
     */
    pub fn to_full_jacobian(&self, state_size: usize, landmark_offset: usize) -> DMatrix<Float> {
        assert!(landmark_offset + LANDMARK_PARAM_SIZE <= state_size);
        let mut jacobian = DMatrix::<Float>::zeros(MEASUREMENT_SIZE, state_size);
        jacobian.fixed_view_mut::<MEASUREMENT_SIZE,CAMERA_STATE_SIZE>(0,0).copy_from(&self.jacobian_camera);
        jacobian.fixed_view_mut::<MEASUREMENT_SIZE,LANDMARK_PARAM_SIZE>(0,landmark_offset).copy_from(&self.jacobian_landmark);
        jacobian
    }
}

/**
 * Ray from the camera towards the landmark in the camera frame, scaled by rho:
 * R(q)^T * (rho*(anchor - r) + m)
 */
pub fn ray_in_camera_frame(camera_state: &CameraState, landmark: &InverseDepthLandmark) -> Vector3<Float> {
    let rotation_world_to_cam = camera_state.get_rotation_matrix().transpose();
    let rho = landmark.get_inverse_depth();
    rotation_world_to_cam*((landmark.get_anchor() - camera_state.get_position()).scale(rho) + landmark.get_direction())
}

/**
 * Distorted pixel only, None if rho <= 0 or the landmark is not in front of the camera
 */
pub fn predict_pixel<C: Camera>(camera_state: &CameraState, landmark: &InverseDepthLandmark, camera: &C) -> Option<Vector2<Float>> {
    if !landmark.has_valid_depth() {
        return None;
    }
    let h_c = ray_in_camera_frame(camera_state, landmark);
    match h_c[2] > 0.0 {
        true => camera.project(&h_c),
        false => None
    }
}

/**
 * Predicted measurement h and its Jacobian, None if the landmark is invalid for this frame
 */
pub fn predicted_measurement<C: Camera>(camera_state: &CameraState, landmark: &InverseDepthLandmark, camera: &C) -> Option<MeasurementPrediction> {
    let h = predict_pixel(camera_state, landmark, camera)?;

    let orientation = camera_state.get_orientation();
    let rotation_world_to_cam: Matrix3<Float> = quaternion::rotation_matrix(&orientation).transpose();
    let rho = landmark.get_inverse_depth();
    let anchor_offset = landmark.get_anchor() - camera_state.get_position();
    let ray_world = anchor_offset.scale(rho) + landmark.get_direction();
    let h_c = rotation_world_to_cam*ray_world;

    let dhu_dhc = camera.get_jacobian_with_respect_to_position_in_camera_frame(&h_c)?;
    let dhd_dhu = camera.jacobian_distort(&h)?;
    let dh_dhc = dhd_dhu*dhu_dhc;

    let mut jacobian_camera = SMatrix::<Float,MEASUREMENT_SIZE,CAMERA_STATE_SIZE>::zeros();
    jacobian_camera.fixed_view_mut::<2,3>(0,POSITION_OFFSET).copy_from(&(dh_dhc*rotation_world_to_cam*(-rho)));
    let dhc_dq = quaternion::rotated_vector_jacobian(&quaternion::conjugate(&orientation), &ray_world)*quaternion::conjugate_jacobian();
    jacobian_camera.fixed_view_mut::<2,4>(0,ORIENTATION_OFFSET).copy_from(&(dh_dhc*dhc_dq));

    let (dm_dtheta,dm_dphi) = InverseDepthLandmark::direction_jacobian(landmark.get_theta(), landmark.get_phi());
    let mut dhc_dy = SMatrix::<Float,3,LANDMARK_PARAM_SIZE>::zeros();
    dhc_dy.fixed_view_mut::<3,3>(0,0).copy_from(&(rotation_world_to_cam*rho));
    dhc_dy.set_column(3, &(rotation_world_to_cam*dm_dtheta));
    dhc_dy.set_column(4, &(rotation_world_to_cam*dm_dphi));
    dhc_dy.set_column(5, &(rotation_world_to_cam*anchor_offset));
    let jacobian_landmark = dh_dhc*dhc_dy;

    Some(MeasurementPrediction{h,jacobian_camera,jacobian_landmark})
}
