extern crate nalgebra as na;

use na::{SVector,Vector3,Vector4,Matrix3};
use crate::numerics::quaternion;
use crate::Float;

pub const CAMERA_STATE_SIZE: usize = 13;
pub const POSITION_OFFSET: usize = 0;
pub const ORIENTATION_OFFSET: usize = 3;
pub const VELOCITY_OFFSET: usize = 7;
pub const ANGULAR_VELOCITY_OFFSET: usize = 10;

/**
 * Format [r_x,r_y,r_z, q_w,q_x,q_y,q_z, v_x,v_y,v_z, w_x,w_y,w_z]
 * q rotates vectors from the camera frame into the world frame
 */
#[derive(Debug,Copy,Clone,PartialEq)]
pub struct CameraState {
    state: SVector<Float,CAMERA_STATE_SIZE>
}

impl CameraState {
    pub fn new(position: &Vector3<Float>, orientation: &Vector4<Float>, velocity: &Vector3<Float>, angular_velocity: &Vector3<Float>) -> CameraState {
        let mut state = SVector::<Float,CAMERA_STATE_SIZE>::zeros();
        state.fixed_rows_mut::<3>(POSITION_OFFSET).copy_from(position);
        state.fixed_rows_mut::<4>(ORIENTATION_OFFSET).copy_from(orientation);
        state.fixed_rows_mut::<3>(VELOCITY_OFFSET).copy_from(velocity);
        state.fixed_rows_mut::<3>(ANGULAR_VELOCITY_OFFSET).copy_from(angular_velocity);
        CameraState{state}
    }

    pub fn from_state(state: SVector<Float,CAMERA_STATE_SIZE>) -> CameraState {
        CameraState{state}
    }

    pub fn get_state_as_vector(&self) -> &SVector<Float,CAMERA_STATE_SIZE> {
        &self.state
    }

    pub fn get_position(&self) -> Vector3<Float> {
        self.state.fixed_rows::<3>(POSITION_OFFSET).into_owned()
    }

    pub fn get_orientation(&self) -> Vector4<Float> {
        self.state.fixed_rows::<4>(ORIENTATION_OFFSET).into_owned()
    }

    pub fn get_velocity(&self) -> Vector3<Float> {
        self.state.fixed_rows::<3>(VELOCITY_OFFSET).into_owned()
    }

    pub fn get_angular_velocity(&self) -> Vector3<Float> {
        self.state.fixed_rows::<3>(ANGULAR_VELOCITY_OFFSET).into_owned()
    }

    /**
     * Camera to world rotation
     */
    pub fn get_rotation_matrix(&self) -> Matrix3<Float> {
        quaternion::rotation_matrix(&self.get_orientation())
    }

    pub fn update(&mut self, perturb: &SVector<Float,CAMERA_STATE_SIZE>) -> () {
        self.state += perturb;
    }

    pub fn normalize_orientation(&mut self) -> () {
        let q = self.get_orientation().normalize();
        self.state.fixed_rows_mut::<4>(ORIENTATION_OFFSET).copy_from(&q);
    }
}
