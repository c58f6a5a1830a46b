extern crate nalgebra as na;

use na::{Vector2,Vector3,Vector6,Point3,Matrix2x3,Matrix3,SMatrix};
use crate::ekf::camera_state::{CameraState,CAMERA_STATE_SIZE,POSITION_OFFSET,ORIENTATION_OFFSET};
use crate::numerics::quaternion;
use crate::sensors::camera::Camera;
use crate::Float;
use tracing::warn;

pub const LANDMARK_PARAM_SIZE: usize = 6;

/**
 * Inputs perturbing a freshly initialized landmark: the distorted pixel (u,v) and the inverse depth guess
 */
pub const INITIALIZATION_NOISE_SIZE: usize = 3;

/**
 * Smallest share of x²+z² in the squared ray norm before the azimuth is treated as undefined
 */
pub const POLE_TOLERANCE: Float = 1e-12;

#[derive(Debug,Copy,Clone,PartialEq)]
/**
 * state: x, y, z (anchor), theta (azimuth), phi (elevation), rho (inv depth)
 */
pub struct InverseDepthLandmark {
    state: Vector6<Float>,
    m: Vector3<Float>
}

impl InverseDepthLandmark {

    pub fn from_state(state: Vector6<Float>) -> InverseDepthLandmark {
        let m = InverseDepthLandmark::direction(state[3],state[4]);
        InverseDepthLandmark{state,m}
    }

    pub fn from_array(arr: &[Float; LANDMARK_PARAM_SIZE]) -> InverseDepthLandmark {
        InverseDepthLandmark::from_state(Vector6::<Float>::from_column_slice(arr))
    }

    /**
     * Anchors a new landmark at the current camera position along the ray of a distorted pixel
     */
    pub fn from_pixel<C: Camera>(camera: &C, camera_state: &CameraState, pixel: &Vector2<Float>, inverse_depth_prior: Float) -> InverseDepthLandmark {
        let camera_pos = camera_state.get_position();
        let camera_ray_world = camera_state.get_rotation_matrix()*camera.to_homogeneous_ray(pixel);
        let (theta,phi) = InverseDepthLandmark::azimuth_elevation(&camera_ray_world);

        let state = Vector6::<Float>::new(camera_pos[0],camera_pos[1],camera_pos[2],theta,phi,inverse_depth_prior);
        InverseDepthLandmark::from_state(state)
    }

    pub fn get_state_as_vector(&self) -> &Vector6<Float> {
        &self.state
    }

    /**
     * Gets the position of the first camera that observed the landmark in world coordinates
     */
    pub fn get_anchor(&self) -> Vector3<Float> {
        Vector3::<Float>::new(self.state[0],self.state[1],self.state[2])
    }

    pub fn get_theta(&self) -> Float {
        self.state[3]
    }

    pub fn get_phi(&self) -> Float {
        self.state[4]
    }

    pub fn get_inverse_depth(&self) -> Float {
        self.state[5]
    }

    pub fn get_direction(&self) -> Vector3<Float> {
        self.m
    }

    pub fn has_valid_depth(&self) -> bool {
        self.get_inverse_depth() > 0.0
    }

    /**
     * anchor + m(theta,phi)/rho. Not defined for rho <= 0.
     */
    pub fn get_euclidean_representation(&self) -> Option<Point3<Float>> {
        match self.has_valid_depth() {
            true => Some(Point3::<Float>::from(self.get_anchor() + self.get_direction().scale(1.0/self.get_inverse_depth()))),
            false => None
        }
    }

    pub fn with_inverse_depth(&self, inverse_depth: Float) -> InverseDepthLandmark {
        let mut state = self.state;
        state[5] = inverse_depth;
        InverseDepthLandmark::from_state(state)
    }

    pub fn update(&mut self, perturb: &Vector6<Float>) -> () {
        self.state += perturb;
        self.m = InverseDepthLandmark::direction(self.get_theta(),self.get_phi());
    }

    pub fn direction(theta: Float, phi: Float) -> Vector3<Float> {
        let (sin_theta,cos_theta) = theta.sin_cos();
        let (sin_phi,cos_phi) = phi.sin_cos();

        Vector3::<Float>::new(
            cos_phi*sin_theta,
            sin_phi,
            cos_phi*cos_theta
        )
    }

    /**
     * (d m / d theta, d m / d phi)
     */
    pub fn direction_jacobian(theta: Float, phi: Float) -> (Vector3<Float>,Vector3<Float>) {
        let (sin_theta,cos_theta) = theta.sin_cos();
        let (sin_phi,cos_phi) = phi.sin_cos();

        let j_theta = Vector3::<Float>::new(cos_theta*cos_phi, 0.0, -cos_phi*sin_theta);
        let j_phi = Vector3::<Float>::new(-sin_phi*sin_theta, cos_phi, -sin_phi*cos_theta);
        (j_theta,j_phi)
    }

    pub fn azimuth_elevation(ray: &Vector3<Float>) -> (Float,Float) {
        let h_x = ray[0];
        let h_y = ray[1];
        let h_z = ray[2];
        let theta = h_x.atan2(h_z);
        let phi = h_y.atan2((h_x.powi(2)+h_z.powi(2)).sqrt());
        (theta,phi)
    }

    /**
     * d (theta,phi) / d ray. The azimuth is singular for rays along the y axis, there x²+z² is
     * clamped to POLE_TOLERANCE*|ray|² so the Jacobian stays bounded.
     */
    pub fn azimuth_elevation_jacobian(ray: &Vector3<Float>) -> Matrix2x3<Float> {
        let x = ray[0];
        let y = ray[1];
        let z = ray[2];
        let norm_sqrd = ray.norm_squared();
        let pole_limit = POLE_TOLERANCE*norm_sqrd;
        let xz_sqrd = match x.powi(2)+z.powi(2) {
            v if v < pole_limit => {
                warn!(x, y, z, "ray is parallel to the elevation axis, azimuth jacobian is clamped");
                pole_limit
            },
            v => v
        };
        let xz_norm = xz_sqrd.sqrt();

        Matrix2x3::<Float>::new(z/xz_sqrd, 0.0, -x/xz_sqrd,
                                -(x*y)/(norm_sqrd*xz_norm), xz_norm/norm_sqrd, -(z*y)/(norm_sqrd*xz_norm))
    }

    /**
     * Jacobians of a landmark created by from_pixel with respect to the camera state (6x13)
     * and with respect to the distorted pixel and the inverse depth prior (6x3)
     */
    pub fn initialization_jacobians<C: Camera>(camera: &C, camera_state: &CameraState, pixel: &Vector2<Float>)
        -> (SMatrix<Float,LANDMARK_PARAM_SIZE,CAMERA_STATE_SIZE>, SMatrix<Float,LANDMARK_PARAM_SIZE,INITIALIZATION_NOISE_SIZE>) {
        let orientation = camera_state.get_orientation();
        let rotation = quaternion::rotation_matrix(&orientation);
        let camera_ray = camera.to_homogeneous_ray(pixel);
        let camera_ray_world = rotation*camera_ray;

        let dangles_dray_world = InverseDepthLandmark::azimuth_elevation_jacobian(&camera_ray_world);
        let dray_world_dq = quaternion::rotated_vector_jacobian(&orientation, &camera_ray);

        let mut dy_dxv = SMatrix::<Float,LANDMARK_PARAM_SIZE,CAMERA_STATE_SIZE>::zeros();
        dy_dxv.fixed_view_mut::<3,3>(0,POSITION_OFFSET).copy_from(&Matrix3::<Float>::identity());
        dy_dxv.fixed_view_mut::<2,4>(3,ORIENTATION_OFFSET).copy_from(&(dangles_dray_world*dray_world_dq));

        let dray_dundistorted = camera.jacobian_homogeneous_to_pixel();
        let dundistorted_ddistorted = camera.jacobian_undistort(pixel);
        let dangles_dpixel = dangles_dray_world*rotation*dray_dundistorted*dundistorted_ddistorted;

        let mut dy_dnoise = SMatrix::<Float,LANDMARK_PARAM_SIZE,INITIALIZATION_NOISE_SIZE>::zeros();
        dy_dnoise.fixed_view_mut::<2,2>(3,0).copy_from(&dangles_dpixel);
        dy_dnoise[(5,2)] = 1.0;

        (dy_dxv,dy_dnoise)
    }
}
