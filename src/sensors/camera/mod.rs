extern crate nalgebra as na;

use na::{Vector2,Vector3,Matrix2,Matrix2x3,Matrix3x2};
use crate::Float;

pub mod radial_distortion;

/**
 * Projection model consumed by the filter. Pixels named "distorted" are what the image
 * shows, "undistorted" pixels are the ideal pinhole projection.
 */
pub trait Camera {
    fn project_undistorted(&self, position: &Vector3<Float>) -> Option<Vector2<Float>>;
    fn get_jacobian_with_respect_to_position_in_camera_frame(&self, position: &Vector3<Float>) -> Option<Matrix2x3<Float>>;
    fn distort(&self, undistorted: &Vector2<Float>) -> Vector2<Float>;
    fn undistort(&self, distorted: &Vector2<Float>) -> Vector2<Float>;
    /**
     * d undistorted / d distorted, evaluated at a distorted pixel
     */
    fn jacobian_undistort(&self, distorted: &Vector2<Float>) -> Matrix2<Float>;
    /**
     * Undistorts and backprojects a pixel to a ray in camera coordinates with unit z
     */
    fn to_homogeneous_ray(&self, distorted: &Vector2<Float>) -> Vector3<Float>;
    /**
     * d ray / d undistorted pixel
     */
    fn jacobian_homogeneous_to_pixel(&self) -> Matrix3x2<Float>;

    fn project(&self, position: &Vector3<Float>) -> Option<Vector2<Float>> {
        self.project_undistorted(position).map(|undistorted| self.distort(&undistorted))
    }

    /**
     * d distorted / d undistorted, evaluated at a distorted pixel
     */
    fn jacobian_distort(&self, distorted: &Vector2<Float>) -> Option<Matrix2<Float>> {
        self.jacobian_undistort(distorted).try_inverse()
    }
}
