extern crate nalgebra as na;

use na::{Vector2,Vector3,Matrix2,Matrix2x3,Matrix3x2};
use serde::{Serialize, Deserialize};
use crate::sensors::camera::Camera;
use crate::Float;

const DISTORTION_MAX_ITERATIONS: usize = 20;
const DISTORTION_EPS: Float = 1e-14;

/**
 * Pinhole camera with two coefficient radial distortion. The radius is measured in metric
 * units on the sensor, d being the (square) pixel size and f the focal length in the same unit.
 */
#[derive(Debug,Copy,Clone,PartialEq,Serialize,Deserialize)]
pub struct RadialDistortion {
    pub d: Float,
    pub cx: Float,
    pub cy: Float,
    pub k1: Float,
    pub k2: Float,
    pub f: Float
}

impl RadialDistortion {
    pub fn new(d: Float, cx: Float, cy: Float, k1: Float, k2: Float, f: Float) -> RadialDistortion {
        assert!(d > 0.0);
        assert!(f > 0.0);
        RadialDistortion{d,cx,cy,k1,k2,f}
    }

    pub fn pinhole(d: Float, cx: Float, cy: Float, f: Float) -> RadialDistortion {
        RadialDistortion::new(d,cx,cy,0.0,0.0,f)
    }

    /**
     * Focal length in pixels
     */
    pub fn get_focal_pixels(&self) -> Float {
        self.f/self.d
    }

    fn distortion_factor(&self, r_d_sqrd: Float) -> Float {
        1.0 + self.k1*r_d_sqrd + self.k2*r_d_sqrd.powi(2)
    }
}

impl Default for RadialDistortion {
    fn default() -> RadialDistortion {
        let d = 0.0112;
        RadialDistortion::new(d, 1.7945/d, 1.4433/d, 6.333e-2, 1.390e-2, 2.1735)
    }
}

impl Camera for RadialDistortion {

    fn project_undistorted(&self, position: &Vector3<Float>) -> Option<Vector2<Float>> {
        let z = position[2];
        match z {
            z if z.abs() > 0.0 => {
                let focal = self.get_focal_pixels();
                Some(Vector2::<Float>::new(self.cx + focal*position[0]/z, self.cy + focal*position[1]/z))
            },
            _ => None
        }
    }

    fn get_jacobian_with_respect_to_position_in_camera_frame(&self, position: &Vector3<Float>) -> Option<Matrix2x3<Float>> {
        let x = position[0];
        let y = position[1];
        let z = position[2];
        match z {
            z if z.abs() > 0.0 => {
                let z_sqrd = z.powi(2);
                let focal = self.get_focal_pixels();
                Some(Matrix2x3::<Float>::new(focal/z, 0.0, -(focal*x)/z_sqrd,
                                             0.0, focal/z, -(focal*y)/z_sqrd))
            },
            _ => None
        }
    }

    fn distort(&self, undistorted: &Vector2<Float>) -> Vector2<Float> {
        let x_u = (undistorted[0] - self.cx)*self.d;
        let y_u = (undistorted[1] - self.cy)*self.d;
        let r_u = (x_u.powi(2) + y_u.powi(2)).sqrt();

        // r_u = r_d*(1 + k1*r_d^2 + k2*r_d^4) solved for r_d by Newton iterations
        let mut r_d = r_u/2.0;
        for _ in 0..DISTORTION_MAX_ITERATIONS {
            let r_d_sqrd = r_d.powi(2);
            let residual = r_d*self.distortion_factor(r_d_sqrd) - r_u;
            let derivative = 1.0 + 3.0*self.k1*r_d_sqrd + 5.0*self.k2*r_d_sqrd.powi(2);
            r_d -= residual/derivative;
            if residual.abs() < DISTORTION_EPS {
                break;
            }
        }

        let factor = self.distortion_factor(r_d.powi(2));
        Vector2::<Float>::new(self.cx + (undistorted[0] - self.cx)/factor, self.cy + (undistorted[1] - self.cy)/factor)
    }

    fn undistort(&self, distorted: &Vector2<Float>) -> Vector2<Float> {
        let x_d = (distorted[0] - self.cx)*self.d;
        let y_d = (distorted[1] - self.cy)*self.d;
        let factor = self.distortion_factor(x_d.powi(2) + y_d.powi(2));
        Vector2::<Float>::new(self.cx + (distorted[0] - self.cx)*factor, self.cy + (distorted[1] - self.cy)*factor)
    }

    fn jacobian_undistort(&self, distorted: &Vector2<Float>) -> Matrix2<Float> {
        let u_offset = distorted[0] - self.cx;
        let v_offset = distorted[1] - self.cy;
        let d_sqrd = self.d.powi(2);
        let r_d_sqrd = (u_offset.powi(2) + v_offset.powi(2))*d_sqrd;
        let factor = self.distortion_factor(r_d_sqrd);
        let factor_derivative = self.k1 + 2.0*self.k2*r_d_sqrd;

        let uu_ud = factor + u_offset*factor_derivative*(2.0*u_offset*d_sqrd);
        let vu_vd = factor + v_offset*factor_derivative*(2.0*v_offset*d_sqrd);
        let uu_vd = u_offset*factor_derivative*(2.0*v_offset*d_sqrd);
        let vu_ud = v_offset*factor_derivative*(2.0*u_offset*d_sqrd);

        Matrix2::<Float>::new(uu_ud, uu_vd,
                              vu_ud, vu_vd)
    }

    fn to_homogeneous_ray(&self, distorted: &Vector2<Float>) -> Vector3<Float> {
        let undistorted = self.undistort(distorted);
        let focal = self.get_focal_pixels();
        Vector3::<Float>::new((undistorted[0] - self.cx)/focal, (undistorted[1] - self.cy)/focal, 1.0)
    }

    fn jacobian_homogeneous_to_pixel(&self) -> Matrix3x2<Float> {
        let focal = self.get_focal_pixels();
        Matrix3x2::<Float>::new(1.0/focal, 0.0,
                                0.0, 1.0/focal,
                                0.0, 0.0)
    }
}
