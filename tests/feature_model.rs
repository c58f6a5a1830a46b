extern crate nalgebra as na;

mod common;

use approx::assert_relative_eq;
use na::{DVector,SVector,Vector2,Vector3,Vector6};
use rand::Rng;
use ekf_monoslam::Float;
use ekf_monoslam::ekf::camera_state::{CameraState,CAMERA_STATE_SIZE};
use ekf_monoslam::ekf::landmark::inverse_depth_landmark::{InverseDepthLandmark,LANDMARK_PARAM_SIZE};
use ekf_monoslam::ekf::landmark::measurement::{predicted_measurement,predict_pixel};
use ekf_monoslam::sensors::camera::{Camera,radial_distortion::RadialDistortion};
use common::{dynamic,numeric_jacobian,assert_matrix_close,moving_camera_state,image_pixels,seeded_rng,to_dvector};

fn split_state(x: &DVector<Float>) -> (CameraState, InverseDepthLandmark) {
    let camera_state = CameraState::from_state(SVector::<Float,CAMERA_STATE_SIZE>::from_column_slice(&x.as_slice()[0..CAMERA_STATE_SIZE]));
    let landmark = InverseDepthLandmark::from_state(Vector6::<Float>::from_column_slice(&x.as_slice()[CAMERA_STATE_SIZE..CAMERA_STATE_SIZE+LANDMARK_PARAM_SIZE]));
    (camera_state, landmark)
}

fn joint_state(camera_state: &CameraState, landmark: &InverseDepthLandmark) -> DVector<Float> {
    let mut x = DVector::<Float>::zeros(CAMERA_STATE_SIZE+LANDMARK_PARAM_SIZE);
    x.fixed_rows_mut::<CAMERA_STATE_SIZE>(0).copy_from(camera_state.get_state_as_vector());
    x.fixed_rows_mut::<LANDMARK_PARAM_SIZE>(CAMERA_STATE_SIZE).copy_from(landmark.get_state_as_vector());
    x
}

#[test]
fn direction_is_inverse_of_azimuth_elevation() {
    let mut rng = seeded_rng(11);
    for _ in 0..20 {
        let ray = Vector3::<Float>::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(0.1..1.0));
        let (theta,phi) = InverseDepthLandmark::azimuth_elevation(&ray);
        assert_relative_eq!(InverseDepthLandmark::direction(theta, phi), ray.normalize(), epsilon = 1e-12);
    }
}

#[test]
fn direction_jacobian_matches_finite_differences() {
    let angles = to_dvector(&[0.3, -0.2]);
    let (j_theta,j_phi) = InverseDepthLandmark::direction_jacobian(angles[0], angles[1]);
    let numeric = numeric_jacobian(|a: &DVector<Float>| to_dvector(InverseDepthLandmark::direction(a[0], a[1]).as_slice()), &angles);
    let analytic = na::DMatrix::<Float>::from_columns(&[to_dvector(j_theta.as_slice()), to_dvector(j_phi.as_slice())]);
    assert_matrix_close(&analytic, &numeric, 1e-6);
}

#[test]
fn azimuth_elevation_jacobian_matches_finite_differences() {
    let ray = to_dvector(&[0.3, -0.4, 1.2]);
    let analytic = InverseDepthLandmark::azimuth_elevation_jacobian(&Vector3::<Float>::new(ray[0], ray[1], ray[2]));
    let numeric = numeric_jacobian(|r: &DVector<Float>| {
        let (theta,phi) = InverseDepthLandmark::azimuth_elevation(&Vector3::<Float>::new(r[0], r[1], r[2]));
        to_dvector(&[theta, phi])
    }, &ray);
    assert_matrix_close(&dynamic(&analytic), &numeric, 1e-6);
}

#[test]
fn azimuth_elevation_jacobian_is_bounded_along_the_vertical() {
    let straight_down = Vector3::<Float>::new(0.0, -1.0, 2.2e-16);
    let jacobian = InverseDepthLandmark::azimuth_elevation_jacobian(&straight_down);
    assert!(jacobian.iter().all(|v| v.is_finite()));
    assert!(jacobian.amax() < 1.0);

    let vertical = Vector3::<Float>::new(0.0, 2.0, 0.0);
    assert!(InverseDepthLandmark::azimuth_elevation_jacobian(&vertical).iter().all(|v| v.is_finite()));
}

#[test]
fn euclidean_point_projects_back_to_initial_pixel() {
    let camera = RadialDistortion::default();
    let camera_state = moving_camera_state();
    for pixel in image_pixels() {
        for &rho in [0.1, 0.5, 2.0].iter() {
            let landmark = InverseDepthLandmark::from_pixel(&camera, &camera_state, &pixel, rho);
            assert_eq!(landmark.get_anchor(), camera_state.get_position());

            let point = landmark.get_euclidean_representation().expect("positive inverse depth");
            assert_relative_eq!((point.coords - camera_state.get_position()).norm(), 1.0/rho, epsilon = 1e-9);

            let point_cam = camera_state.get_rotation_matrix().transpose()*(point.coords - camera_state.get_position());
            let reprojected = camera.project(&point_cam).expect("point in front of camera");
            assert_relative_eq!(reprojected, pixel, epsilon = 1e-6);
        }
    }
}

#[test]
fn non_positive_inverse_depth_has_no_euclidean_point() {
    let landmark = InverseDepthLandmark::from_array(&[0.0, 0.0, 0.0, 0.1, 0.2, 0.0]);
    assert!(landmark.get_euclidean_representation().is_none());
    assert!(landmark.with_inverse_depth(-0.3).get_euclidean_representation().is_none());
    assert!(landmark.with_inverse_depth(0.3).get_euclidean_representation().is_some());
}

#[test]
fn fresh_feature_predicts_its_own_pixel() {
    let camera = RadialDistortion::default();
    let camera_state = moving_camera_state();
    for pixel in image_pixels() {
        let landmark = InverseDepthLandmark::from_pixel(&camera, &camera_state, &pixel, 1.0);
        let h = predict_pixel(&camera_state, &landmark, &camera).expect("valid feature");
        assert_relative_eq!(h, pixel, epsilon = 1e-6);
    }
}

#[test]
fn invalid_features_have_no_prediction() {
    let camera = RadialDistortion::default();
    let camera_state = moving_camera_state();
    let pixel = Vector2::<Float>::new(100.0, 100.0);
    let landmark = InverseDepthLandmark::from_pixel(&camera, &camera_state, &pixel, 1.0);

    assert!(predict_pixel(&camera_state, &landmark.with_inverse_depth(0.0), &camera).is_none());
    assert!(predicted_measurement(&camera_state, &landmark.with_inverse_depth(-1.0), &camera).is_none());

    // ray pointing away from the camera
    let behind = InverseDepthLandmark::from_array(&[0.3, -0.2, 0.1, 0.0, 0.0, 1.0]).with_inverse_depth(1.0);
    let turned_around = CameraState::new(
        &camera_state.get_position(),
        &ekf_monoslam::numerics::quaternion::from_rotation_vector(&Vector3::<Float>::new(0.0, std::f64::consts::PI, 0.0)),
        &camera_state.get_velocity(),
        &camera_state.get_angular_velocity()
    );
    assert!(predict_pixel(&turned_around, &behind, &camera).is_none());
}

#[test]
fn measurement_jacobian_matches_finite_differences() {
    let camera = RadialDistortion::default();
    let camera_state = moving_camera_state();
    let anchor_pose = CameraState::new(
        &Vector3::<Float>::new(-0.2, 0.1, -0.3),
        &camera_state.get_orientation(),
        &camera_state.get_velocity(),
        &camera_state.get_angular_velocity()
    );

    for pixel in image_pixels() {
        let landmark = InverseDepthLandmark::from_pixel(&camera, &anchor_pose, &pixel, 0.4);
        let prediction = predicted_measurement(&camera_state, &landmark, &camera).expect("valid feature");

        let x = joint_state(&camera_state, &landmark);
        let numeric = numeric_jacobian(|x: &DVector<Float>| {
            let (camera_state, landmark) = split_state(x);
            let h = predict_pixel(&camera_state, &landmark, &camera).expect("valid feature");
            to_dvector(h.as_slice())
        }, &x);

        let analytic = prediction.to_full_jacobian(CAMERA_STATE_SIZE+LANDMARK_PARAM_SIZE, CAMERA_STATE_SIZE);
        assert_matrix_close(&analytic, &numeric, 1e-5);
    }
}

#[test]
fn initialization_jacobians_match_finite_differences() {
    let camera = RadialDistortion::default();
    let camera_state = moving_camera_state();
    let rho = 1.0;

    for pixel in image_pixels() {
        let (dy_dxv, dy_dnoise) = InverseDepthLandmark::initialization_jacobians(&camera, &camera_state, &pixel);

        let xv = to_dvector(camera_state.get_state_as_vector().as_slice());
        let numeric_xv = numeric_jacobian(|x: &DVector<Float>| {
            let state = CameraState::from_state(SVector::<Float,CAMERA_STATE_SIZE>::from_column_slice(x.as_slice()));
            to_dvector(InverseDepthLandmark::from_pixel(&camera, &state, &pixel, rho).get_state_as_vector().as_slice())
        }, &xv);
        assert_matrix_close(&dynamic(&dy_dxv), &numeric_xv, 1e-5);

        let noise = to_dvector(&[pixel[0], pixel[1], rho]);
        let numeric_noise = numeric_jacobian(|n: &DVector<Float>| {
            let perturbed_pixel = Vector2::<Float>::new(n[0], n[1]);
            to_dvector(InverseDepthLandmark::from_pixel(&camera, &camera_state, &perturbed_pixel, n[2]).get_state_as_vector().as_slice())
        }, &noise);
        assert_matrix_close(&dynamic(&dy_dnoise), &numeric_noise, 1e-5);
    }
}
