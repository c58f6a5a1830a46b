extern crate nalgebra as na;

use na::{DMatrix,DVector,Matrix3,Vector2,Vector3,SVector};
use tracing::{debug,warn};

use crate::ekf::camera_state::{CameraState,CAMERA_STATE_SIZE,ORIENTATION_OFFSET};
use crate::ekf::landmark::inverse_depth_landmark::{InverseDepthLandmark,LANDMARK_PARAM_SIZE};
use crate::ekf::landmark::measurement::{predicted_measurement,predict_pixel,MeasurementPrediction,MEASUREMENT_SIZE};
use crate::ekf::runtime_parameters::EkfRuntimeParameters;
use crate::ekf::error::{EkfError,Result};
use crate::numerics::{quaternion,symmetrize};
use crate::sensors::camera::Camera;
use crate::Float;

pub mod camera_state;
pub mod motion_model;
pub mod landmark;
pub mod runtime_parameters;
pub mod error;

/**
 * Predicted pixel of one feature for the current frame. Invalid features (rho <= 0 or behind the camera)
 * have no prediction and are left out of the update.
 */
#[derive(Debug,Copy,Clone,PartialEq)]
pub struct FeaturePrediction {
    pub h: Option<Vector2<Float>>
}

impl FeaturePrediction {
    pub fn is_valid(&self) -> bool {
        self.h.is_some()
    }
}

/**
 * Joint state of the camera and the inverse depth map with its dense covariance.
 * The state is ordered [camera (13), feature_1 (6), ..., feature_n (6)], the covariance follows the same order.
 */
#[derive(Debug,Clone)]
pub struct Ekf {
    camera_state: CameraState,
    landmarks: Vec<InverseDepthLandmark>,
    covariance: DMatrix<Float>,
    runtime_parameters: EkfRuntimeParameters
}

impl Ekf {
    pub fn new(runtime_parameters: EkfRuntimeParameters) -> Ekf {
        let v_0 = runtime_parameters.initial_velocity;
        let w_0 = runtime_parameters.initial_angular_velocity;
        let camera_state = CameraState::new(
            &Vector3::<Float>::zeros(),
            &quaternion::identity(),
            &Vector3::<Float>::new(v_0,v_0,v_0),
            &Vector3::<Float>::new(w_0,w_0,w_0)
        );

        let velocity_variance = runtime_parameters.std_initial_velocity.powi(2);
        let angular_velocity_variance = runtime_parameters.std_initial_angular_velocity.powi(2);
        let mut diagonal = SVector::<Float,CAMERA_STATE_SIZE>::from_element(Float::MIN_POSITIVE);
        for i in 7..10 {
            diagonal[i] = velocity_variance;
        }
        for i in 10..13 {
            diagonal[i] = angular_velocity_variance;
        }
        let covariance = DMatrix::<Float>::from_diagonal(&DVector::<Float>::from_column_slice(diagonal.as_slice()));

        Ekf{camera_state, landmarks: Vec::new(), covariance, runtime_parameters}
    }

    pub fn from_state(camera_state: CameraState, landmarks: Vec<InverseDepthLandmark>, covariance: DMatrix<Float>, runtime_parameters: EkfRuntimeParameters) -> Ekf {
        let state_size = CAMERA_STATE_SIZE + LANDMARK_PARAM_SIZE*landmarks.len();
        assert_eq!(covariance.nrows(), state_size);
        assert_eq!(covariance.ncols(), state_size);
        Ekf{camera_state, landmarks, covariance, runtime_parameters}
    }

    pub fn get_camera_state(&self) -> &CameraState {
        &self.camera_state
    }

    pub fn get_landmarks(&self) -> &Vec<InverseDepthLandmark> {
        &self.landmarks
    }

    pub fn get_covariance(&self) -> &DMatrix<Float> {
        &self.covariance
    }

    pub fn get_runtime_parameters(&self) -> &EkfRuntimeParameters {
        &self.runtime_parameters
    }

    pub fn number_of_features(&self) -> usize {
        self.landmarks.len()
    }

    pub fn state_size(&self) -> usize {
        CAMERA_STATE_SIZE + LANDMARK_PARAM_SIZE*self.landmarks.len()
    }

    pub fn landmark_offset(feature_index: usize) -> usize {
        CAMERA_STATE_SIZE + LANDMARK_PARAM_SIZE*feature_index
    }

    pub fn state_vector(&self) -> DVector<Float> {
        let mut state = DVector::<Float>::zeros(self.state_size());
        state.fixed_rows_mut::<CAMERA_STATE_SIZE>(0).copy_from(self.camera_state.get_state_as_vector());
        for (i,landmark) in self.landmarks.iter().enumerate() {
            state.fixed_rows_mut::<LANDMARK_PARAM_SIZE>(Ekf::landmark_offset(i)).copy_from(landmark.get_state_as_vector());
        }
        state
    }

    /**
     * Variance of the inverse depth of a feature
     */
    pub fn inverse_depth_variance(&self, feature_index: usize) -> Float {
        let idx = Ekf::landmark_offset(feature_index) + LANDMARK_PARAM_SIZE - 1;
        self.covariance[(idx,idx)]
    }

    /**
     * Camera prediction with the motion model. Features are static, so only the camera rows and columns change:
     * P_cc = F*P_cc*F^T + Q, P_cf = F*P_cf, P_fc = P_fc*F^T
     */
    #[allow(non_snake_case)]
    pub fn predict_state_and_covariance(&mut self, delta_t: Float) -> () {
        if self.landmarks.is_empty() && !self.runtime_parameters.predict_without_features {
            return;
        }

        let (new_camera_state, F, Q) = motion_model::predict(
            delta_t,
            self.runtime_parameters.std_acceleration,
            self.runtime_parameters.std_angular_acceleration,
            &self.camera_state
        );
        self.camera_state = new_camera_state;

        let feature_size = self.state_size() - CAMERA_STATE_SIZE;
        let p_cc = self.covariance.fixed_view::<CAMERA_STATE_SIZE,CAMERA_STATE_SIZE>(0,0).into_owned();
        let p_cf = self.covariance.view((0,CAMERA_STATE_SIZE),(CAMERA_STATE_SIZE,feature_size)).into_owned();

        let new_p_cc = F*p_cc*F.transpose() + Q;
        let new_p_cf = F*p_cf;

        self.covariance.fixed_view_mut::<CAMERA_STATE_SIZE,CAMERA_STATE_SIZE>(0,0).copy_from(&new_p_cc);
        self.covariance.view_mut((0,CAMERA_STATE_SIZE),(CAMERA_STATE_SIZE,feature_size)).copy_from(&new_p_cf);
        self.covariance.view_mut((CAMERA_STATE_SIZE,0),(feature_size,CAMERA_STATE_SIZE)).copy_from(&new_p_cf.transpose());
        symmetrize_camera_block(&mut self.covariance);

        debug!(state_size = self.state_size(), delta_t, "predicted camera state");
    }

    /**
     * Predicted pixel for every feature, in state order
     */
    pub fn predict_measurements<C: Camera>(&self, camera: &C) -> Vec<FeaturePrediction> {
        self.landmarks.iter().enumerate().map(|(i,landmark)| {
            let h = predict_pixel(&self.camera_state, landmark, camera);
            if h.is_none() {
                warn!(feature = i, inverse_depth = landmark.get_inverse_depth(), "feature invalidated for this frame");
            }
            FeaturePrediction{h}
        }).collect()
    }

    /**
     * EKF correction with one measured pixel per feature, matched by index.
     * Returns the number of features that took part in the update.
     */
    #[allow(non_snake_case)]
    pub fn update<C: Camera>(&mut self, camera: &C, measurements: &[Vector2<Float>]) -> Result<usize> {
        assert_eq!(measurements.len(), self.landmarks.len(), "one measurement per feature is required, tracker and filter are out of sync");
        if self.landmarks.is_empty() {
            return Ok(0);
        }

        let predictions = self.landmarks.iter().enumerate().filter_map(|(i,landmark)| {
            match predicted_measurement(&self.camera_state, landmark, camera) {
                Some(prediction) => Some((i,prediction)),
                None => {
                    warn!(feature = i, inverse_depth = landmark.get_inverse_depth(), "feature excluded from update");
                    None
                }
            }
        }).collect::<Vec<(usize,MeasurementPrediction)>>();

        if predictions.is_empty() {
            warn!(features = self.landmarks.len(), "no valid feature for update");
            return Ok(0);
        }

        let state_size = self.state_size();
        let measurement_size = MEASUREMENT_SIZE*predictions.len();
        let mut z = DVector::<Float>::zeros(measurement_size);
        let mut h = DVector::<Float>::zeros(measurement_size);
        let mut H = DMatrix::<Float>::zeros(measurement_size, state_size);
        for (row,(feature_index,prediction)) in predictions.iter().enumerate() {
            let row_offset = MEASUREMENT_SIZE*row;
            z.fixed_rows_mut::<MEASUREMENT_SIZE>(row_offset).copy_from(&measurements[*feature_index]);
            h.fixed_rows_mut::<MEASUREMENT_SIZE>(row_offset).copy_from(&prediction.h);
            H.fixed_view_mut::<MEASUREMENT_SIZE,CAMERA_STATE_SIZE>(row_offset,0).copy_from(&prediction.jacobian_camera);
            H.fixed_view_mut::<MEASUREMENT_SIZE,LANDMARK_PARAM_SIZE>(row_offset,Ekf::landmark_offset(*feature_index)).copy_from(&prediction.jacobian_landmark);
        }

        let R = DMatrix::<Float>::identity(measurement_size, measurement_size)*self.runtime_parameters.std_image_noise.powi(2);
        let PHt = &self.covariance*H.transpose();
        let S = &H*&PHt + R;
        let S_cholesky = match S.clone().cholesky() {
            Some(cholesky) => cholesky,
            None => {
                warn!(dimension = measurement_size, "innovation covariance is not positive definite");
                return Err(EkfError::SingularInnovationCovariance{dimension: measurement_size});
            }
        };

        // K^T = S^-1 * H * P since P and S are symmetric
        let K = S_cholesky.solve(&PHt.transpose()).transpose();
        let correction = &K*(z - h);
        self.apply_correction(&correction);
        self.covariance -= &K*&S*K.transpose();
        symmetrize(&mut self.covariance);

        self.normalize_orientation_with_covariance();

        debug!(state_size, valid_features = predictions.len(), "corrected state");
        Ok(predictions.len())
    }

    fn apply_correction(&mut self, correction: &DVector<Float>) -> () {
        assert_eq!(correction.nrows(), self.state_size());
        self.camera_state.update(&correction.fixed_rows::<CAMERA_STATE_SIZE>(0).into_owned());
        for (i,landmark) in self.landmarks.iter_mut().enumerate() {
            landmark.update(&correction.fixed_rows::<LANDMARK_PARAM_SIZE>(Ekf::landmark_offset(i)).into_owned());
        }
    }

    /**
     * The Jacobian of q/|q| is taken at the corrected, not yet normalized quaternion and applied
     * to the quaternion rows and columns before the state itself is normalized.
     */
    fn normalize_orientation_with_covariance(&mut self) -> () {
        let jacobian = quaternion::normalization_jacobian(&self.camera_state.get_orientation());

        let rows = jacobian*self.covariance.fixed_rows::<4>(ORIENTATION_OFFSET);
        self.covariance.fixed_rows_mut::<4>(ORIENTATION_OFFSET).copy_from(&rows);
        let columns = self.covariance.fixed_columns::<4>(ORIENTATION_OFFSET)*jacobian.transpose();
        self.covariance.fixed_columns_mut::<4>(ORIENTATION_OFFSET).copy_from(&columns);

        self.camera_state.normalize_orientation();
    }

    /**
     * Appends one inverse depth feature per distorted pixel, anchored at the current camera position.
     * New features correlate with the map only through the camera block.
     */
    pub fn add_features<C: Camera>(&mut self, camera: &C, pixels: &[Vector2<Float>]) -> () {
        if pixels.is_empty() {
            return;
        }

        let new_state_size = self.state_size() + LANDMARK_PARAM_SIZE*pixels.len();
        self.covariance.resize_mut(new_state_size, new_state_size, 0.0);

        let std_pixel = self.runtime_parameters.std_pixel_initialization;
        let std_rho = self.runtime_parameters.std_inverse_depth_initialization;
        let p_add = Matrix3::<Float>::from_diagonal(&Vector3::<Float>::new(std_pixel.powi(2), std_pixel.powi(2), std_rho.powi(2)));

        let p_xv = self.covariance.fixed_view::<CAMERA_STATE_SIZE,CAMERA_STATE_SIZE>(0,0).into_owned();

        for pixel in pixels {
            let insert_point = self.state_size();
            let landmark = InverseDepthLandmark::from_pixel(camera, &self.camera_state, pixel, self.runtime_parameters.initial_inverse_depth);
            let (dy_dxv, dy_dnoise) = InverseDepthLandmark::initialization_jacobians(camera, &self.camera_state, pixel);

            let cross_camera = dy_dxv*p_xv;
            self.covariance.fixed_view_mut::<LANDMARK_PARAM_SIZE,CAMERA_STATE_SIZE>(insert_point,0).copy_from(&cross_camera);
            self.covariance.fixed_view_mut::<CAMERA_STATE_SIZE,LANDMARK_PARAM_SIZE>(0,insert_point).copy_from(&cross_camera.transpose());

            let p_yy = cross_camera*dy_dxv.transpose() + dy_dnoise*p_add*dy_dnoise.transpose();
            let p_yy_symmetric = (p_yy + p_yy.transpose())*0.5;
            self.covariance.fixed_view_mut::<LANDMARK_PARAM_SIZE,LANDMARK_PARAM_SIZE>(insert_point,insert_point).copy_from(&p_yy_symmetric);

            if insert_point > CAMERA_STATE_SIZE {
                let existing_size = insert_point - CAMERA_STATE_SIZE;
                let p_xvy = self.covariance.view((0,CAMERA_STATE_SIZE),(CAMERA_STATE_SIZE,existing_size)).into_owned();
                let cross_features = dy_dxv*p_xvy;
                self.covariance.view_mut((insert_point,CAMERA_STATE_SIZE),(LANDMARK_PARAM_SIZE,existing_size)).copy_from(&cross_features);
                self.covariance.view_mut((CAMERA_STATE_SIZE,insert_point),(existing_size,LANDMARK_PARAM_SIZE)).copy_from(&cross_features.transpose());
            }

            self.landmarks.push(landmark);
        }

        debug!(added = pixels.len(), state_size = self.state_size(), "added features");
    }

    /**
     * Removes the features at the given indices. The survivors keep their relative order.
     */
    pub fn delete_features(&mut self, feature_indices: &[usize]) -> () {
        if feature_indices.is_empty() {
            return;
        }

        let number_of_features = self.landmarks.len();
        for &idx in feature_indices {
            assert!(idx < number_of_features, "feature index {} out of range for {} features", idx, number_of_features);
        }

        let mut to_delete = feature_indices.to_vec();
        to_delete.sort_unstable();
        to_delete.dedup();

        let survivors = (0..number_of_features).filter(|i| to_delete.binary_search(i).is_err()).collect::<Vec<usize>>();
        let kept_state_indices = (0..CAMERA_STATE_SIZE)
            .chain(survivors.iter().flat_map(|&i| (0..LANDMARK_PARAM_SIZE).map(move |j| Ekf::landmark_offset(i) + j)))
            .collect::<Vec<usize>>();

        self.covariance = self.covariance.select_rows(kept_state_indices.iter()).select_columns(kept_state_indices.iter());
        let landmarks = survivors.iter().map(|&i| self.landmarks[i]).collect::<Vec<InverseDepthLandmark>>();
        self.landmarks = landmarks;

        debug!(deleted = to_delete.len(), state_size = self.state_size(), "deleted features");
    }

    /**
     * Deletes every feature whose flag is false. One flag per feature is required.
     */
    pub fn delete_invalid_features(&mut self, valid_flags: &[bool]) -> () {
        assert_eq!(valid_flags.len(), self.landmarks.len(), "one validity flag per feature is required, tracker and filter are out of sync");
        let invalid = valid_flags.iter().enumerate().filter_map(|(i,&valid)| if valid { None } else { Some(i) }).collect::<Vec<usize>>();
        self.delete_features(&invalid);
    }
}

fn symmetrize_camera_block(covariance: &mut DMatrix<Float>) -> () {
    let block = covariance.fixed_view::<CAMERA_STATE_SIZE,CAMERA_STATE_SIZE>(0,0).into_owned();
    covariance.fixed_view_mut::<CAMERA_STATE_SIZE,CAMERA_STATE_SIZE>(0,0).copy_from(&((block + block.transpose())*0.5));
}
