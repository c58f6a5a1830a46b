extern crate nalgebra as na;

use std::sync::mpsc;
use std::thread;
use na::{Point3,Vector3,Vector4,Matrix3};
use tracing::{debug,info};

use crate::ekf::Ekf;
use crate::Float;

#[derive(Debug,Clone,PartialEq)]
pub struct FeatureSnapshot {
    pub mean: Option<Point3<Float>>,
    /// Point at rho + k*sigma
    pub close: Option<Point3<Float>>,
    /// Point at rho - k*sigma, None once the interval reaches infinity
    pub far: Option<Point3<Float>>,
    pub is_converged: bool
}

/**
 * Owned copy of everything a viewer needs for one frame
 */
#[derive(Debug,Clone,PartialEq)]
pub struct MapSnapshot {
    pub frame: usize,
    pub position: Vector3<Float>,
    pub orientation: Vector4<Float>,
    pub axes_orientation_and_confidence: Matrix3<Float>,
    pub features: Vec<FeatureSnapshot>
}

impl MapSnapshot {
    pub fn from_filter(ekf: &Ekf, frame: usize) -> MapSnapshot {
        let sigma_count = ekf.get_runtime_parameters().snapshot_sigma_count;
        let covariance = ekf.get_covariance();
        let camera_state = ekf.get_camera_state();

        let mut axes_orientation_and_confidence = camera_state.get_rotation_matrix();
        for j in 0..3 {
            let confidence = sigma_count*covariance[(j,j)].max(0.0).sqrt();
            let mut axis = axes_orientation_and_confidence.column_mut(j);
            axis *= confidence;
        }

        let features = ekf.get_landmarks().iter().enumerate().map(|(i,landmark)| {
            let rho = landmark.get_inverse_depth();
            let sigma_rho = ekf.inverse_depth_variance(i).max(0.0).sqrt();
            let mean = landmark.get_euclidean_representation();
            let close = landmark.with_inverse_depth(rho + sigma_count*sigma_rho).get_euclidean_representation();
            let far = landmark.with_inverse_depth(rho - sigma_count*sigma_rho).get_euclidean_representation();
            let anchor = Point3::<Float>::from(landmark.get_anchor());
            let is_converged = match (mean, close, far) {
                (Some(mean), Some(close), Some(far)) => {
                    let interval = na::distance(&anchor,&far) - na::distance(&anchor,&close);
                    interval < na::distance(&anchor,&mean)
                },
                _ => false
            };
            FeatureSnapshot{mean, close, far, is_converged}
        }).collect::<Vec<FeatureSnapshot>>();

        MapSnapshot {
            frame,
            position: camera_state.get_position(),
            orientation: camera_state.get_orientation(),
            axes_orientation_and_confidence,
            features
        }
    }

    pub fn number_of_converged_features(&self) -> usize {
        self.features.iter().filter(|f| f.is_converged).count()
    }
}

#[derive(Debug,Clone,Default)]
pub struct TrajectorySummary {
    pub number_of_frames: usize,
    pub trajectory: Vec<Vector3<Float>>,
    pub last_number_of_features: usize,
    pub last_number_of_converged_features: usize
}

/**
 * Consumes snapshots until every sender is dropped and returns the accumulated camera trajectory
 */
pub fn spawn_snapshot_consumer(receiver: mpsc::Receiver<MapSnapshot>) -> thread::JoinHandle<TrajectorySummary> {
    thread::spawn(move || {
        let mut summary = TrajectorySummary::default();
        for snapshot in receiver.iter() {
            debug!(frame = snapshot.frame, features = snapshot.features.len(), "received snapshot");
            summary.number_of_frames += 1;
            summary.trajectory.push(snapshot.position);
            summary.last_number_of_features = snapshot.features.len();
            summary.last_number_of_converged_features = snapshot.number_of_converged_features();
        }
        let travelled = summary.trajectory.windows(2).map(|w| (w[1] - w[0]).norm()).sum::<Float>();
        info!(frames = summary.number_of_frames, travelled, features = summary.last_number_of_features, converged = summary.last_number_of_converged_features, "snapshot consumer finished");
        summary
    })
}
