extern crate nalgebra as na;

use std::sync::mpsc;
use approx::assert_relative_eq;
use ekf_monoslam::Float;
use ekf_monoslam::ekf::camera_state::CAMERA_STATE_SIZE;
use ekf_monoslam::ekf::landmark::inverse_depth_landmark::LANDMARK_PARAM_SIZE;
use ekf_monoslam::ekf::runtime_parameters::EkfRuntimeParameters;
use ekf_monoslam::numerics::max_asymmetry;
use ekf_monoslam::sensors::camera::radial_distortion::RadialDistortion;
use ekf_monoslam::slam_system::MonoSlamSystem;
use ekf_monoslam::tracking::{FeatureTracker,TrackerRuntimeParameters};
use ekf_monoslam::tracking::synthetic::{SyntheticScene,SyntheticTracker};
use ekf_monoslam::visualize::{MapSnapshot,spawn_snapshot_consumer};

const IMAGE_WIDTH: Float = 320.0;
const IMAGE_HEIGHT: Float = 240.0;

fn synthetic_system(number_of_frames: usize) -> MonoSlamSystem<RadialDistortion,SyntheticTracker<RadialDistortion>> {
    let camera = RadialDistortion::default();
    let scene = SyntheticScene::sideways_motion(300, number_of_frames, 5);
    let tracker = SyntheticTracker::new(camera, scene, IMAGE_WIDTH, IMAGE_HEIGHT, TrackerRuntimeParameters::default());
    MonoSlamSystem::new(EkfRuntimeParameters::default(), camera, tracker, 1.0)
}

#[test]
fn synthetic_tracker_keeps_minimum_number_of_features() {
    let camera = RadialDistortion::default();
    let scene = SyntheticScene::sideways_motion(300, 5, 5);
    let parameters = TrackerRuntimeParameters::default();
    let mut tracker = SyntheticTracker::new(camera, scene, IMAGE_WIDTH, IMAGE_HEIGHT, parameters.clone());

    let first = tracker.track(&[]);
    assert!(first.tracked.is_empty());
    assert!(first.lost.is_empty());
    assert_eq!(first.new_features.len(), parameters.min_number_of_features);
    for (i,a) in first.new_features.iter().enumerate() {
        assert!(a[0] >= 0.0 && a[0] < IMAGE_WIDTH && a[1] >= 0.0 && a[1] < IMAGE_HEIGHT);
        for b in first.new_features.iter().skip(i+1) {
            assert!((a - b).norm() >= parameters.min_distance_between_features);
        }
    }
    assert_eq!(tracker.get_tracked_world_points().len(), parameters.min_number_of_features);
}

#[test]
fn synthetic_tracker_reports_invalid_predictions_as_lost() {
    let camera = RadialDistortion::default();
    let scene = SyntheticScene::sideways_motion(300, 5, 5);
    let mut tracker = SyntheticTracker::new(camera, scene, IMAGE_WIDTH, IMAGE_HEIGHT, TrackerRuntimeParameters::default());
    let first = tracker.track(&[]);

    let mut predictions = first.new_features.iter()
        .map(|&pixel| ekf_monoslam::ekf::FeaturePrediction{h: Some(pixel)})
        .collect::<Vec<_>>();
    predictions[2] = ekf_monoslam::ekf::FeaturePrediction{h: None};

    let second = tracker.track(&predictions);
    assert!(second.lost.contains(&2));
    assert_eq!(second.tracked.len(), predictions.len() - second.lost.len());
}

#[test]
fn pipeline_keeps_filter_consistent() {
    let number_of_frames = 40;
    let mut system = synthetic_system(number_of_frames);

    for _ in 0..number_of_frames {
        let report = system.process_frame();
        let ekf = system.get_filter();
        let n = CAMERA_STATE_SIZE + LANDMARK_PARAM_SIZE*ekf.number_of_features();

        assert!(!report.update_skipped);
        assert_eq!(report.state_size, n);
        assert_eq!(ekf.get_covariance().shape(), (n,n));
        assert!(max_asymmetry(ekf.get_covariance()) < 1e-9);
        assert_relative_eq!(ekf.get_camera_state().get_orientation().norm(), 1.0, epsilon = 1e-9);
        assert!(ekf.state_vector().iter().all(|v| v.is_finite()));
        assert_eq!(ekf.number_of_features(), system.get_tracker().get_tracked_world_points().len());
    }
}

#[test]
fn pipeline_reduces_inverse_depth_uncertainty() {
    let number_of_frames = 60;
    let mut system = synthetic_system(number_of_frames);
    let reports = system.run(number_of_frames, None);
    assert_eq!(reports.len(), number_of_frames);
    assert!(reports.iter().skip(1).all(|r| r.updated > 0));

    let ekf = system.get_filter();
    let initial_variance = ekf.get_runtime_parameters().std_inverse_depth_initialization.powi(2);
    let smallest_variance = (0..ekf.number_of_features())
        .map(|i| ekf.inverse_depth_variance(i))
        .fold(Float::INFINITY, Float::min);
    assert!(smallest_variance < 0.25*initial_variance);
}

#[test]
fn snapshots_reach_the_consumer() {
    let number_of_frames = 10;
    let (sender, receiver) = mpsc::channel::<MapSnapshot>();
    let consumer = spawn_snapshot_consumer(receiver);

    let mut system = synthetic_system(number_of_frames).with_snapshot_sender(sender);
    let reports = system.run(number_of_frames, None);
    system.close_snapshot_channel();

    let summary = consumer.join().expect("consumer thread");
    assert_eq!(summary.number_of_frames, reports.len());
    assert_eq!(summary.trajectory.len(), reports.len());
    assert_eq!(summary.last_number_of_features, system.get_filter().number_of_features());
}

#[test]
fn snapshot_describes_filter() {
    let mut system = synthetic_system(3);
    system.run(3, None);
    let ekf = system.get_filter();
    let snapshot = MapSnapshot::from_filter(ekf, 2);

    assert_eq!(snapshot.frame, 2);
    assert_eq!(snapshot.position, ekf.get_camera_state().get_position());
    assert_eq!(snapshot.features.len(), ekf.number_of_features());
    for (feature,landmark) in snapshot.features.iter().zip(ekf.get_landmarks().iter()) {
        assert_eq!(feature.mean, landmark.get_euclidean_representation());
        let anchor = na::Point3::<Float>::from(landmark.get_anchor());
        let mean = feature.mean.expect("positive inverse depth");
        let close = feature.close.expect("close point always exists for positive inverse depth");
        assert!(na::distance(&anchor, &close) <= na::distance(&anchor, &mean));
        if let Some(far) = feature.far {
            assert!(na::distance(&anchor, &far) >= na::distance(&anchor, &mean));
        }
    }
}

#[test]
fn abort_stops_between_frames() {
    let mut system = synthetic_system(10);
    let (abort_sender, abort_receiver) = mpsc::channel::<bool>();
    system.run(2, Some(&abort_receiver));
    abort_sender.send(true).expect("receiver alive");
    let reports = system.run(8, Some(&abort_receiver));
    assert!(reports.is_empty());
    assert_eq!(system.get_frame(), 2);
}
