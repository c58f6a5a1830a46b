extern crate nalgebra as na;

use na::Vector2;
use serde::{Serialize, Deserialize};
use crate::ekf::FeaturePrediction;
use crate::Float;

pub mod synthetic;

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct TrackerRuntimeParameters {
    pub min_number_of_features: usize,
    pub min_distance_between_features: Float
}

impl Default for TrackerRuntimeParameters {
    fn default() -> TrackerRuntimeParameters {
        TrackerRuntimeParameters {
            min_number_of_features: 30,
            min_distance_between_features: 20.0
        }
    }
}

/**
 * Result of tracking one frame.
 * lost indexes the feature list before deletion, tracked is aligned with the list after deletion
 * and new_features are distorted pixels to be appended after the update.
 */
#[derive(Debug,Clone,Default)]
pub struct FrameObservations {
    pub tracked: Vec<Vector2<Float>>,
    pub lost: Vec<usize>,
    pub new_features: Vec<Vector2<Float>>
}

/**
 * Source of image measurements. One prediction per filter feature is given in state order.
 * Features whose prediction is invalid have to be reported as lost.
 */
pub trait FeatureTracker {
    fn track(&mut self, predictions: &[FeaturePrediction]) -> FrameObservations;
}

pub fn is_far_enough(pixel: &Vector2<Float>, others: &[Vector2<Float>], min_distance: Float) -> bool {
    others.iter().all(|other| (other - pixel).norm() >= min_distance)
}
