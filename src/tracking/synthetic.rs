extern crate nalgebra as na;

use na::{Point3,Vector2,Vector3,Vector4,Matrix3};
use rand::{Rng,SeedableRng,rngs::SmallRng};
use rand_distr::Normal;
use tracing::debug;

use crate::ekf::FeaturePrediction;
use crate::numerics::quaternion;
use crate::sensors::camera::Camera;
use crate::tracking::{FeatureTracker,FrameObservations,TrackerRuntimeParameters,is_far_enough};
use crate::Float;

/**
 * Ground truth camera pose. The quaternion rotates camera frame vectors into the world frame.
 */
#[derive(Debug,Copy,Clone,PartialEq)]
pub struct CameraPose {
    pub position: Vector3<Float>,
    pub orientation: Vector4<Float>
}

impl CameraPose {
    pub fn get_rotation_matrix(&self) -> Matrix3<Float> {
        quaternion::rotation_matrix(&self.orientation)
    }

    pub fn world_to_camera(&self, point: &Point3<Float>) -> Vector3<Float> {
        self.get_rotation_matrix().transpose()*(point.coords - self.position)
    }
}

#[derive(Debug,Clone)]
pub struct SyntheticScene {
    pub world_points: Vec<Point3<Float>>,
    pub trajectory: Vec<CameraPose>
}

impl SyntheticScene {

    /**
     * Constant velocity and constant turn rate trajectory starting at the origin with identity orientation.
     * Velocities are per frame.
     */
    pub fn constant_velocity_trajectory(number_of_frames: usize, velocity: &Vector3<Float>, angular_velocity: &Vector3<Float>) -> Vec<CameraPose> {
        let step = quaternion::from_rotation_vector(angular_velocity);
        let mut orientation = quaternion::identity();
        let mut position = Vector3::<Float>::zeros();
        let mut trajectory = Vec::<CameraPose>::with_capacity(number_of_frames);
        for _ in 0..number_of_frames {
            trajectory.push(CameraPose{position, orientation});
            position += velocity;
            orientation = quaternion::product(&orientation, &step).normalize();
        }
        trajectory
    }

    pub fn random_points(number_of_points: usize, min: &Vector3<Float>, max: &Vector3<Float>, seed: u64) -> Vec<Point3<Float>> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..number_of_points).map(|_| Point3::<Float>::new(
            rng.gen_range(min[0]..max[0]),
            rng.gen_range(min[1]..max[1]),
            rng.gen_range(min[2]..max[2])
        )).collect()
    }

    /**
     * Camera translating sideways along x with a slow turn about y in front of a box of points
     */
    pub fn sideways_motion(number_of_points: usize, number_of_frames: usize, seed: u64) -> SyntheticScene {
        let velocity = Vector3::<Float>::new(0.01, 0.0, 0.0);
        let angular_velocity = Vector3::<Float>::new(0.0, 0.001, 0.0);
        let trajectory = SyntheticScene::constant_velocity_trajectory(number_of_frames, &velocity, &angular_velocity);
        let travel = velocity[0]*number_of_frames as Float;
        let world_points = SyntheticScene::random_points(
            number_of_points,
            &Vector3::<Float>::new(-2.0, -1.5, 2.0),
            &Vector3::<Float>::new(2.0 + travel, 1.5, 6.0),
            seed
        );
        SyntheticScene{world_points, trajectory}
    }
}

/**
 * Tracker that observes a known point cloud from a known trajectory.
 * Every call to track consumes one pose of the trajectory.
 */
pub struct SyntheticTracker<C: Camera> {
    camera: C,
    scene: SyntheticScene,
    image_width: Float,
    image_height: Float,
    parameters: TrackerRuntimeParameters,
    frame: usize,
    track_ids: Vec<usize>,
    pixel_noise: Option<Normal<Float>>,
    rng: SmallRng
}

impl<C: Camera> SyntheticTracker<C> {
    pub fn new(camera: C, scene: SyntheticScene, image_width: Float, image_height: Float, parameters: TrackerRuntimeParameters) -> SyntheticTracker<C> {
        assert!(!scene.trajectory.is_empty());
        SyntheticTracker {
            camera,
            scene,
            image_width,
            image_height,
            parameters,
            frame: 0,
            track_ids: Vec::new(),
            pixel_noise: None,
            rng: SmallRng::seed_from_u64(0)
        }
    }

    /**
     * Adds zero mean gaussian noise to every reported pixel. A non positive std disables the noise.
     */
    pub fn with_pixel_noise(mut self, std_pixel: Float, seed: u64) -> SyntheticTracker<C> {
        self.pixel_noise = Normal::new(0.0, std_pixel).ok().filter(|_| std_pixel > 0.0);
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn number_of_frames(&self) -> usize {
        self.scene.trajectory.len()
    }

    pub fn is_finished(&self) -> bool {
        self.frame >= self.scene.trajectory.len()
    }

    pub fn get_scene(&self) -> &SyntheticScene {
        &self.scene
    }

    /**
     * World points behind the filter features, in state order
     */
    pub fn get_tracked_world_points(&self) -> Vec<Point3<Float>> {
        self.track_ids.iter().map(|&id| self.scene.world_points[id]).collect()
    }

    /**
     * Distorted pixel of a world point, None if it is behind the camera or outside of the image
     */
    pub fn observe(&self, pose: &CameraPose, point: &Point3<Float>) -> Option<Vector2<Float>> {
        let point_cam = pose.world_to_camera(point);
        if point_cam[2] <= 0.0 {
            return None;
        }
        self.camera.project(&point_cam).filter(|pixel| self.is_inside_image(pixel))
    }

    fn is_inside_image(&self, pixel: &Vector2<Float>) -> bool {
        pixel[0] >= 0.0 && pixel[0] < self.image_width && pixel[1] >= 0.0 && pixel[1] < self.image_height
    }

    fn add_noise(&mut self, pixel: Vector2<Float>) -> Vector2<Float> {
        match self.pixel_noise {
            Some(normal) => pixel + Vector2::<Float>::new(self.rng.sample(normal), self.rng.sample(normal)),
            None => pixel
        }
    }
}

impl<C: Camera> FeatureTracker for SyntheticTracker<C> {
    fn track(&mut self, predictions: &[FeaturePrediction]) -> FrameObservations {
        assert!(!self.is_finished(), "trajectory exhausted after {} frames", self.scene.trajectory.len());
        assert_eq!(predictions.len(), self.track_ids.len(), "tracker and filter are out of sync");

        let pose = self.scene.trajectory[self.frame];
        let mut observations = FrameObservations::default();
        let mut survivors = Vec::<usize>::with_capacity(self.track_ids.len());
        let mut clean_pixels = Vec::<Vector2<Float>>::with_capacity(self.track_ids.len());

        for (i,(&id,prediction)) in self.track_ids.iter().zip(predictions.iter()).enumerate() {
            match (self.observe(&pose, &self.scene.world_points[id]), prediction.is_valid()) {
                (Some(pixel), true) => {
                    survivors.push(id);
                    clean_pixels.push(pixel);
                },
                _ => observations.lost.push(i)
            };
        }
        observations.tracked = clean_pixels.iter().map(|&pixel| self.add_noise(pixel)).collect();
        self.track_ids = survivors;

        let min_features = self.parameters.min_number_of_features;
        let min_distance = self.parameters.min_distance_between_features;
        if self.track_ids.len() < min_features {
            let mut occupied = clean_pixels;
            for id in 0..self.scene.world_points.len() {
                if self.track_ids.len() >= min_features {
                    break;
                }
                if self.track_ids.contains(&id) {
                    continue;
                }
                if let Some(pixel) = self.observe(&pose, &self.scene.world_points[id]) {
                    if is_far_enough(&pixel, &occupied, min_distance) {
                        occupied.push(pixel);
                        self.track_ids.push(id);
                        let noisy = self.add_noise(pixel);
                        observations.new_features.push(noisy);
                    }
                }
            }
        }

        debug!(frame = self.frame, tracked = observations.tracked.len(), lost = observations.lost.len(), new = observations.new_features.len(), "synthetic tracking");
        self.frame += 1;
        observations
    }
}
