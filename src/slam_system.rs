use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;
use serde::{Serialize, Deserialize};
use tracing::{debug,info,warn};

use crate::ekf::{Ekf,error::{EkfError,Result},runtime_parameters::EkfRuntimeParameters};
use crate::sensors::camera::{Camera,radial_distortion::RadialDistortion};
use crate::tracking::{FeatureTracker,TrackerRuntimeParameters};
use crate::visualize::MapSnapshot;
use crate::Float;

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct SlamConfig {
    pub filter: EkfRuntimeParameters,
    pub camera: RadialDistortion,
    pub tracker: TrackerRuntimeParameters,
    pub delta_t: Float
}

impl Default for SlamConfig {
    fn default() -> SlamConfig {
        SlamConfig {
            filter: EkfRuntimeParameters::default(),
            camera: RadialDistortion::default(),
            tracker: TrackerRuntimeParameters::default(),
            delta_t: 1.0
        }
    }
}

impl SlamConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<SlamConfig> {
        let config: SlamConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<SlamConfig> {
        let yaml = fs::read_to_string(path)?;
        SlamConfig::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        let positive = [
            ("camera.d", self.camera.d),
            ("camera.f", self.camera.f),
            ("delta_t", self.delta_t),
            ("tracker.min_distance_between_features", self.tracker.min_distance_between_features)
        ];
        for (name,value) in positive.iter() {
            if !(*value > 0.0) || !value.is_finite() {
                return Err(EkfError::InvalidParameter{name: *name, value: *value});
            }
        }
        Ok(())
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Default)]
pub struct FrameReport {
    pub frame: usize,
    pub tracked: usize,
    pub lost: usize,
    pub added: usize,
    pub updated: usize,
    pub update_skipped: bool,
    pub state_size: usize
}

/**
 * Frame sequential monocular SLAM loop around the filter.
 * Per frame: predict, predict measurements, track, delete lost, update, add new, publish.
 */
pub struct MonoSlamSystem<C: Camera, T: FeatureTracker> {
    ekf: Ekf,
    camera: C,
    tracker: T,
    delta_t: Float,
    frame: usize,
    snapshot_sender: Option<mpsc::Sender<MapSnapshot>>
}

impl<C: Camera, T: FeatureTracker> MonoSlamSystem<C,T> {
    pub fn new(runtime_parameters: EkfRuntimeParameters, camera: C, tracker: T, delta_t: Float) -> MonoSlamSystem<C,T> {
        assert!(delta_t >= 0.0);
        MonoSlamSystem {
            ekf: Ekf::new(runtime_parameters),
            camera,
            tracker,
            delta_t,
            frame: 0,
            snapshot_sender: None
        }
    }

    pub fn with_snapshot_sender(mut self, sender: mpsc::Sender<MapSnapshot>) -> MonoSlamSystem<C,T> {
        self.snapshot_sender = Some(sender);
        self
    }

    pub fn get_filter(&self) -> &Ekf {
        &self.ekf
    }

    pub fn get_tracker(&self) -> &T {
        &self.tracker
    }

    pub fn get_frame(&self) -> usize {
        self.frame
    }

    /**
     * Drops the snapshot sender so a consumer iterating the channel terminates
     */
    pub fn close_snapshot_channel(&mut self) -> () {
        self.snapshot_sender = None;
    }

    pub fn process_frame(&mut self) -> FrameReport {
        let frame_start = Instant::now();

        let predict_start = Instant::now();
        self.ekf.predict_state_and_covariance(self.delta_t);
        let predictions = self.ekf.predict_measurements(&self.camera);
        debug!(frame = self.frame, elapsed_us = predict_start.elapsed().as_micros() as u64, "prediction");

        let track_start = Instant::now();
        let observations = self.tracker.track(&predictions);
        debug!(frame = self.frame, elapsed_us = track_start.elapsed().as_micros() as u64, "tracking");

        self.ekf.delete_features(&observations.lost);
        assert_eq!(observations.tracked.len(), self.ekf.number_of_features(), "tracker returned {} measurements for {} features", observations.tracked.len(), self.ekf.number_of_features());

        let update_start = Instant::now();
        let (updated, update_skipped) = match self.ekf.update(&self.camera, &observations.tracked) {
            Ok(updated) => (updated, false),
            Err(e) => {
                warn!(frame = self.frame, "{}", e);
                (0, true)
            }
        };
        debug!(frame = self.frame, elapsed_us = update_start.elapsed().as_micros() as u64, "update");

        self.ekf.add_features(&self.camera, &observations.new_features);

        self.publish_snapshot();

        let report = FrameReport {
            frame: self.frame,
            tracked: observations.tracked.len(),
            lost: observations.lost.len(),
            added: observations.new_features.len(),
            updated,
            update_skipped,
            state_size: self.ekf.state_size()
        };
        info!(frame = report.frame, tracked = report.tracked, lost = report.lost, added = report.added, state_size = report.state_size, elapsed_us = frame_start.elapsed().as_micros() as u64, "frame processed");

        self.frame += 1;
        report
    }

    /**
     * Processes up to number_of_frames frames. The abort receiver is polled between frames.
     */
    pub fn run(&mut self, number_of_frames: usize, abort_receiver: Option<&mpsc::Receiver<bool>>) -> Vec<FrameReport> {
        let mut reports = Vec::<FrameReport>::with_capacity(number_of_frames);
        for _ in 0..number_of_frames {
            let abort = match abort_receiver {
                Some(receiver) => receiver.try_recv().unwrap_or(false),
                None => false
            };
            if abort {
                info!(frame = self.frame, "aborted");
                break;
            }
            reports.push(self.process_frame());
        }
        reports
    }

    fn publish_snapshot(&mut self) -> () {
        let send_failed = match &self.snapshot_sender {
            Some(sender) => sender.send(MapSnapshot::from_filter(&self.ekf, self.frame)).is_err(),
            None => false
        };
        if send_failed {
            warn!(frame = self.frame, "snapshot consumer disconnected");
            self.snapshot_sender = None;
        }
    }
}
