use std::fmt;
use serde::{Serialize, Deserialize};
use crate::ekf::error::{EkfError,Result};
use crate::Float;

/**
 * Construction time parameters of the filter. Missing YAML keys fall back to the defaults,
 * which are the values used for the sample monocular sequence.
 */
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct EkfRuntimeParameters {
    pub initial_velocity: Float,
    pub std_initial_velocity: Float,
    pub initial_angular_velocity: Float,
    pub std_initial_angular_velocity: Float,
    pub std_acceleration: Float,
    pub std_angular_acceleration: Float,
    pub std_image_noise: Float,
    pub initial_inverse_depth: Float,
    pub std_pixel_initialization: Float,
    pub std_inverse_depth_initialization: Float,
    pub predict_without_features: bool,
    pub snapshot_sigma_count: Float
}

impl Default for EkfRuntimeParameters {
    fn default() -> EkfRuntimeParameters {
        EkfRuntimeParameters {
            initial_velocity: 0.0,
            std_initial_velocity: 0.025,
            // not exactly zero, the angular velocity derivative is singular there
            initial_angular_velocity: 1e-15,
            std_initial_angular_velocity: 0.025,
            std_acceleration: 0.007,
            std_angular_acceleration: 0.007,
            std_image_noise: 1.0,
            initial_inverse_depth: 1.0,
            std_pixel_initialization: 1.0,
            std_inverse_depth_initialization: 1.0,
            predict_without_features: false,
            snapshot_sigma_count: 3.0
        }
    }
}

impl EkfRuntimeParameters {
    pub fn from_yaml_str(yaml: &str) -> Result<EkfRuntimeParameters> {
        let parameters: EkfRuntimeParameters = serde_yaml::from_str(yaml)?;
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("std_initial_velocity", self.std_initial_velocity),
            ("std_initial_angular_velocity", self.std_initial_angular_velocity),
            ("std_acceleration", self.std_acceleration),
            ("std_angular_acceleration", self.std_angular_acceleration),
            ("std_pixel_initialization", self.std_pixel_initialization),
            ("std_inverse_depth_initialization", self.std_inverse_depth_initialization),
            ("snapshot_sigma_count", self.snapshot_sigma_count)
        ];
        for (name,value) in non_negative.iter() {
            if !(*value >= 0.0) || !value.is_finite() {
                return Err(EkfError::InvalidParameter{name: *name,value: *value});
            }
        }

        let positive = [
            ("std_image_noise", self.std_image_noise),
            ("initial_inverse_depth", self.initial_inverse_depth)
        ];
        for (name,value) in positive.iter() {
            if !(*value > 0.0) || !value.is_finite() {
                return Err(EkfError::InvalidParameter{name: *name,value: *value});
            }
        }

        Ok(())
    }
}

impl fmt::Display for EkfRuntimeParameters {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut display = String::from(format!("v0_{:+e}_sv0_{:+e}_w0_{:+e}_sw0_{:+e}",
            self.initial_velocity,self.std_initial_velocity,self.initial_angular_velocity,self.std_initial_angular_velocity));
        display.push_str(format!("_sa_{:+e}_salpha_{:+e}_sz_{:+e}",self.std_acceleration,self.std_angular_acceleration,self.std_image_noise).as_str());
        display.push_str(format!("_rho0_{:+e}",self.initial_inverse_depth).as_str());
        if self.predict_without_features {
            display.push_str("_predict_empty");
        }
        write!(f, "{}", display)
    }

}
