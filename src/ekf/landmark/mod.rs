pub mod inverse_depth_landmark;
pub mod measurement;
