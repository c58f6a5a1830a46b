pub mod numerics;
pub mod sensors;
pub mod ekf;
pub mod tracking;
pub mod visualize;
pub mod slam_system;

macro_rules! define_float {
    ($f:tt) => {
        pub use std::$f as float;
        pub type Float = $f;
    }
}

define_float!(f64);
