use ekf_monoslam::ekf::{error::EkfError,runtime_parameters::EkfRuntimeParameters};
use ekf_monoslam::sensors::camera::radial_distortion::RadialDistortion;
use ekf_monoslam::slam_system::SlamConfig;
use ekf_monoslam::tracking::TrackerRuntimeParameters;

#[test]
fn defaults_match_sample_sequence() {
    let parameters = EkfRuntimeParameters::default();
    assert_eq!(parameters.initial_velocity, 0.0);
    assert_eq!(parameters.std_initial_velocity, 0.025);
    assert_eq!(parameters.initial_angular_velocity, 1e-15);
    assert_eq!(parameters.std_acceleration, 0.007);
    assert_eq!(parameters.std_angular_acceleration, 0.007);
    assert_eq!(parameters.std_image_noise, 1.0);
    assert!(!parameters.predict_without_features);
    assert!(parameters.validate().is_ok());

    let camera = RadialDistortion::default();
    assert_eq!(camera.d, 0.0112);
    assert_eq!(camera.f, 2.1735);

    let tracker = TrackerRuntimeParameters::default();
    assert_eq!(tracker.min_number_of_features, 30);
    assert_eq!(tracker.min_distance_between_features, 20.0);
}

#[test]
fn partial_yaml_falls_back_to_defaults() {
    let yaml = "
filter:
  std_image_noise: 2.0
  predict_without_features: true
tracker:
  min_number_of_features: 12
delta_t: 0.5
";
    let config = SlamConfig::from_yaml_str(yaml).expect("valid config");
    assert_eq!(config.filter.std_image_noise, 2.0);
    assert!(config.filter.predict_without_features);
    assert_eq!(config.filter.std_acceleration, EkfRuntimeParameters::default().std_acceleration);
    assert_eq!(config.tracker.min_number_of_features, 12);
    assert_eq!(config.tracker.min_distance_between_features, 20.0);
    assert_eq!(config.camera, RadialDistortion::default());
    assert_eq!(config.delta_t, 0.5);
}

#[test]
fn config_round_trips_through_yaml() {
    let mut config = SlamConfig::default();
    config.filter.initial_inverse_depth = 0.25;
    config.camera.k1 = 0.1;
    let yaml = serde_yaml::to_string(&config).expect("serializable config");
    assert_eq!(SlamConfig::from_yaml_str(&yaml).expect("valid config"), config);
}

#[test]
fn invalid_parameters_are_rejected() {
    match EkfRuntimeParameters::from_yaml_str("std_image_noise: -1.0") {
        Err(EkfError::InvalidParameter{name, value}) => {
            assert_eq!(name, "std_image_noise");
            assert_eq!(value, -1.0);
        },
        other => panic!("expected invalid parameter, got {:?}", other)
    };

    match SlamConfig::from_yaml_str("filter:\n  initial_inverse_depth: 0.0\n") {
        Err(EkfError::InvalidParameter{name, ..}) => assert_eq!(name, "initial_inverse_depth"),
        other => panic!("expected invalid parameter, got {:?}", other)
    };

    match SlamConfig::from_yaml_str("camera:\n  d: 0.0112\n  cx: 160.0\n  cy: 128.0\n  k1: 0.0\n  k2: 0.0\n  f: -1.0\n") {
        Err(EkfError::InvalidParameter{name, ..}) => assert_eq!(name, "camera.f"),
        other => panic!("expected invalid parameter, got {:?}", other)
    };
}

#[test]
fn malformed_yaml_is_a_config_error() {
    assert!(matches!(SlamConfig::from_yaml_str("filter: [1, 2"), Err(EkfError::Config(_))));
    assert!(matches!(EkfRuntimeParameters::from_yaml_str("std_acceleration: fast"), Err(EkfError::Config(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(SlamConfig::load("/nonexistent/slam_config.yaml"), Err(EkfError::Io(_))));
}

#[test]
fn display_lists_noise_parameters() {
    let display = format!("{}", EkfRuntimeParameters::default());
    assert!(display.starts_with("v0_"));
    assert!(display.contains("_sa_"));
    assert!(!display.contains("predict_empty"));
}
