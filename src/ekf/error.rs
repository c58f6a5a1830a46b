use crate::Float;

#[derive(Debug, thiserror::Error)]
pub enum EkfError {
    #[error("innovation covariance of dimension {dimension} is not positive definite, update skipped")]
    SingularInnovationCovariance { dimension: usize },
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: Float },
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, EkfError>;
