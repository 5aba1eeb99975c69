use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ControllerError {
    #[error("Invalid occupancy payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Temperature sensor read failed: {0}")]
    SensorRead(String),

    #[error("Actuator write failed on {channel}: {reason}")]
    ActuatorWrite { channel: String, reason: String },

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
