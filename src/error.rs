use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The encoder only addresses thrusters 1 through 7.
    #[error("thruster id {id} is outside the addressable range 1-7")]
    InvalidConfiguration { id: i64 },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid bench configuration: {0}")]
    Config(String),
}

pub type Result<T> = core::result::Result<T, CodecError>;
