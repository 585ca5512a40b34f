use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    /* mapped errors */
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /* framing errors */
    #[error("Unknown packet type {0}")]
    UnknownPacketType(u8),

    #[error("{what}: need {needed} bytes, got {actual}")]
    Truncated {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    /* request construction errors */
    #[error("Authorize token of {0} bytes does not fit the auth frame (max 255)")]
    AuthTokenTooLong(usize),

    #[error("Authorize token must be plain ASCII")]
    AuthTokenNotAscii,

    /* addressing errors */
    #[error("Home id must be non-zero to derive a mesh address")]
    ZeroHomeId,

    #[error("Derived mesh address {0} does not fit the wire format")]
    MeshOutOfRange(u64),
}

pub type ProtoResult<T> = Result<T, ProtoError>;
