//! Error types and handling for scribe

/// Result type alias for scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Error types for the scribe storage engine
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    /// I/O related errors (file operations, mmap, etc.)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A type descriptor could not be decoded from its byte form
    #[error("malformed descriptor at offset {offset}: {message}")]
    MalformedDescriptor { offset: usize, message: String },

    /// A payload type has no wire representation and no storage-name override
    #[error("unresolved payload type: {message}")]
    UnresolvedPayloadType { message: String },

    /// Invalid parameters or configuration
    #[error("invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// The shared segment for a group cannot be created or attached
    #[error("group unavailable: {name} - {message}")]
    GroupUnavailable { name: String, message: String },

    /// The group has been closed; no further writes are accepted
    #[error("group closed: {name}")]
    GroupClosed { name: String },

    /// A reservation that can never succeed (e.g. a batch larger than the ring)
    #[error("capacity exceeded: requested {requested}, capacity {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    /// Insufficient space in a bounded area (metadata table, scratch)
    #[error("insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Write attempted on a committed or abandoned transaction handle
    #[error("transaction misuse: {message}")]
    TransactionMisuse { message: String },

    /// Serialization/deserialization errors
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl ScribeError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a malformed descriptor error
    pub fn malformed_descriptor(offset: usize, message: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            offset,
            message: message.into(),
        }
    }

    /// Create an unresolved payload type error
    pub fn unresolved_payload(message: impl Into<String>) -> Self {
        Self::UnresolvedPayloadType {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a group unavailable error
    pub fn group_unavailable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GroupUnavailable {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a group closed error
    pub fn group_closed(name: impl Into<String>) -> Self {
        Self::GroupClosed { name: name.into() }
    }

    /// Create a capacity exceeded error
    pub fn capacity_exceeded(requested: usize, capacity: usize) -> Self {
        Self::CapacityExceeded {
            requested,
            capacity,
        }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create a transaction misuse error
    pub fn transaction_misuse(message: impl Into<String>) -> Self {
        Self::TransactionMisuse {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for ScribeError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<bincode::Error> for ScribeError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(format!("Bincode error: {}", err))
    }
}
