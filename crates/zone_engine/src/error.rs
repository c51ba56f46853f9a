//! Error taxonomy for zone construction and queries

use crate::foundation::collections::{EntityId, PlayerId, ZoneId};

/// Errors raised by zone construction, queries and controller operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ZoneError {
    /// Empty volume list or a volume with degenerate dimensions
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Query object is missing the data needed to test it
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Group name has no registered settings
    #[error("Group '{0}' has no registered settings")]
    UnboundGroup(String),

    /// Zone handle is stale or was never issued
    #[error("Unknown zone: {0:?}")]
    UnknownZone(ZoneId),

    /// Entity handle is stale or was never issued
    #[error("Unknown entity: {0:?}")]
    UnknownEntity(EntityId),

    /// Player is not registered with the controller
    #[error("Unknown player: {0:?}")]
    UnknownPlayer(PlayerId),
}

/// Result alias used across the crate
pub type ZoneResult<T> = Result<T, ZoneError>;
