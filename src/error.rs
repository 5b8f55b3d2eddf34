// Game error types: malformed actions, catalog lookups, settings and snapshots

use thiserror::Error;

/// Errors surfaced by the simulation core.
///
/// Invalid player intent (too many cards, unaffordable purchases) is never an
/// error; those calls are no-ops that report a rejection value instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Malformed card {card}: {reason}")]
    MalformedCard { card: String, reason: String },
    #[error("Unknown catalog item '{0}'")]
    UnknownItem(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
