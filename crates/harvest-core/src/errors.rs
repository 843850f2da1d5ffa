/// Core error type for the harvester.
///
/// Adapter crates should map their specific errors into this type so front ends
/// can handle failures consistently (structured reply vs abort).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("external error: {0}")]
    External(String),
}

/// Failures reported by the platform account, already classified by the adapter.
///
/// The invite flow buckets attempts by these variants; enumeration treats every
/// variant as a per-group failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("user is already a participant")]
    AlreadyParticipant,

    #[error("user privacy settings forbid this")]
    PrivacyRestricted,

    #[error("admin rights are required")]
    AdminRequired,

    #[error("flood wait of {seconds}s requested")]
    FloodWait { seconds: u32 },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
