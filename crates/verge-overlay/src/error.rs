use thiserror::Error;

/// Errors surfaced by the remote overlay proxy.
///
/// Callers of the public client contract never see these: remote failures are
/// logged and swallowed, and the client relies on the asynchronous disconnect
/// notification to reset its state.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("overlay service disconnected")]
    Disconnected,

    #[error("remote call failed: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
