//! Error types for the command resolution loop.

use conduit_action::DispatchError;

/// Fatal errors from the resolution loop.
///
/// Dispatch and parse failures of individual commands are not errors here;
/// the loop feeds them back to the responder as conversation notes.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("responder error: {0}")]
    Responder(String),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}
