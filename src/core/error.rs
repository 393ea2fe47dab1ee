//=========================================================================
// Errors
//=========================================================================
//
// Error taxonomy for engine and stage operations, plus the failure type
// component handlers report back to the dispatcher.
//
// None of these cross a dispatch boundary: a failing handler is logged
// and recorded as a fault, and delivery continues with the next node.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== FlowError ===========================================================

/// Errors returned by [`crate::Engine`] and [`crate::core::stage::Stage`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// `set_scene` was called without a template.
    #[error("stage '{stage}' cannot run without a scene template")]
    InvalidScene {
        /// Name of the stage the template was meant for.
        stage: String,
    },

    /// No registered library holds a scene with this name.
    #[error("no scene named '{0}' in any registered library")]
    SceneNotFound(String),

    /// A stage with this name is already registered.
    #[error("a stage named '{0}' already exists")]
    DuplicateStageName(String),

    /// No stage with this name is registered.
    #[error("no stage named '{0}'")]
    StageNotFound(String),

    /// The engine was asked to quit. Not a failure.
    #[error("engine quit requested")]
    QuitRequested,
}

//=== ReceiveError ========================================================

/// Failure reported by a component while handling a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ReceiveError(String);

impl ReceiveError {
    /// Creates a handler failure with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the failure description.
    pub fn message(&self) -> &str {
        &self.0
    }
}

//=== Tests ===============================================================
