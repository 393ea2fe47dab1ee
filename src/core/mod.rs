//=========================================================================
// Core
//=========================================================================
//
// Building blocks driven by the Engine:
//
//   scene      SceneGraph trait, reference NodeTree, scene libraries
//   component  Receiver trait, Component variants, per-stage arena
//   message    Message kinds, contexts, dispatch and engine commands
//   stage      Stage lifecycle and node snapshots
//   timer      Speed-scaled per-stage timers
//   error      Error types shared by all of the above
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::error::FlowError;

//=== Module Declarations =================================================

pub mod component;
pub mod error;
pub mod message;
pub mod scene;
pub mod stage;
pub mod timer;

//=== TickControl =========================================================
//
// Result of one engine tick: keep going, or the host should stop its loop.
//
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Quit,
}

impl TickControl {
    /// Maps a quit request to `FlowError::QuitRequested` so a host loop can
    /// use `?`.
    pub fn into_result(self) -> Result<(), FlowError> {
        match self {
            TickControl::Continue => Ok(()),
            TickControl::Quit => Err(FlowError::QuitRequested),
        }
    }

    pub fn is_quit(self) -> bool {
        self == TickControl::Quit
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_maps_to_error() {
        assert_eq!(TickControl::Continue.into_result(), Ok(()));
        assert_eq!(TickControl::Quit.into_result(), Err(FlowError::QuitRequested));
        assert!(TickControl::Quit.is_quit());
    }
}
