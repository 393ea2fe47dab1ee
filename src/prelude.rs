//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use stageflow::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::core::TickControl;

// Errors
pub use crate::core::error::{FlowError, ReceiveError};

// Scene graph
pub use crate::core::scene::{NodeId, NodeTree, SceneGraph, SceneLibrary};

// Components
pub use crate::core::component::{Component, ComponentFactory, Receiver};

// Messages
pub use crate::core::message::{CommandSender, Context, DispatchFault, EngineCommand, Event, Message, MessageKinds, TimerContext};

// Stages and timers
pub use crate::core::stage::{Stage, StageState};
pub use crate::core::timer::{TimerKey, TimerSystem};
