//=========================================================================
// Components
//=========================================================================
//
// User-authored logic attached to scene nodes.
//
// A node carries at most one Component. The factory decides, the first
// time a node is seen with an empty slot, whether it gets one; that
// decision is cached in the stage's ComponentArena and never revisited
// while the node exists.
//
// Capabilities are explicit variants:
//   Component::Receiver: dispatch-eligible, enters the node snapshot
//   Component::Inert:    animation advancement only, never dispatched
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::error::ReceiveError;
use crate::core::message::{Context, Event, Message, MessageKinds};
use crate::core::scene::SceneGraph;

//=== Module Declarations =================================================

mod arena;

//=== Public API ==========================================================

pub use arena::ComponentArena;
pub(crate) use arena::Eligibility;

//=== Receiver Trait ======================================================

/// Capability of receiving lifecycle and custom messages.
///
/// Only `receive_message()` is required. `interests()` defaults to every
/// kind; override it to have the dispatcher skip the rest.
///
/// ```rust
/// # use stageflow::prelude::*;
/// struct Spinner { turns: u32 }
///
/// impl Receiver<NodeTree, ()> for Spinner {
///     fn receive_message(
///         &mut self,
///         _msg: &Message<'_, ()>,
///         _ctx: &mut Context<'_, NodeTree, ()>,
///     ) -> Result<(), ReceiveError> {
///         self.turns += 1;
///         Ok(())
///     }
///
///     fn interests(&self) -> MessageKinds {
///         MessageKinds::UPDATE
///     }
/// }
/// ```
pub trait Receiver<G: SceneGraph, E: Event> {
    /// Handles one message. An error is recorded against this node and
    /// does not stop delivery to other nodes.
    fn receive_message(&mut self, msg: &Message<'_, E>, ctx: &mut Context<'_, G, E>) -> Result<(), ReceiveError>;

    /// Kinds this receiver wants delivered.
    fn interests(&self) -> MessageKinds {
        MessageKinds::all()
    }
}

//=== Component ===========================================================

/// Value stored in a node's slot.
pub enum Component<G: SceneGraph, E: Event> {
    /// Receives messages and takes part in lifecycle tracking.
    Receiver(Box<dyn Receiver<G, E>>),

    /// Opaque data; the node's animation is advanced but nothing is sent.
    Inert(Box<dyn Any>),
}

impl<G: SceneGraph, E: Event> Component<G, E> {
    /// Wraps a message receiver.
    pub fn receiver(receiver: impl Receiver<G, E> + 'static) -> Self {
        Self::Receiver(Box::new(receiver))
    }

    /// Wraps opaque data.
    pub fn inert<T: Any>(value: T) -> Self {
        Self::Inert(Box::new(value))
    }

    /// Whether this component is dispatch-eligible.
    pub fn is_receiver(&self) -> bool {
        matches!(self, Self::Receiver(_))
    }

    /// The receiver capability, if present.
    pub fn as_receiver_mut(&mut self) -> Option<&mut dyn Receiver<G, E>> {
        match self {
            Self::Receiver(receiver) => Some(receiver.as_mut()),
            Self::Inert(_) => None,
        }
    }

    /// Downcasts inert data.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Inert(value) => value.downcast_ref(),
            Self::Receiver(_) => None,
        }
    }

    /// Mutably downcasts inert data.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            Self::Inert(value) => value.downcast_mut(),
            Self::Receiver(_) => None,
        }
    }
}

//=== Component Factory ===================================================

/// Shared factory deciding which component, if any, a node gets.
///
/// Called at most once per node per live scene.
pub type ComponentFactory<G, E> = Rc<dyn Fn(&G, <G as SceneGraph>::NodeId) -> Option<Component<G, E>>>;
