//=========================================================================
// Message Protocol
//=========================================================================
//
// Lifecycle vocabulary delivered to components, plus the plumbing that
// delivers it.
//
// Architecture:
//   Stage::update() ──> Dispatcher ──> Receiver::receive_message(msg, ctx)
//                                            │
//                                   ctx.commands() ──> EngineCommand
//                                            │
//   Engine::update() <── drained at tick boundary
//
// Kinds are bit flags so a receiver can narrow what it is sent via
// Receiver::interests().
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt::Debug;

use bitflags::bitflags;

//=== Module Declarations =================================================

mod command;
mod context;
pub(crate) mod dispatch;

//=== Public API ==========================================================

pub use command::{command_channel, CommandReceiver, CommandSender, EngineCommand};
pub use context::{Context, TimerContext};
pub use dispatch::DispatchFault;

//=== Event Trait =========================================================

/// Marker trait for game-defined payloads carried by [`Message::Custom`].
///
/// ```
/// use stageflow::prelude::*;
///
/// #[derive(Debug)]
/// enum GameEvent { PlayerDied, LevelCleared }
///
/// impl Event for GameEvent {}
/// ```
pub trait Event: Debug + 'static {}

impl Event for () {}

//=== MessageKinds ========================================================

bitflags! {
    /// Set of message kinds, used for subscription filtering.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageKinds: u32 {
        /// Once per live node per tick.
        const UPDATE = 1 << 0;
        /// Node entered the live set.
        const ADDED_TO_SCENE = 1 << 1;
        /// Node left the live set.
        const REMOVED_FROM_SCENE = 1 << 2;
        /// Stage instantiated its scene.
        const STAGE_STARTED = 1 << 3;
        /// Stage tore its scene down.
        const STAGE_ENDED = 1 << 4;
        /// Game-defined payload.
        const CUSTOM = 1 << 5;
    }
}

//=== Message =============================================================

/// A notification delivered to a component.
///
/// Lifecycle variants carry the name of the live scene they concern.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<'a, E: Event> {
    /// Per-tick update.
    Update,

    /// The node became live in this scene.
    AddedToScene(&'a str),

    /// The node is no longer live in this scene.
    RemovedFromScene(&'a str),

    /// The stage instantiated this scene.
    StageStarted(&'a str),

    /// The stage is tearing this scene down.
    StageEnded(&'a str),

    /// Game-defined payload.
    Custom(E),
}

impl<'a, E: Event> Message<'a, E> {
    /// The kind flag of this message.
    pub fn kind(&self) -> MessageKinds {
        match self {
            Self::Update => MessageKinds::UPDATE,
            Self::AddedToScene(_) => MessageKinds::ADDED_TO_SCENE,
            Self::RemovedFromScene(_) => MessageKinds::REMOVED_FROM_SCENE,
            Self::StageStarted(_) => MessageKinds::STAGE_STARTED,
            Self::StageEnded(_) => MessageKinds::STAGE_ENDED,
            Self::Custom(_) => MessageKinds::CUSTOM,
        }
    }

    /// Scene the message refers to, if it carries one.
    pub fn scene(&self) -> Option<&'a str> {
        match *self {
            Self::AddedToScene(scene)
            | Self::RemovedFromScene(scene)
            | Self::StageStarted(scene)
            | Self::StageEnded(scene) => Some(scene),
            Self::Update | Self::Custom(_) => None,
        }
    }

    /// Payload of a custom message.
    pub fn event(&self) -> Option<&E> {
        match self {
            Self::Custom(event) => Some(event),
            _ => None,
        }
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    impl Event for Ping {}

    #[test]
    fn kinds_are_distinct_bits() {
        let messages: [Message<'_, Ping>; 6] = [
            Message::Update,
            Message::AddedToScene("Game"),
            Message::RemovedFromScene("Game"),
            Message::StageStarted("Game"),
            Message::StageEnded("Game"),
            Message::Custom(Ping(1)),
        ];

        let mut seen = MessageKinds::empty();
        for msg in &messages {
            assert!(!seen.intersects(msg.kind()));
            seen |= msg.kind();
        }
        assert_eq!(seen, MessageKinds::all());
    }

    #[test]
    fn lifecycle_messages_carry_scene() {
        let msg: Message<'_, ()> = Message::StageEnded("Game");
        assert_eq!(msg.scene(), Some("Game"));
        assert_eq!(Message::<()>::Update.scene(), None);
    }

    #[test]
    fn custom_payload_is_reachable() {
        let msg = Message::Custom(Ping(7));
        assert_eq!(msg.event(), Some(&Ping(7)));
        assert_eq!(msg.scene(), None);
        assert_eq!(Message::<Ping>::Update.event(), None);
    }
}
