//=========================================================================
// Dispatcher
//=========================================================================
//
// Synchronous, immediate delivery of one message to one node at a time.
//
// A node is skipped when it holds no receiver or when its receiver's
// interests exclude the message kind. A handler error becomes a
// DispatchFault and a warning; delivery to the remaining nodes goes on.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::warn;

//=== Internal Dependencies ===============================================

use super::{CommandSender, Context, Event, Message, MessageKinds};
use crate::core::component::ComponentArena;
use crate::core::error::ReceiveError;
use crate::core::scene::SceneGraph;
use crate::core::timer::TimerSystem;

//=== DispatchFault =======================================================

/// Record of a handler that returned an error.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchFault<N> {
    /// Stage that was delivering.
    pub stage: String,
    /// Receiving node.
    pub node: N,
    /// Kind of the message being handled.
    pub kind: MessageKinds,
    /// What the handler reported.
    pub error: ReceiveError,
}

//=== Dispatcher ==========================================================

/// Split borrows of a stage needed to deliver messages.
pub(crate) struct Dispatcher<'a, G: SceneGraph, E: Event> {
    pub(crate) stage: &'a str,
    pub(crate) scene: &'a mut G,
    pub(crate) components: &'a mut ComponentArena<G, E>,
    pub(crate) timers: &'a mut TimerSystem<G, E>,
    pub(crate) commands: &'a CommandSender<G::NodeId, E>,
    pub(crate) faults: &'a mut Vec<DispatchFault<G::NodeId>>,
    pub(crate) delta: f64,
    pub(crate) stage_time: f64,
}

impl<'a, G: SceneGraph, E: Event> Dispatcher<'a, G, E> {
    /// Delivers `msg` to `node`. Returns true if a receiver handled it.
    pub(crate) fn deliver(&mut self, node: G::NodeId, msg: &Message<'_, E>) -> bool {
        let Some(receiver) = self.components.receiver_mut(node) else {
            return false;
        };

        if !receiver.interests().contains(msg.kind()) {
            return false;
        }

        let mut ctx = Context {
            node,
            stage: self.stage,
            scene: &mut *self.scene,
            timers: &mut *self.timers,
            commands: self.commands,
            delta: self.delta,
            stage_time: self.stage_time,
        };

        if let Err(error) = receiver.receive_message(msg, &mut ctx) {
            warn!(
                "Stage '{}': node {:?} failed handling {:?}: {}",
                self.stage,
                node,
                msg.kind(),
                error
            );
            self.faults.push(DispatchFault {
                stage: self.stage.to_string(),
                node,
                kind: msg.kind(),
                error,
            });
        }

        true
    }

    /// Delivers `msg` to each node in order. Returns how many handled it.
    pub(crate) fn deliver_all(&mut self, nodes: &[G::NodeId], msg: &Message<'_, E>) -> usize {
        nodes.iter().filter(|&&node| self.deliver(node, msg)).count()
    }

    /// Advances the node's animation by `delta`.
    pub(crate) fn advance(&mut self, node: G::NodeId, delta: f64) {
        self.scene.advance_animation(node, delta);
    }
}

//=== Tests ===============================================================
