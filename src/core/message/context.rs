//=========================================================================
// Handler Contexts
//=========================================================================
//
// What a component (or a timer callback) may touch while it runs.
//
// Both contexts are split borrows of one stage: the live scene, the
// stage's timers, and the engine command sender. Scene mutations made
// here are observed by the next tick's traversal, never by the pass
// that is currently running.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::{CommandSender, Event};
use crate::core::scene::SceneGraph;
use crate::core::timer::TimerSystem;

//=== Context =============================================================

/// Per-delivery context handed to [`crate::core::component::Receiver`]s.
pub struct Context<'a, G: SceneGraph, E: Event> {
    pub(crate) node: G::NodeId,
    pub(crate) stage: &'a str,
    pub(crate) scene: &'a mut G,
    pub(crate) timers: &'a mut TimerSystem<G, E>,
    pub(crate) commands: &'a CommandSender<G::NodeId, E>,
    pub(crate) delta: f64,
    pub(crate) stage_time: f64,
}

impl<'a, G: SceneGraph, E: Event> Context<'a, G, E> {
    /// Node the receiving component is attached to.
    pub fn node(&self) -> G::NodeId {
        self.node
    }

    /// Name of the stage delivering the message.
    pub fn stage_name(&self) -> &str {
        self.stage
    }

    /// The stage's live scene.
    pub fn scene(&self) -> &G {
        self.scene
    }

    /// Mutable access to the live scene. Structural changes show up in
    /// the next tick's traversal.
    pub fn scene_mut(&mut self) -> &mut G {
        self.scene
    }

    /// The stage's timer system.
    pub fn timers(&mut self) -> &mut TimerSystem<G, E> {
        self.timers
    }

    /// Channel for engine-level requests (quit, restart, broadcast...).
    pub fn commands(&self) -> &CommandSender<G::NodeId, E> {
        self.commands
    }

    /// Scaled delta of the current tick in seconds.
    pub fn delta_time(&self) -> f64 {
        self.delta
    }

    /// Accumulated scaled time of the stage in seconds.
    pub fn stage_time(&self) -> f64 {
        self.stage_time
    }
}

//=== TimerContext ========================================================

/// Context handed to timer callbacks when they fire.
pub struct TimerContext<'a, G: SceneGraph, E: Event> {
    stage: &'a str,
    scene: &'a mut G,
    timers: &'a mut TimerSystem<G, E>,
    commands: &'a CommandSender<G::NodeId, E>,
}

impl<'a, G: SceneGraph, E: Event> TimerContext<'a, G, E> {
    pub(crate) fn new(
        stage: &'a str,
        scene: &'a mut G,
        timers: &'a mut TimerSystem<G, E>,
        commands: &'a CommandSender<G::NodeId, E>,
    ) -> Self {
        Self {
            stage,
            scene,
            timers,
            commands,
        }
    }

    /// Name of the stage owning the timer.
    pub fn stage_name(&self) -> &str {
        self.stage
    }

    /// The stage's live scene.
    pub fn scene(&self) -> &G {
        self.scene
    }

    /// Mutable access to the live scene.
    pub fn scene_mut(&mut self) -> &mut G {
        self.scene
    }

    /// The stage's timer system, for follow-ups and cancellation. The
    /// firing timer stays scheduled until its callback returns.
    pub fn timers(&mut self) -> &mut TimerSystem<G, E> {
        self.timers
    }

    /// Channel for engine-level requests.
    pub fn commands(&self) -> &CommandSender<G::NodeId, E> {
        self.commands
    }
}
