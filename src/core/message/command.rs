//=========================================================================
// Engine Commands
//=========================================================================
//
// Requests that components (and timer callbacks) send back to the
// engine while a tick is in progress.
//
// A component cannot borrow the engine that is ticking it, so it pushes
// an EngineCommand through a channel instead. The engine drains the
// channel once every stage has ticked and before stages flagged for
// removal are compacted away.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::Event;

//=== EngineCommand =======================================================

/// A deferred engine-level operation.
///
/// `N` is the node handle type of the scene graph, `E` the game payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand<N, E> {
    /// Request a clean shutdown.
    Quit,

    /// Pause the named stage.
    PauseStage(String),

    /// Unpause the named stage.
    UnpauseStage(String),

    /// Flip the paused flag of the named stage.
    TogglePause(String),

    /// Restart the named stage.
    RestartStage(String),

    /// Flag the named stage for removal at the end of the tick.
    RemoveStage(String),

    /// Register a stage, optionally assigning a scene by name.
    AddStage {
        /// Stage name.
        name: String,
        /// Scene to look up in the engine's libraries.
        scene: Option<String>,
    },

    /// Assign a scene (by name) to an existing stage.
    SetScene {
        /// Stage name.
        stage: String,
        /// Scene to look up in the engine's libraries.
        scene: String,
    },

    /// Change a stage's speed multiplier.
    SetSpeed {
        /// Stage name.
        stage: String,
        /// New multiplier.
        speed: f64,
    },

    /// Deliver a custom message to every live node in every stage.
    Broadcast(E),

    /// Deliver a custom message to specific nodes.
    SendToTargets {
        /// Payload.
        event: E,
        /// Receiving nodes.
        targets: Vec<N>,
    },
}

//=== command_channel() ===================================================

/// Creates a connected sender/receiver pair.
///
/// The engine owns one pair; a standalone stage can be given a sender
/// from a pair the caller keeps.
pub fn command_channel<N, E: Event>() -> (CommandSender<N, E>, CommandReceiver<N, E>) {
    let (tx, rx) = unbounded();
    (CommandSender { tx }, CommandReceiver { rx })
}

//=== CommandSender =======================================================

/// Sending half of the engine command channel.
pub struct CommandSender<N, E> {
    tx: Sender<EngineCommand<N, E>>,
}

impl<N, E> Clone for CommandSender<N, E> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<N: std::fmt::Debug, E: Event> CommandSender<N, E> {
    /// Queues a command. Dropped with a warning if the engine is gone.
    pub fn send(&self, command: EngineCommand<N, E>) {
        debug!("Queueing engine command: {:?}", command);
        if let Err(err) = self.tx.send(command) {
            warn!("Engine command dropped, receiver is gone: {:?}", err.into_inner());
        }
    }

    //--- Convenience ------------------------------------------------------

    /// Requests a clean shutdown.
    pub fn quit(&self) {
        self.send(EngineCommand::Quit);
    }

    /// Pauses a stage.
    pub fn pause(&self, stage: impl Into<String>) {
        self.send(EngineCommand::PauseStage(stage.into()));
    }

    /// Unpauses a stage.
    pub fn unpause(&self, stage: impl Into<String>) {
        self.send(EngineCommand::UnpauseStage(stage.into()));
    }

    /// Flips a stage's paused flag.
    pub fn toggle_pause(&self, stage: impl Into<String>) {
        self.send(EngineCommand::TogglePause(stage.into()));
    }

    /// Restarts a stage.
    pub fn restart(&self, stage: impl Into<String>) {
        self.send(EngineCommand::RestartStage(stage.into()));
    }

    /// Flags a stage for removal.
    pub fn remove_stage(&self, stage: impl Into<String>) {
        self.send(EngineCommand::RemoveStage(stage.into()));
    }

    /// Registers a stage, optionally running the named scene in it.
    pub fn add_stage(&self, name: impl Into<String>, scene: Option<&str>) {
        self.send(EngineCommand::AddStage {
            name: name.into(),
            scene: scene.map(str::to_string),
        });
    }

    /// Assigns a scene to a stage by name.
    pub fn set_scene(&self, stage: impl Into<String>, scene: impl Into<String>) {
        self.send(EngineCommand::SetScene {
            stage: stage.into(),
            scene: scene.into(),
        });
    }

    /// Changes a stage's speed multiplier.
    pub fn set_speed(&self, stage: impl Into<String>, speed: f64) {
        self.send(EngineCommand::SetSpeed {
            stage: stage.into(),
            speed,
        });
    }

    /// Broadcasts a custom message to every live node.
    ///
    /// Delivery happens when the engine applies commands, after every
    /// stage has ticked. Peers in the sender's own stage therefore see it
    /// after their Update for this tick, not during it. Call
    /// [`crate::Engine::send_message`] from outside a tick for immediate
    /// fan-out.
    pub fn broadcast(&self, event: E) {
        self.send(EngineCommand::Broadcast(event));
    }

    /// Sends a custom message to specific nodes.
    pub fn send_to_targets(&self, event: E, targets: impl IntoIterator<Item = N>) {
        self.send(EngineCommand::SendToTargets {
            event,
            targets: targets.into_iter().collect(),
        });
    }
}

//=== CommandReceiver =====================================================

/// Receiving half of the engine command channel.
pub struct CommandReceiver<N, E> {
    rx: Receiver<EngineCommand<N, E>>,
}

impl<N, E> CommandReceiver<N, E> {
    /// Takes every command queued so far, in FIFO order.
    pub fn drain(&self) -> Vec<EngineCommand<N, E>> {
        self.rx.try_iter().collect()
    }

    /// Number of commands waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no commands are waiting.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

//=== Tests ===============================================================
