//=========================================================================
// Stageflow Engine
//
// Owner of every Stage and the driver of the tick.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──update()──>  TickControl
//         │                          │
//         ├─ with_tps()              ├─ ticks stages in registration order
//         ├─ with_default_speed()    ├─ applies queued EngineCommands
//         └─ with_library()          ├─ drops stages flagged for removal
//                                    └─ advances the engine clock
// ```
//
// The host game loop owns pacing: one update() per simulation step.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::rc::Rc;

use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::component::{Component, ComponentFactory};
use crate::core::error::FlowError;
use crate::core::message::{
    command_channel, CommandReceiver, CommandSender, DispatchFault, EngineCommand, Event, Message,
};
use crate::core::scene::{SceneGraph, SceneLibrary};
use crate::core::stage::Stage;
use crate::core::TickControl;

// Bounds command cascades within one tick.
const MAX_COMMAND_PASSES: usize = 8;

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (nominal ticks per second)
/// - **Default speed**: 1.0 (assigned to every new stage)
/// - **Libraries**: none
///
/// # Examples
///
/// ```
/// use stageflow::prelude::*;
///
/// let mut library = SceneLibrary::new("levels");
/// let mut level = NodeTree::new("Level1");
/// let hero = level.add_child(level.root(), "Hero").unwrap();
/// level.set_property(hero, "role", "hero");
/// library.add_scene(level);
///
/// let mut engine = EngineBuilder::<NodeTree, ()>::new(|_, _| None)
///     .with_tps(30.0)
///     .with_library(library)
///     .build();
///
/// engine.add_stage("Main").unwrap();
/// engine.set_stage_scene_by_name("Main", "Level1").unwrap();
/// assert_eq!(engine.update(), TickControl::Continue);
/// ```
pub struct EngineBuilder<G: SceneGraph, E: Event> {
    factory: ComponentFactory<G, E>,
    tps: f64,
    default_speed: f64,
    libraries: Vec<SceneLibrary<G>>,
}

impl<G: SceneGraph, E: Event> EngineBuilder<G, E> {
    /// Creates a builder around the component factory shared by all stages.
    ///
    /// The factory is asked at most once per node whether it gets a
    /// component.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&G, G::NodeId) -> Option<Component<G, E>> + 'static,
    {
        Self {
            factory: Rc::new(factory),
            tps: 60.0,
            default_speed: 1.0,
            libraries: Vec::new(),
        }
    }

    /// Sets the nominal tick rate used to derive each tick's delta.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets the speed multiplier given to newly added stages.
    ///
    /// Default: 1.0
    ///
    /// # Panics
    ///
    /// Panics if `speed` is negative or not finite.
    pub fn with_default_speed(mut self, speed: f64) -> Self {
        assert!(speed.is_finite() && speed >= 0.0, "Speed must be finite and non-negative, got {}", speed);
        self.default_speed = speed;
        self
    }

    /// Adds a scene library. Libraries are searched in the order added.
    pub fn with_library(mut self, library: SceneLibrary<G>) -> Self {
        self.libraries.push(library);
        self
    }

    /// Builds the engine with no stages.
    pub fn build(self) -> Engine<G, E> {
        info!(
            "Building engine (TPS: {}, default speed: {}, libraries: {})",
            self.tps,
            self.default_speed,
            self.libraries.len()
        );

        let (commands, inbox) = command_channel();

        Engine {
            stages: Vec::new(),
            libraries: self.libraries,
            factory: self.factory,
            commands,
            inbox,
            tps: self.tps,
            default_speed: self.default_speed,
            time: 0.0,
            quit: false,
        }
    }
}

//=== Engine ==============================================================

/// Registry of stages driven once per host tick.
///
/// # Tick
///
/// ```text
/// update()
///   ├─► Stage::update() for each stage, in registration order
///   ├─► apply EngineCommands queued during the tick
///   ├─► drop stages flagged for removal (any index)
///   ├─► time += 1 / tps
///   └─► Quit if quit() was requested, else Continue
/// ```
pub struct Engine<G: SceneGraph, E: Event> {
    stages: Vec<Stage<G, E>>,
    libraries: Vec<SceneLibrary<G>>,
    factory: ComponentFactory<G, E>,
    commands: CommandSender<G::NodeId, E>,
    inbox: CommandReceiver<G::NodeId, E>,
    tps: f64,
    default_speed: f64,
    time: f64,
    quit: bool,
}

impl<G: SceneGraph, E: Event> Engine<G, E> {
    //--- Tick -------------------------------------------------------------

    /// Runs one simulation step.
    ///
    /// The tick always completes; `TickControl::Quit` only reports that a
    /// shutdown was requested.
    pub fn update(&mut self) -> TickControl {
        for stage in &mut self.stages {
            stage.update();
        }

        self.apply_commands();
        self.remove_flagged_stages();

        self.time += 1.0 / self.tps;

        if self.quit {
            TickControl::Quit
        } else {
            TickControl::Continue
        }
    }

    /// Requests a clean shutdown. Idempotent; the current tick still runs
    /// to completion.
    pub fn quit(&mut self) {
        if !self.quit {
            info!("Quit requested at t={:.3}s", self.time);
        }
        self.quit = true;
    }

    /// Whether a shutdown has been requested.
    pub fn is_quitting(&self) -> bool {
        self.quit
    }

    /// Cumulative nominal seconds, unaffected by stage speeds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tps(&self) -> f64 {
        self.tps
    }

    //--- Stages -----------------------------------------------------------

    /// Registers a new empty stage at the end of the registry.
    pub fn add_stage(&mut self, name: &str) -> Result<&mut Stage<G, E>, FlowError> {
        if self.stages.iter().any(|s| s.name() == name) {
            return Err(FlowError::DuplicateStageName(name.to_string()));
        }

        let mut stage = Stage::new(name, Rc::clone(&self.factory), self.commands.clone(), self.tps);
        stage.set_speed(self.default_speed);

        let index = self.stages.len();
        self.stages.push(stage);
        info!("Stage '{}' added at index {}", name, index);

        Ok(&mut self.stages[index])
    }

    /// Flags the named stage for removal at the end of the current tick.
    pub fn remove_stage(&mut self, name: &str) -> Result<(), FlowError> {
        let stage = self.stage_mut(name).ok_or_else(|| FlowError::StageNotFound(name.to_string()))?;
        stage.remove();
        Ok(())
    }

    pub fn stage(&self, name: &str) -> Option<&Stage<G, E>> {
        self.stages.iter().find(|s| s.name() == name)
    }

    pub fn stage_mut(&mut self, name: &str) -> Option<&mut Stage<G, E>> {
        self.stages.iter_mut().find(|s| s.name() == name)
    }

    /// First stage whose live scene carries `scene_name`.
    pub fn find_stage_by_scene(&self, scene_name: &str) -> Option<&Stage<G, E>> {
        self.stages
            .iter()
            .find(|s| s.current_scene().map(SceneGraph::name) == Some(scene_name))
    }

    /// Stages in registration order.
    pub fn stages(&self) -> &[Stage<G, E>] {
        &self.stages
    }

    /// Mutable stages in registration order.
    pub fn stages_mut(&mut self) -> impl Iterator<Item = &mut Stage<G, E>> {
        self.stages.iter_mut()
    }

    //--- Scenes -----------------------------------------------------------

    /// Adds a scene library after the existing ones.
    pub fn add_library(&mut self, library: SceneLibrary<G>) {
        debug!("Scene library '{}' added ({} scenes)", library.name(), library.len());
        self.libraries.push(library);
    }

    /// Looks a template up by name across all libraries, first match wins.
    pub fn find_scene(&self, name: &str) -> Result<Rc<G>, FlowError> {
        self.libraries
            .iter()
            .find_map(|library| library.find_scene(name))
            .ok_or_else(|| FlowError::SceneNotFound(name.to_string()))
    }

    /// Assigns a library scene to a stage.
    pub fn set_stage_scene_by_name(&mut self, stage: &str, scene: &str) -> Result<(), FlowError> {
        let template = self.find_scene(scene)?;
        let stage = self.stage_mut(stage).ok_or_else(|| FlowError::StageNotFound(stage.to_string()))?;
        stage.set_scene(Some(template))
    }

    //--- Messaging --------------------------------------------------------

    /// Delivers `msg` immediately to every live receiver in every stage.
    ///
    /// Returns the number of receivers that handled it.
    pub fn send_message(&mut self, msg: &Message<'_, E>) -> usize {
        self.stages.iter_mut().map(|stage| stage.send_message(msg)).sum()
    }

    /// Delivers `msg` immediately to the listed nodes, skipping any without
    /// a receiver.
    ///
    /// Every stage is asked, and each reaches only the targets it owns.
    /// This relies on [`SceneGraph::instantiate`] minting unique ids.
    pub fn send_message_to_targets(&mut self, msg: &Message<'_, E>, targets: &[G::NodeId]) -> usize {
        self.stages
            .iter_mut()
            .map(|stage| stage.send_message_to_targets(msg, targets))
            .sum()
    }

    /// Sender for queueing commands from outside a tick.
    pub fn commands(&self) -> CommandSender<G::NodeId, E> {
        self.commands.clone()
    }

    /// Drains handler failures recorded by every stage.
    pub fn take_faults(&mut self) -> Vec<DispatchFault<G::NodeId>> {
        self.stages.iter_mut().flat_map(Stage::take_faults).collect()
    }

    //--- Internal Helpers -------------------------------------------------

    // Commands queued while applying a batch (e.g. by a broadcast receiver)
    // are applied in a further pass, up to MAX_COMMAND_PASSES.
    fn apply_commands(&mut self) {
        for _ in 0..MAX_COMMAND_PASSES {
            let batch = self.inbox.drain();
            if batch.is_empty() {
                return;
            }

            for command in batch {
                debug!("Applying engine command: {:?}", command);
                if let Err(err) = self.apply(command) {
                    warn!("Engine command rejected: {}", err);
                }
            }
        }

        if !self.inbox.is_empty() {
            warn!("{} engine command(s) deferred to the next tick", self.inbox.len());
        }
    }

    fn apply(&mut self, command: EngineCommand<G::NodeId, E>) -> Result<(), FlowError> {
        match command {
            EngineCommand::Quit => self.quit(),
            EngineCommand::PauseStage(name) => self.require_stage(&name)?.pause(),
            EngineCommand::UnpauseStage(name) => self.require_stage(&name)?.unpause(),
            EngineCommand::TogglePause(name) => self.require_stage(&name)?.toggle_pause(),
            EngineCommand::RestartStage(name) => self.require_stage(&name)?.restart(),
            EngineCommand::RemoveStage(name) => self.remove_stage(&name)?,
            EngineCommand::AddStage { name, scene } => {
                let template = scene.as_deref().map(|scene| self.find_scene(scene)).transpose()?;
                let stage = self.add_stage(&name)?;
                if let Some(template) = template {
                    stage.set_scene(Some(template))?;
                }
            }
            EngineCommand::SetScene { stage, scene } => self.set_stage_scene_by_name(&stage, &scene)?,
            EngineCommand::SetSpeed { stage, speed } => {
                if !(speed.is_finite() && speed >= 0.0) {
                    warn!("Ignoring speed {} for stage '{}'", speed, stage);
                    return Ok(());
                }
                self.require_stage(&stage)?.set_speed(speed);
            }
            EngineCommand::Broadcast(event) => {
                self.send_message(&Message::Custom(event));
            }
            EngineCommand::SendToTargets { event, targets } => {
                self.send_message_to_targets(&Message::Custom(event), &targets);
            }
        }
        Ok(())
    }

    fn require_stage(&mut self, name: &str) -> Result<&mut Stage<G, E>, FlowError> {
        self.stage_mut(name).ok_or_else(|| FlowError::StageNotFound(name.to_string()))
    }

    fn remove_flagged_stages(&mut self) {
        self.stages.retain(|stage| {
            if stage.is_marked_for_removal() {
                info!("Stage '{}' removed", stage.name());
                return false;
            }
            true
        });
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
