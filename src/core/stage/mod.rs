//=========================================================================
// Stage
//=========================================================================
//
// An independently running container for one live scene.
//
// A stage holds a scene template. On its first active tick it clones the
// template into a live scene and from then on, once per tick:
//
//   1. traverses the live scene, resolving component slots once per node
//   2. builds a fresh snapshot of receiver-bearing nodes
//   3. diffs it against the previous tick's snapshot by node identity
//   4. dispatches, in this order:
//        StageStarted      to every node (first tick only)
//        AddedToScene      to entered nodes
//        Update            to every node, each followed by its animation
//        RemovedFromScene  to exited nodes
//   5. advances its timers on the speed-scaled clock
//
// State machine:
//
//   Empty --set_scene--> Pending --update--> Running <--> Paused
//                                               |
//                                   end() / restart()
//                                               v
//                                   Ended (restart() -> Pending)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::mem;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, info};

//=== Internal Dependencies ===============================================

use crate::core::component::{Component, ComponentArena, ComponentFactory, Eligibility};
use crate::core::error::FlowError;
use crate::core::message::dispatch::Dispatcher;
use crate::core::message::{CommandSender, DispatchFault, Event, Message};
use crate::core::scene::SceneGraph;
use crate::core::timer::TimerSystem;

//=== Module Declarations =================================================

mod snapshot;

//=== Public API ==========================================================

pub use snapshot::{diff, NodeSnapshot, SnapshotDiff};

//=== StageState ==========================================================

/// Observable lifecycle position of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// No scene template assigned.
    Empty,
    /// Template assigned, not yet instantiated.
    Pending,
    /// Live scene ticking.
    Running,
    /// Live scene held; ticks are skipped.
    Paused,
    /// Ended; inactive until restarted.
    Ended,
}

//=== Stage ===============================================================

/// Named container running one live scene instance.
pub struct Stage<G: SceneGraph, E: Event> {
    name: String,
    template: Option<Rc<G>>,
    scene: Option<G>,
    scene_name: String,

    components: ComponentArena<G, E>,
    current: NodeSnapshot<G::NodeId>,
    previous: NodeSnapshot<G::NodeId>,
    timers: TimerSystem<G, E>,

    factory: ComponentFactory<G, E>,
    commands: CommandSender<G::NodeId, E>,

    started: bool,
    active: bool,
    paused: bool,
    remove: bool,

    speed: f64,
    tick: f64,
    stage_time: f64,
    debug_update_time: Duration,
    faults: Vec<DispatchFault<G::NodeId>>,
}

impl<G: SceneGraph, E: Event> Stage<G, E> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty, active stage ticking at `tps`.
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn new(
        name: impl Into<String>,
        factory: ComponentFactory<G, E>,
        commands: CommandSender<G::NodeId, E>,
        tps: f64,
    ) -> Self {
        Self {
            name: name.into(),
            template: None,
            scene: None,
            scene_name: String::new(),
            components: ComponentArena::new(),
            current: NodeSnapshot::new(),
            previous: NodeSnapshot::new(),
            timers: TimerSystem::new(tps),
            factory,
            commands,
            started: false,
            active: true,
            paused: false,
            remove: false,
            speed: 1.0,
            tick: 1.0 / tps,
            stage_time: 0.0,
            debug_update_time: Duration::ZERO,
            faults: Vec::new(),
        }
    }

    //--- Identity & State -------------------------------------------------

    /// Stage name, unique within an engine.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle position.
    pub fn state(&self) -> StageState {
        if !self.active {
            StageState::Ended
        } else if self.template.is_none() {
            StageState::Empty
        } else if self.paused {
            StageState::Paused
        } else if self.started {
            StageState::Running
        } else {
            StageState::Pending
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the template has been instantiated into a live scene.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the stage will be dropped at the end of the current tick.
    pub fn is_marked_for_removal(&self) -> bool {
        self.remove
    }

    //--- Scene ------------------------------------------------------------

    /// Assigns a new template. A started stage restarts on it; the new
    /// scene is instantiated on the next active tick.
    pub fn set_scene(&mut self, template: Option<Rc<G>>) -> Result<(), FlowError> {
        let Some(template) = template else {
            return Err(FlowError::InvalidScene {
                stage: self.name.clone(),
            });
        };

        info!("Stage '{}' assigned scene '{}'", self.name, template.name());
        self.template = Some(template);

        if self.started {
            self.restart();
        }
        Ok(())
    }

    /// The assigned template.
    pub fn template(&self) -> Option<&Rc<G>> {
        self.template.as_ref()
    }

    /// The live scene. None before the first tick and after ending.
    pub fn current_scene(&self) -> Option<&G> {
        if !self.active {
            return None;
        }
        self.scene.as_ref()
    }

    /// Mutable live scene. Structural changes show up next tick.
    pub fn current_scene_mut(&mut self) -> Option<&mut G> {
        if !self.active {
            return None;
        }
        self.scene.as_mut()
    }

    //--- Flow Control -----------------------------------------------------

    pub fn pause(&mut self) {
        debug!("Stage '{}' paused", self.name);
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        debug!("Stage '{}' unpaused", self.name);
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.unpause();
        } else {
            self.pause();
        }
    }

    /// Ends the stage if needed and reactivates it, so the next active tick
    /// instantiates a fresh copy of the template. The paused flag is kept.
    pub fn restart(&mut self) {
        if self.started {
            self.end();
        }
        self.started = false;
        self.active = true;
        info!("Stage '{}' restarted", self.name);
    }

    /// Sends StageEnded to every live receiver, then drops the live scene,
    /// its components and pending timers. The stage stays inactive until
    /// restarted.
    pub fn end(&mut self) {
        if self.started {
            let Self {
                name,
                scene,
                scene_name,
                components,
                current,
                timers,
                commands,
                faults,
                stage_time,
                ..
            } = self;

            if let Some(scene) = scene.as_mut() {
                let mut dispatcher = Dispatcher {
                    stage: name.as_str(),
                    scene,
                    components,
                    timers,
                    commands,
                    faults,
                    delta: 0.0,
                    stage_time: *stage_time,
                };
                dispatcher.deliver_all(current.as_slice(), &Message::StageEnded(scene_name.as_str()));
            }
        }

        self.timers.clear();
        self.started = false;
        self.active = false;
        self.current.clear();
        self.previous.clear();
        self.scene = None;
        self.components.clear();

        info!("Stage '{}' ended", self.name);
    }

    /// Flags the stage for removal at the end of the current tick.
    pub fn remove(&mut self) {
        self.remove = true;
    }

    //--- Speed & Time -----------------------------------------------------

    /// Multiplier applied to animation and timer advancement.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the speed multiplier. Zero freezes animation and timers while
    /// dispatch continues.
    ///
    /// # Panics
    ///
    /// Panics if `speed` is negative or not finite.
    pub fn set_speed(&mut self, speed: f64) {
        self.timers.set_speed(speed);
        self.speed = speed;
    }

    /// Accumulated scaled time since the live scene was instantiated.
    pub fn stage_time(&self) -> f64 {
        self.stage_time
    }

    /// Wall-clock duration of the last update. Zero when it was skipped.
    pub fn debug_update_time(&self) -> Duration {
        self.debug_update_time
    }

    //--- Nodes & Components -----------------------------------------------

    /// Receiver-bearing nodes seen by the latest traversal.
    pub fn live_nodes(&self) -> &NodeSnapshot<G::NodeId> {
        &self.current
    }

    /// Receiver-bearing nodes seen by the traversal before it.
    pub fn previous_nodes(&self) -> &NodeSnapshot<G::NodeId> {
        &self.previous
    }

    pub fn component(&self, node: G::NodeId) -> Option<&Component<G, E>> {
        self.components.get(node)
    }

    pub fn component_mut(&mut self, node: G::NodeId) -> Option<&mut Component<G, E>> {
        self.components.get_mut(node)
    }

    /// Attaches a component directly, bypassing the factory, and returns
    /// the one it replaces.
    ///
    /// The node leaves the live snapshot, so a new receiver gets
    /// AddedToScene on the next tick before anything else. The replaced
    /// component is dropped without RemovedFromScene.
    pub fn set_component(&mut self, node: G::NodeId, component: Component<G, E>) -> Option<Component<G, E>> {
        if self.current.contains(node) {
            self.current = self.current.iter().filter(|&n| n != node).collect();
        }
        self.components.insert(node, component)
    }

    pub fn timers(&self) -> &TimerSystem<G, E> {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerSystem<G, E> {
        &mut self.timers
    }

    /// Drains the handler failures recorded so far.
    pub fn take_faults(&mut self) -> Vec<DispatchFault<G::NodeId>> {
        mem::take(&mut self.faults)
    }

    //--- Messaging --------------------------------------------------------

    /// Delivers `msg` to every live receiver, in snapshot order.
    pub fn send_message(&mut self, msg: &Message<'_, E>) -> usize {
        let Self {
            name,
            scene,
            components,
            current,
            timers,
            commands,
            faults,
            stage_time,
            ..
        } = self;

        let Some(scene) = scene.as_mut() else {
            return 0;
        };

        let mut dispatcher = Dispatcher {
            stage: name.as_str(),
            scene,
            components,
            timers,
            commands,
            faults,
            delta: 0.0,
            stage_time: *stage_time,
        };
        dispatcher.deliver_all(current.as_slice(), msg)
    }

    /// Delivers `msg` to the listed nodes that hold a receiver here.
    pub fn send_message_to_targets(&mut self, msg: &Message<'_, E>, targets: &[G::NodeId]) -> usize {
        let Self {
            name,
            scene,
            components,
            timers,
            commands,
            faults,
            stage_time,
            ..
        } = self;

        let Some(scene) = scene.as_mut() else {
            return 0;
        };

        let mut dispatcher = Dispatcher {
            stage: name.as_str(),
            scene,
            components,
            timers,
            commands,
            faults,
            delta: 0.0,
            stage_time: *stage_time,
        };
        dispatcher.deliver_all(targets, msg)
    }

    /// Whether `node` holds a receiver in this stage.
    pub fn has_receiver(&self, node: G::NodeId) -> bool {
        self.components.get(node).map_or(false, Component::is_receiver)
    }

    //--- Update -----------------------------------------------------------

    /// Runs one tick. Does nothing while empty, paused or ended.
    pub fn update(&mut self) {
        self.debug_update_time = Duration::ZERO;

        if self.template.is_none() || self.paused || !self.active {
            return;
        }

        let start = Instant::now();
        let just_started = !self.started;
        if just_started {
            self.instantiate();
        }

        let Self {
            name,
            scene,
            scene_name,
            components,
            current,
            previous,
            timers,
            factory,
            commands,
            faults,
            speed,
            tick,
            stage_time,
            ..
        } = self;

        let Some(scene) = scene.as_mut() else {
            return;
        };

        let delta = *tick * *speed;
        *stage_time += delta;

        //--- Traverse -----------------------------------------------------

        let mut fresh = NodeSnapshot::with_capacity(current.len());
        let mut inert = Vec::new();
        {
            let graph: &G = scene;
            graph.for_each_node(&mut |node| match components.resolve(graph, node, factory) {
                Eligibility::Receiver => {
                    fresh.push(node);
                }
                Eligibility::Inert => inert.push(node),
                Eligibility::Excluded => {}
            });
        }

        *previous = mem::replace(current, fresh);
        let changes = diff(previous, current);

        //--- Dispatch -----------------------------------------------------

        {
            let mut dispatcher = Dispatcher {
                stage: name.as_str(),
                scene: &mut *scene,
                components: &mut *components,
                timers: &mut *timers,
                commands: &*commands,
                faults: &mut *faults,
                delta,
                stage_time: *stage_time,
            };

            if just_started {
                dispatcher.deliver_all(current.as_slice(), &Message::StageStarted(scene_name.as_str()));
            }

            dispatcher.deliver_all(&changes.entered, &Message::AddedToScene(scene_name.as_str()));

            for node in current.iter() {
                dispatcher.deliver(node, &Message::Update);
                dispatcher.advance(node, delta);
            }

            for &node in &inert {
                dispatcher.advance(node, delta);
            }

            dispatcher.deliver_all(&changes.exited, &Message::RemovedFromScene(scene_name.as_str()));
        }

        //--- Timers -------------------------------------------------------

        timers.set_speed(*speed);
        timers.update(name.as_str(), &mut *scene, &*commands);

        //--- Arena Hygiene ------------------------------------------------

        components.retain(|node| scene.contains(node) || current.contains(node));

        if !changes.is_unchanged() {
            debug!(
                "Stage '{}': {} entered, {} exited, {} live",
                name,
                changes.entered.len(),
                changes.exited.len(),
                current.len()
            );
        }

        self.debug_update_time = start.elapsed();
    }

    //--- Internal Helpers -------------------------------------------------

    fn instantiate(&mut self) {
        let Some(template) = self.template.as_ref() else {
            return;
        };

        let scene = template.instantiate();
        self.scene_name = scene.name().to_string();
        self.scene = Some(scene);
        self.components.clear();
        self.current.clear();
        self.previous.clear();
        self.stage_time = 0.0;
        self.started = true;

        info!("Stage '{}' instantiated scene '{}'", self.name, self.scene_name);
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::Receiver;
    use crate::core::error::ReceiveError;
    use crate::core::message::{command_channel, CommandReceiver, Context, EngineCommand, MessageKinds};
    use crate::core::scene::{NodeId, NodeTree};
    use std::cell::{Cell, RefCell};

    type Log = Rc<RefCell<Vec<String>>>;
    type TestStage = Stage<NodeTree, ()>;

    //--- Fixtures ---------------------------------------------------------

    struct Recorder {
        label: String,
        log: Log,
        fail_on_update: bool,
    }

    impl Receiver<NodeTree, ()> for Recorder {
        fn receive_message(&mut self, msg: &Message<'_, ()>, _: &mut Context<'_, NodeTree, ()>) -> Result<(), ReceiveError> {
            let entry = match msg {
                Message::Update => format!("{}:update", self.label),
                Message::AddedToScene(s) => format!("{}:added:{}", self.label, s),
                Message::RemovedFromScene(s) => format!("{}:removed:{}", self.label, s),
                Message::StageStarted(s) => format!("{}:started:{}", self.label, s),
                Message::StageEnded(s) => format!("{}:ended:{}", self.label, s),
                Message::Custom(()) => format!("{}:custom", self.label),
            };
            self.log.borrow_mut().push(entry);

            if self.fail_on_update && matches!(msg, Message::Update) {
                return Err(ReceiveError::new("update failed"));
            }
            Ok(())
        }
    }

    // Receivers for every node carrying a "role" property; nodes named
    // "Prop" get inert data.
    fn factory(log: &Log, calls: &Rc<Cell<u32>>) -> ComponentFactory<NodeTree, ()> {
        let log = Rc::clone(log);
        let calls = Rc::clone(calls);
        Rc::new(move |scene: &NodeTree, node: NodeId| -> Option<Component<NodeTree, ()>> {
            calls.set(calls.get() + 1);
            if scene.node_name(node) == Some("Prop") {
                return Some(Component::inert(0_u32));
            }
            let role = scene.property(node, "role")?;
            Some(Component::receiver(Recorder {
                label: role.to_string(),
                log: Rc::clone(&log),
                fail_on_update: role == "faulty",
            }))
        })
    }

    fn game_scene() -> Rc<NodeTree> {
        let mut scene = NodeTree::new("Game");
        let root = scene.root();
        let player = scene.add_child(root, "Player").unwrap();
        scene.set_property(player, "role", "player");
        let enemies = scene.add_child(root, "Enemies").unwrap();
        let enemy = scene.add_child(enemies, "EnemyA").unwrap();
        scene.set_property(enemy, "role", "enemyA");
        scene.add_child(root, "Prop").unwrap();
        Rc::new(scene)
    }

    struct Fixture {
        stage: TestStage,
        log: Log,
        calls: Rc<Cell<u32>>,
        inbox: CommandReceiver<NodeId, ()>,
    }

    impl Fixture {
        fn new() -> Self {
            let log = Log::default();
            let calls = Rc::new(Cell::new(0));
            let (tx, inbox) = command_channel();
            let stage = Stage::new("Main", factory(&log, &calls), tx, 10.0);
            Self {
                stage,
                log,
                calls,
                inbox,
            }
        }

        fn with_scene() -> Self {
            let mut fx = Self::new();
            fx.stage.set_scene(Some(game_scene())).unwrap();
            fx
        }

        fn take_log(&self) -> Vec<String> {
            mem::take(&mut *self.log.borrow_mut())
        }

        fn node(&self, name: &str) -> NodeId {
            self.stage.current_scene().unwrap().find_by_name(name).unwrap()
        }
    }

    //--- State Machine ----------------------------------------------------

    #[test]
    fn new_stage_is_empty_and_update_is_a_noop() {
        let mut fx = Fixture::new();
        assert_eq!(fx.stage.state(), StageState::Empty);

        fx.stage.update();
        assert!(!fx.stage.is_started());
        assert_eq!(fx.stage.debug_update_time(), Duration::ZERO);
        assert!(fx.take_log().is_empty());
    }

    #[test]
    fn set_scene_none_is_rejected() {
        let mut fx = Fixture::new();
        let err = fx.stage.set_scene(None).unwrap_err();
        assert_eq!(err, FlowError::InvalidScene { stage: "Main".into() });
        assert_eq!(fx.stage.state(), StageState::Empty);
    }

    #[test]
    fn first_update_instantiates_a_copy() {
        let mut fx = Fixture::with_scene();
        assert_eq!(fx.stage.state(), StageState::Pending);
        assert!(fx.stage.current_scene().is_none());

        fx.stage.update();
        assert_eq!(fx.stage.state(), StageState::Running);

        let template = Rc::clone(fx.stage.template().unwrap());
        let live = fx.stage.current_scene().unwrap();
        assert_eq!(live.len(), template.len());
        assert_ne!(live.root(), template.root());
    }

    //--- Dispatch Order ---------------------------------------------------

    #[test]
    fn first_tick_dispatch_order() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();

        assert_eq!(
            fx.take_log(),
            [
                "player:started:Game",
                "enemyA:started:Game",
                "player:added:Game",
                "enemyA:added:Game",
                "player:update",
                "enemyA:update",
            ]
        );
    }

    #[test]
    fn detached_node_is_removed_next_tick() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.take_log();

        let enemy = fx.node("EnemyA");
        fx.stage.current_scene_mut().unwrap().detach(enemy);
        fx.stage.update();

        assert_eq!(fx.take_log(), ["player:update", "enemyA:removed:Game"]);
        assert!(!fx.stage.live_nodes().contains(enemy));
        assert!(fx.stage.previous_nodes().contains(enemy));
    }

    #[test]
    fn reattached_node_keeps_component_and_reenters() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        let enemy = fx.node("EnemyA");
        let root = fx.stage.current_scene().unwrap().root();

        fx.stage.current_scene_mut().unwrap().detach(enemy);
        fx.stage.update();
        let calls = fx.calls.get();
        fx.take_log();

        fx.stage.current_scene_mut().unwrap().attach(root, enemy);
        fx.stage.update();

        assert_eq!(fx.calls.get(), calls);
        assert_eq!(fx.take_log(), ["enemyA:added:Game", "player:update", "enemyA:update"]);
    }

    #[test]
    fn factory_runs_once_per_node() {
        let mut fx = Fixture::with_scene();
        for _ in 0..5 {
            fx.stage.update();
        }
        let nodes = fx.stage.current_scene().unwrap().len() as u32;
        assert_eq!(fx.calls.get(), nodes);
    }

    #[test]
    fn replaced_receiver_enters_before_it_can_leave() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.take_log();

        let enemy = fx.node("EnemyA");
        let replaced = fx.stage.set_component(
            enemy,
            Component::receiver(Recorder {
                label: "swapped".to_string(),
                log: Rc::clone(&fx.log),
                fail_on_update: false,
            }),
        );
        assert!(replaced.is_some());
        assert!(!fx.stage.live_nodes().contains(enemy));

        fx.stage.update();
        assert_eq!(fx.take_log(), ["swapped:added:Game", "player:update", "swapped:update"]);

        fx.stage.current_scene_mut().unwrap().detach(enemy);
        fx.stage.update();
        assert_eq!(fx.take_log(), ["player:update", "swapped:removed:Game"]);
    }

    #[test]
    fn node_added_mid_run_gets_component_and_added_message() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.take_log();

        let scene = fx.stage.current_scene_mut().unwrap();
        let root = scene.root();
        let spawned = scene.add_child(root, "EnemyB").unwrap();
        scene.set_property(spawned, "role", "enemyB");
        fx.stage.update();

        assert_eq!(
            fx.take_log(),
            ["enemyB:added:Game", "player:update", "enemyA:update", "enemyB:update"]
        );
    }

    #[test]
    fn destroyed_node_slot_is_evicted() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        let enemy = fx.node("EnemyA");

        fx.stage.current_scene_mut().unwrap().remove(enemy);
        fx.stage.update();

        assert_eq!(fx.take_log().last().map(String::as_str), Some("enemyA:removed:Game"));
        assert!(fx.stage.component(enemy).is_none());
    }

    //--- Pause / Restart / End --------------------------------------------

    #[test]
    fn paused_stage_skips_ticks() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.take_log();

        fx.stage.pause();
        assert_eq!(fx.stage.state(), StageState::Paused);
        fx.stage.update();
        assert!(fx.take_log().is_empty());
        assert_eq!(fx.stage.debug_update_time(), Duration::ZERO);

        fx.stage.toggle_pause();
        fx.stage.update();
        assert_eq!(fx.take_log(), ["player:update", "enemyA:update"]);
    }

    #[test]
    fn pause_freezes_snapshots() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.stage.update();
        let live = fx.stage.live_nodes().clone();
        let previous = fx.stage.previous_nodes().clone();

        fx.stage.pause();
        for _ in 0..3 {
            fx.stage.update();
        }

        assert_eq!(*fx.stage.live_nodes(), live);
        assert_eq!(*fx.stage.previous_nodes(), previous);
    }

    #[test]
    fn detach_while_paused_is_seen_after_unpause() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.take_log();

        fx.stage.pause();
        let enemy = fx.node("EnemyA");
        fx.stage.current_scene_mut().unwrap().detach(enemy);
        fx.stage.update();
        fx.stage.update();
        assert!(fx.take_log().is_empty());
        assert!(fx.stage.live_nodes().contains(enemy));

        fx.stage.unpause();
        fx.stage.update();
        assert_eq!(fx.take_log(), ["player:update", "enemyA:removed:Game"]);
        assert!(!fx.stage.live_nodes().contains(enemy));
    }

    #[test]
    fn end_notifies_and_deactivates() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.stage.timers_mut().after(Duration::from_secs(1), |_| {});
        fx.take_log();

        fx.stage.end();
        assert_eq!(fx.take_log(), ["player:ended:Game", "enemyA:ended:Game"]);
        assert_eq!(fx.stage.state(), StageState::Ended);
        assert!(fx.stage.current_scene().is_none());
        assert!(fx.stage.live_nodes().is_empty());
        assert!(fx.stage.timers().is_empty());

        fx.stage.update();
        assert!(fx.take_log().is_empty());
    }

    #[test]
    fn restart_reinstantiates_and_starts_again() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        let old_player = fx.node("Player");
        fx.take_log();

        fx.stage.restart();
        assert_eq!(fx.take_log(), ["player:ended:Game", "enemyA:ended:Game"]);
        assert_eq!(fx.stage.state(), StageState::Pending);

        fx.stage.update();
        assert_ne!(fx.node("Player"), old_player);
        assert_eq!(fx.take_log()[0], "player:started:Game");
    }

    #[test]
    fn restart_keeps_paused_flag() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.stage.pause();

        fx.stage.restart();
        assert!(fx.stage.is_paused());
        fx.stage.update();
        assert!(!fx.stage.is_started());
    }

    #[test]
    fn set_scene_on_running_stage_restarts_on_new_template() {
        let mut fx = Fixture::with_scene();
        fx.stage.update();
        fx.take_log();

        let mut menu = NodeTree::new("Menu");
        let cursor = menu.add_child(menu.root(), "Cursor").unwrap();
        menu.set_property(cursor, "role", "cursor");
        fx.stage.set_scene(Some(Rc::new(menu))).unwrap();
        fx.stage.update();

        assert_eq!(
            fx.take_log(),
            [
                "player:ended:Game",
                "enemyA:ended:Game",
                "cursor:started:Menu",
                "cursor:added:Menu",
                "cursor:update",
            ]
        );
    }

    //--- Speed & Time -----------------------------------------------------

    #[test]
    fn speed_scales_animation_and_stage_time() {
        let mut fx = Fixture::with_scene();
        fx.stage.set_speed(0.5);
        fx.stage.update();
        fx.stage.update();

        let player = fx.node("Player");
        let prop = fx.node("Prop");
        let scene = fx.stage.current_scene().unwrap();
        assert!((scene.animation_time(player).unwrap() - 0.1).abs() < 1e-9);
        assert!((scene.animation_time(prop).unwrap() - 0.1).abs() < 1e-9);
        assert!((fx.stage.stage_time() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn zero_speed_freezes_animation_but_dispatch_continues() {
        let mut fx = Fixture::with_scene();
        fx.stage.set_speed(0.0);
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        fx.stage.timers_mut().after(Duration::from_millis(100), move |_| flag.set(true));

        for _ in 0..3 {
            fx.stage.update();
        }

        let player = fx.node("Player");
        assert_eq!(fx.stage.current_scene().unwrap().animation_time(player), Some(0.0));
        assert!(!fired.get());
        assert_eq!(fx.take_log().iter().filter(|e| e.ends_with(":update")).count(), 6);
    }

    #[test]
    fn timers_fire_after_dispatch() {
        let mut fx = Fixture::with_scene();
        let log = Rc::clone(&fx.log);
        fx.stage
            .timers_mut()
            .after(Duration::from_millis(100), move |_| log.borrow_mut().push("timer".into()));

        fx.stage.update();
        assert_eq!(fx.take_log().last().map(String::as_str), Some("timer"));
    }

    //--- Faults & Messaging -----------------------------------------------

    #[test]
    fn failing_component_does_not_stop_others() {
        let mut fx = Fixture::new();
        let mut scene = NodeTree::new("Game");
        let bad = scene.add_child(scene.root(), "Bad").unwrap();
        scene.set_property(bad, "role", "faulty");
        let good = scene.add_child(scene.root(), "Good").unwrap();
        scene.set_property(good, "role", "good");
        fx.stage.set_scene(Some(Rc::new(scene))).unwrap();

        fx.stage.update();
        fx.stage.update();

        let log = fx.take_log();
        assert_eq!(log.iter().filter(|e| *e == "good:update").count(), 2);

        let faults = fx.stage.take_faults();
        assert_eq!(faults.len(), 2);
        assert!(faults.iter().all(|f| f.kind == MessageKinds::UPDATE && f.stage == "Main"));
        assert!(fx.stage.take_faults().is_empty());
    }

    #[test]
    fn send_message_reaches_live_receivers_only() {
        let mut fx = Fixture::with_scene();
        assert_eq!(fx.stage.send_message(&Message::Custom(())), 0);

        fx.stage.update();
        fx.take_log();

        let player = fx.node("Player");
        let prop = fx.node("Prop");
        assert_eq!(fx.stage.send_message(&Message::Custom(())), 2);
        assert_eq!(fx.stage.send_message_to_targets(&Message::Custom(()), &[player, prop]), 1);
        assert_eq!(fx.take_log(), ["player:custom", "enemyA:custom", "player:custom"]);
        assert!(fx.stage.has_receiver(player));
        assert!(!fx.stage.has_receiver(prop));
    }

    #[test]
    fn node_destroyed_during_update_still_updates_that_tick() {
        struct Slayer {
            log: Log,
            ticks: u32,
        }

        impl Receiver<NodeTree, ()> for Slayer {
            fn receive_message(&mut self, msg: &Message<'_, ()>, ctx: &mut Context<'_, NodeTree, ()>) -> Result<(), ReceiveError> {
                if matches!(msg, Message::Update) {
                    self.log.borrow_mut().push("player:update".to_string());
                    self.ticks += 1;
                    if self.ticks == 2 {
                        let enemy = ctx.scene().find_by_name("EnemyA").unwrap();
                        ctx.scene_mut().remove(enemy);
                    }
                }
                Ok(())
            }
        }

        let mut fx = Fixture::with_scene();
        fx.stage.update();
        let player = fx.node("Player");
        let enemy = fx.node("EnemyA");
        let log = Rc::clone(&fx.log);
        fx.stage.set_component(player, Component::receiver(Slayer { log, ticks: 1 }));
        fx.take_log();

        fx.stage.update();
        assert_eq!(fx.take_log(), ["player:update", "enemyA:update"]);
        assert!(fx.stage.live_nodes().contains(enemy));

        fx.stage.update();
        assert_eq!(fx.take_log(), ["player:update", "enemyA:removed:Game"]);
        assert!(fx.stage.component(enemy).is_none());
    }

    #[test]
    fn components_reach_engine_through_commands() {
        struct Quitter;

        impl Receiver<NodeTree, ()> for Quitter {
            fn receive_message(&mut self, msg: &Message<'_, ()>, ctx: &mut Context<'_, NodeTree, ()>) -> Result<(), ReceiveError> {
                if matches!(msg, Message::Update) {
                    ctx.commands().quit();
                }
                Ok(())
            }
        }

        let mut fx = Fixture::with_scene();
        fx.stage.update();
        let player = fx.node("Player");
        fx.stage.set_component(player, Component::receiver(Quitter));
        fx.stage.update();

        assert_eq!(fx.inbox.drain(), [EngineCommand::Quit]);
    }
}
