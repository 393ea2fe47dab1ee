//=========================================================================
// Arena Demo
//
// Headless replay of a small chase.
//
// - "Game" stage: enemies close in on the player; a catch knocks the
//   player out of the scene and a timer puts them back, briefly
//   invulnerable. A torch prop is inert and only animates.
// - "Hud" stage: a system node drives the game through engine commands
//   (pause, unpause, speed change, restart, quit).
//
// Run with:
//   RUST_LOG=debug cargo run --example arena
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use log::{info, warn};
use stageflow::prelude::*;

//=== Events ==============================================================

#[derive(Debug, Clone, PartialEq)]
enum ArenaEvent {
    Caught,
}

impl Event for ArenaEvent {}

type Ctx<'a> = Context<'a, NodeTree, ArenaEvent>;
type Msg<'a> = Message<'a, ArenaEvent>;

const START_GAP: f64 = 3.0;

//=== Player ==============================================================

struct Player {
    knockouts: u32,
}

impl Receiver<NodeTree, ArenaEvent> for Player {
    fn receive_message(&mut self, msg: &Msg<'_>, ctx: &mut Ctx<'_>) -> Result<(), ReceiveError> {
        let me = ctx.node();

        match msg {
            Message::StageStarted(scene) => info!("Player: scene '{}' started", scene),
            Message::StageEnded(scene) => info!("Player: scene '{}' ended", scene),
            Message::AddedToScene(_) => info!("Player: alive at t={:.2}s", ctx.stage_time()),
            Message::Custom(ArenaEvent::Caught) => {
                if ctx.scene().property(me, "invulnerable") == Some("true") {
                    return Ok(());
                }
                self.knockouts += 1;
                ctx.scene_mut().detach(me);
            }
            Message::RemovedFromScene(_) => {
                info!("Player: knocked out ({} so far), respawning in 3s", self.knockouts);

                ctx.timers().after(Duration::from_secs(3), move |t| {
                    let root = t.scene().root();
                    t.scene_mut().attach(root, me);
                    t.scene_mut().set_property(me, "invulnerable", "true");

                    t.timers().after(Duration::from_secs(2), move |t| {
                        t.scene_mut().set_property(me, "invulnerable", "false");
                    });
                });
            }
            Message::Update => {}
        }
        Ok(())
    }
}

//=== Enemy ===============================================================

struct Enemy {
    speed: f64,
    gap: f64,
}

impl Receiver<NodeTree, ArenaEvent> for Enemy {
    fn receive_message(&mut self, _msg: &Msg<'_>, ctx: &mut Ctx<'_>) -> Result<(), ReceiveError> {
        self.gap -= self.speed * ctx.delta_time();
        if self.gap > 0.0 {
            return Ok(());
        }
        self.gap = START_GAP;

        // Only attached nodes are found, so a knocked-out player is safe.
        let Some(player) = ctx.scene().find_by_property("gameobject", "player") else {
            return Ok(());
        };

        let name = ctx
            .scene()
            .node_name(ctx.node())
            .ok_or_else(|| ReceiveError::new("enemy node vanished from its scene"))?
            .to_string();
        info!("{} caught the player", name);
        ctx.commands().send_to_targets(ArenaEvent::Caught, [player]);
        Ok(())
    }

    fn interests(&self) -> MessageKinds {
        MessageKinds::UPDATE
    }
}

//=== System ==============================================================

struct System {
    ticks: u32,
}

impl Receiver<NodeTree, ArenaEvent> for System {
    fn receive_message(&mut self, _msg: &Msg<'_>, ctx: &mut Ctx<'_>) -> Result<(), ReceiveError> {
        self.ticks += 1;
        let commands = ctx.commands();

        match self.ticks {
            150 => commands.pause("Game"),
            180 => commands.unpause("Game"),
            300 => commands.set_speed("Game", 2.0),
            420 => commands.restart("Game"),
            600 => commands.quit(),
            _ => {}
        }
        Ok(())
    }

    fn interests(&self) -> MessageKinds {
        MessageKinds::UPDATE
    }
}

//=== Torch (inert) =======================================================

struct Torch {
    brightness: f32,
}

//=== Factory =============================================================

fn spawn(scene: &NodeTree, node: NodeId) -> Option<Component<NodeTree, ArenaEvent>> {
    let component = match scene.property(node, "gameobject")? {
        "player" => Component::receiver(Player { knockouts: 0 }),
        "enemy" => Component::receiver(Enemy {
            speed: scene
                .property(node, "speed")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            gap: START_GAP,
        }),
        "system" => Component::receiver(System { ticks: 0 }),
        "torch" => Component::inert(Torch { brightness: 0.8 }),
        _ => return None,
    };
    Some(component)
}

//=== Scenes ==============================================================

fn arena_scene() -> NodeTree {
    let mut scene = NodeTree::new("Arena");
    let root = scene.root();

    if let Some(player) = scene.add_child(root, "Player") {
        scene.set_property(player, "gameobject", "player");
    }

    if let Some(enemies) = scene.add_child(root, "Enemies") {
        for (name, speed) in [("EnemyA", "1.0"), ("EnemyB", "0.6")] {
            if let Some(enemy) = scene.add_child(enemies, name) {
                scene.set_property(enemy, "gameobject", "enemy");
                scene.set_property(enemy, "speed", speed);
            }
        }
    }

    if let Some(torch) = scene.add_child(root, "Torch") {
        scene.set_property(torch, "gameobject", "torch");
    }

    scene
}

fn hud_scene() -> NodeTree {
    let mut scene = NodeTree::new("Hud");
    let root = scene.root();
    if let Some(system) = scene.add_child(root, "System") {
        scene.set_property(system, "gameobject", "system");
    }
    scene
}

//=== main() ==============================================================

fn main() -> Result<(), FlowError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let library = SceneLibrary::new("arena")
        .with_scene(arena_scene())
        .with_scene(hud_scene());

    let mut engine = EngineBuilder::<NodeTree, ArenaEvent>::new(spawn)
        .with_tps(30.0)
        .with_library(library)
        .build();

    engine.add_stage("Game")?;
    engine.set_stage_scene_by_name("Game", "Arena")?;
    engine.add_stage("Hud")?;
    engine.set_stage_scene_by_name("Hud", "Hud")?;

    loop {
        let control = engine.update();

        for fault in engine.take_faults() {
            warn!("{:?} on {} in '{}': {}", fault.kind, fault.node, fault.stage, fault.error);
        }

        if control.is_quit() {
            break;
        }
    }

    if let Some(game) = engine.stage("Game") {
        let torch = game
            .current_scene()
            .and_then(|scene| scene.find_by_name("Torch"))
            .and_then(|node| Some((node, game.component(node)?.downcast_ref::<Torch>()?)));

        if let (Some((node, torch)), Some(scene)) = (torch, game.current_scene()) {
            info!(
                "Torch at brightness {:.1} animated for {:.2}s of stage time",
                torch.brightness,
                scene.animation_time(node).unwrap_or(0.0)
            );
        }
    }

    info!("Arena closed after {:.2}s", engine.time());
    Ok(())
}
