//=========================================================================
// Stageflow Library Root
//
// Stage and component lifecycle layer for hierarchical scene graphs.
//
// Responsibilities:
// - Expose the `Engine` facade and its builder
// - Expose the `core` building blocks (stages, components, messages,
//   timers, scene graph contract) for hosts that drive a Stage directly
//
// Typical usage:
// ```no_run
// use stageflow::prelude::*;
//
// let mut engine = EngineBuilder::<NodeTree, ()>::new(|_, _| None).build();
// engine.add_stage("Main").unwrap();
//
// while engine.update() == TickControl::Continue {
//     // host pacing
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds every subsystem. Applications mostly go through the
// prelude and the top-level `Engine`.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------

mod engine;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder};
