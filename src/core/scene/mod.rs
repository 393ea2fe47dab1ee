//=========================================================================
// Scene System
//=========================================================================
//
// Host scene graph contract and scene template lookup.
//
// Architecture:
//   SceneLibrary ──find_scene()──> Rc<G> (template)
//                                    │
//   Stage ──instantiate()────────────┘──> G (live scene)
//     └─ for_each_node() → component slots → NodeSnapshot
//
// The lifecycle layer never creates or destroys nodes. It reads the
// traversal, advances per-node animation, and keeps its own component
// slots keyed by node identity.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt::Debug;
use std::hash::Hash;

//=== Module Declarations =================================================

mod library;
mod tree;

//=== Public API ==========================================================

pub use library::SceneLibrary;
pub use tree::{NodeId, NodeTree};

//=== SceneGraph Trait ====================================================

/// Contract a host scene graph fulfils so stages can drive it.
///
/// A scene value acts both as an immutable template (held by a
/// [`SceneLibrary`] or a stage) and as the live clone a stage updates.
///
/// # Minimal Implementation
///
/// `advance_animation()` has a default empty implementation. Ids are
/// minted from a process-wide counter so every instantiation is distinct:
///
/// ```rust
/// # use stageflow::prelude::*;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// static NEXT_ID: AtomicU32 = AtomicU32::new(0);
///
/// struct Flat { name: String, nodes: Vec<u32> }
///
/// impl SceneGraph for Flat {
///     type NodeId = u32;
///
///     fn name(&self) -> &str { &self.name }
///
///     fn instantiate(&self) -> Self {
///         let nodes = self.nodes.iter().map(|_| NEXT_ID.fetch_add(1, Ordering::Relaxed)).collect();
///         Flat { name: self.name.clone(), nodes }
///     }
///
///     fn for_each_node(&self, visit: &mut dyn FnMut(u32)) {
///         self.nodes.iter().copied().for_each(visit);
///     }
///
///     fn contains(&self, node: u32) -> bool { self.nodes.contains(&node) }
/// }
/// ```
pub trait SceneGraph: 'static {
    /// Identity handle of a node. Equality must be identity, not value,
    /// and a handle must never name a node in any other live scene.
    type NodeId: Copy + Eq + Hash + Debug + 'static;

    /// Name used for library lookup and carried by lifecycle messages.
    fn name(&self) -> &str;

    /// Produces a fresh live scene from this template.
    ///
    /// Every node of the result gets a new id, unique across all scenes
    /// in the process. Two stages running the same template therefore
    /// never share a handle, which is what lets
    /// [`crate::Engine::send_message_to_targets`] reach exactly the
    /// listed nodes.
    fn instantiate(&self) -> Self
    where
        Self: Sized;

    /// Visits every attached node, parents before children, siblings in
    /// source order. The order must be deterministic.
    fn for_each_node(&self, visit: &mut dyn FnMut(Self::NodeId));

    /// Whether the node still exists in this scene, attached or not.
    fn contains(&self, node: Self::NodeId) -> bool;

    /// Advances the node's animation clock by `delta` seconds.
    fn advance_animation(&mut self, _node: Self::NodeId, _delta: f64) {}
}
