//=========================================================================
// Component Arena
//=========================================================================
//
// Per-stage node slots, keyed by node identity.
//
// A slot is either Declined (the factory returned nothing) or holds the
// node's Component. Either way the factory is not asked again for that
// node, so component existence is read from the slot each tick rather
// than re-derived from node properties.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

//=== Internal Dependencies ===============================================

use super::{Component, ComponentFactory, Receiver};
use crate::core::message::Event;
use crate::core::scene::SceneGraph;

//=== Eligibility =========================================================

/// What a resolved slot means for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eligibility {
    Receiver,
    Inert,
    Excluded,
}

//=== Slot ================================================================

enum Slot<G: SceneGraph, E: Event> {
    Declined,
    Occupied(Component<G, E>),
}

//=== ComponentArena ======================================================

/// Node-keyed component storage owned by a stage.
pub struct ComponentArena<G: SceneGraph, E: Event> {
    slots: HashMap<G::NodeId, Slot<G, E>>,
}

impl<G: SceneGraph, E: Event> ComponentArena<G, E> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    //--- Resolution -------------------------------------------------------

    /// Fills the node's slot through the factory if it was never resolved,
    /// then reports what the slot holds.
    pub(crate) fn resolve(&mut self, scene: &G, node: G::NodeId, factory: &ComponentFactory<G, E>) -> Eligibility {
        let slot = self.slots.entry(node).or_insert_with(|| match factory(scene, node) {
            Some(component) => Slot::Occupied(component),
            None => Slot::Declined,
        });

        match slot {
            Slot::Occupied(Component::Receiver(_)) => Eligibility::Receiver,
            Slot::Occupied(Component::Inert(_)) => Eligibility::Inert,
            Slot::Declined => Eligibility::Excluded,
        }
    }

    //--- Access -----------------------------------------------------------

    /// Assigns a component directly, bypassing the factory. Returns the
    /// component previously held, if any.
    pub fn insert(&mut self, node: G::NodeId, component: Component<G, E>) -> Option<Component<G, E>> {
        match self.slots.insert(node, Slot::Occupied(component)) {
            Some(Slot::Occupied(previous)) => Some(previous),
            _ => None,
        }
    }

    /// Component held by a node.
    pub fn get(&self, node: G::NodeId) -> Option<&Component<G, E>> {
        match self.slots.get(&node) {
            Some(Slot::Occupied(component)) => Some(component),
            _ => None,
        }
    }

    /// Mutable component held by a node.
    pub fn get_mut(&mut self, node: G::NodeId) -> Option<&mut Component<G, E>> {
        match self.slots.get_mut(&node) {
            Some(Slot::Occupied(component)) => Some(component),
            _ => None,
        }
    }

    /// The node's receiver, if it has a dispatch-eligible component.
    pub fn receiver_mut(&mut self, node: G::NodeId) -> Option<&mut dyn Receiver<G, E>> {
        self.get_mut(node).and_then(Component::as_receiver_mut)
    }

    /// Whether the node's slot was ever resolved.
    pub fn is_resolved(&self, node: G::NodeId) -> bool {
        self.slots.contains_key(&node)
    }

    /// Number of nodes holding a component.
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count()
    }

    /// Returns true if no node holds a component.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    //--- Maintenance ------------------------------------------------------

    /// Keeps only the slots whose node satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(G::NodeId) -> bool) {
        self.slots.retain(|&node, _| keep(node));
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl<G: SceneGraph, E: Event> Default for ComponentArena<G, E> {
    fn default() -> Self {
        Self::new()
    }
}

//=== Tests ===============================================================
