//=========================================================================
// Scene Library
//=========================================================================
//
// Named collection of scene templates. The engine searches its
// libraries in registration order when a stage asks for a scene by name.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::rc::Rc;

//=== Internal Dependencies ===============================================

use super::SceneGraph;

//=== SceneLibrary ========================================================

/// Collection of scene templates that stages instantiate from.
pub struct SceneLibrary<G: SceneGraph> {
    name: String,
    scenes: Vec<Rc<G>>,
}

impl<G: SceneGraph> SceneLibrary<G> {
    /// Creates an empty library.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scenes: Vec::new(),
        }
    }

    /// Adds a template and returns the library for chaining.
    pub fn with_scene(mut self, scene: G) -> Self {
        self.add_scene(scene);
        self
    }

    /// Adds a template and returns the shared handle stages will hold.
    ///
    /// A template whose name is already present shadows nothing: lookups
    /// return the first match.
    pub fn add_scene(&mut self, scene: G) -> Rc<G> {
        let scene = Rc::new(scene);
        self.scenes.push(Rc::clone(&scene));
        scene
    }

    /// Finds the first template with the given name.
    pub fn find_scene(&self, name: &str) -> Option<Rc<G>> {
        self.scenes.iter().find(|s| s.name() == name).cloned()
    }

    /// Name of this library.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterates templates in insertion order.
    pub fn scenes(&self) -> impl Iterator<Item = &Rc<G>> {
        self.scenes.iter()
    }

    /// Number of templates held.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Returns true if the library holds no templates.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

//=== Tests ===============================================================
