//! Editor state that bake operations read and must leave as they found it.

use bevy::prelude::*;

/// Interaction mode of the host editor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    #[default]
    Object,
    Edit,
    VertexPaint,
}

/// Active object, selection and mode of the host editor.
///
/// Operations take their trunk from [`EditorContext::active`].
#[derive(Resource, Clone, Debug, Default, PartialEq, Eq)]
pub struct EditorContext {
    pub active: Option<Entity>,
    pub selected: Vec<Entity>,
    pub mode: InteractionMode,
}

impl EditorContext {
    /// Context with `entity` as the active and only selected object.
    pub fn with_active(entity: Entity) -> Self {
        Self {
            active: Some(entity),
            selected: vec![entity],
            mode: InteractionMode::Object,
        }
    }

    pub fn is_selected(&self, entity: Entity) -> bool {
        self.selected.contains(&entity)
    }

    pub fn select_only(&mut self, entity: Entity) {
        self.selected.clear();
        self.selected.push(entity);
        self.active = Some(entity);
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }
}

/// Saved copy of an [`EditorContext`], restored when an operation ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextSnapshot(EditorContext);

impl ContextSnapshot {
    /// Capture the current context, or a default one if the resource is missing.
    pub fn capture(world: &World) -> Self {
        Self(world.get_resource::<EditorContext>().cloned().unwrap_or_default())
    }

    pub fn context(&self) -> &EditorContext {
        &self.0
    }

    /// Put the saved context back, dropping entities that no longer exist.
    pub fn restore(self, world: &mut World) {
        let mut context = self.0;
        context.selected.retain(|&e| world.get_entity(e).is_ok());
        if context.active.is_some_and(|e| world.get_entity(e).is_err()) {
            context.active = None;
        }
        world.insert_resource(context);
    }
}

/// Run `f` in object mode and restore the editor context afterwards,
/// whatever `f` returns.
pub fn with_preserved_context<R>(world: &mut World, f: impl FnOnce(&mut World) -> R) -> R {
    let snapshot = ContextSnapshot::capture(world);
    if let Some(mut context) = world.get_resource_mut::<EditorContext>() {
        context.mode = InteractionMode::Object;
    }

    let result = f(world);
    snapshot.restore(world);
    result
}
