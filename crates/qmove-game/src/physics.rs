// physics.rs: registry of entities and the bodies attached to them
//
// The registry only stores state. Moving entities and resolving
// penetration is the caller's job; player movement reads it through
// `PmoveCallbacks` and writes back nothing but velocities.

use qmove_common::q_shared::{Box3, Vec3, VEC3_ORIGIN};

use crate::pmove::{PmoveCallbacks, SceneBody};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SceneId(pub u32);

/// A transform in some scene. Owns the world-space position.
#[derive(Clone, Debug)]
pub struct Entity {
    pub position: Vec3,
    pub scene: SceneId,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub velocity: Vec3,
    /// Local-space box, relative to the parent's position.
    pub bounding_box: Box3,
    pub parent: EntityId,
    /// Surface normal published by whoever owns this body's geometry.
    pub contact_normal: Option<Vec3>,
}

impl Body {
    pub fn new(parent: EntityId, bounding_box: Box3) -> Self {
        Self {
            velocity: VEC3_ORIGIN,
            bounding_box,
            parent,
            contact_normal: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct PhysicsWorld {
    entities: Vec<Entity>,
    bodies: Vec<Option<Body>>,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_entity(&mut self, scene: SceneId, position: Vec3) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity { position, scene });
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0 as usize)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0 as usize)
    }

    /// Attach a body to `parent`. Returns `None` if the entity does not exist.
    pub fn add_body(&mut self, parent: EntityId, bounding_box: Box3) -> Option<BodyId> {
        self.entity(parent)?;
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(Some(Body::new(parent, bounding_box)));
        Some(id)
    }

    /// Remove a body. Its handle stays stale; slots are never reused.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        self.bodies.get_mut(id.0 as usize)?.take()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.0 as usize)?.as_ref()
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn set_contact_normal(&mut self, id: BodyId, normal: Option<Vec3>) {
        if let Some(body) = self.body_mut(id) {
            body.contact_normal = normal;
        }
    }

    /// Every live body whose parent sits in `scene`, in registry order.
    pub fn bodies_in_scene(&self, scene: SceneId) -> impl Iterator<Item = (BodyId, &Body)> + '_ {
        self.bodies.iter().enumerate().filter_map(move |(i, slot)| {
            let body = slot.as_ref()?;
            let parent = self.entity(body.parent)?;
            (parent.scene == scene).then_some((BodyId(i as u32), body))
        })
    }

    /// The body's box translated to its parent's position.
    pub fn world_box(&self, id: BodyId) -> Option<Box3> {
        let body = self.body(id)?;
        let parent = self.entity(body.parent)?;
        Some(body.bounding_box.translate(&parent.position))
    }
}

impl PmoveCallbacks for PhysicsWorld {
    fn world_bounds(&self, body: BodyId) -> Option<Box3> {
        self.world_box(body)
    }

    fn bodies_in_scene(&self, scene: SceneId) -> Vec<SceneBody> {
        PhysicsWorld::bodies_in_scene(self, scene)
            .filter_map(|(id, _)| {
                Some(SceneBody {
                    id,
                    bounds: self.world_box(id)?,
                })
            })
            .collect()
    }

    fn contact_normal(&self, body: BodyId) -> Option<Vec3> {
        self.body(body)?.contact_normal
    }
}

// ============================================================
// Tests
// ============================================================
