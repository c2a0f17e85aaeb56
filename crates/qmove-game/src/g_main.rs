// g_main.rs: game setup and the per-frame player driver

use rayon::prelude::*;

use qmove_common::common::com_dprintf;
use qmove_common::cvar::{cvar_get, cvar_variable_value, with_cvar_ctx, CvarContext, CvarFlags};
use qmove_common::q_shared::{Box3, Vec3};

use crate::physics::{PhysicsWorld, SceneId};
use crate::pmove::{pmove, PlayerState, DEFAULT_GRAVITY, DEFAULT_SPEED};

pub struct GameLocals {
    pub players: Vec<PlayerState>,
    /// Values handed to newly spawned players.
    pub speed: f32,
    pub gravity: f32,
}

impl Default for GameLocals {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            speed: DEFAULT_SPEED,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

/// Register the game cvars and pick up their current values.
pub fn init_game() -> GameLocals {
    cvar_get("g_speed", "320", CvarFlags::ARCHIVE);
    cvar_get("g_gravity", "800", CvarFlags::ARCHIVE);

    GameLocals {
        players: Vec::new(),
        speed: cvar_variable_value("g_speed"),
        gravity: cvar_variable_value("g_gravity"),
    }
}

impl GameLocals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity and body for a new player. Returns the player index.
    pub fn spawn_player(
        &mut self,
        world: &mut PhysicsWorld,
        scene: SceneId,
        origin: Vec3,
        bounds: Box3,
    ) -> Option<usize> {
        let object = world.spawn_entity(scene, origin);
        let body = world.add_body(object, bounds)?;

        let mut pm = PlayerState::new(object, body, scene);
        pm.speed = self.speed;
        pm.gravity = self.gravity;

        self.players.push(pm);
        Some(self.players.len() - 1)
    }

    /// Push changed g_speed / g_gravity values to every player.
    pub fn sync_cvars(&mut self, ctx: &mut CvarContext) {
        if ctx.is_modified("g_speed") {
            self.speed = ctx.variable_value("g_speed");
            for pm in &mut self.players {
                pm.speed = self.speed;
            }
            ctx.clear_modified("g_speed");
        }

        if ctx.is_modified("g_gravity") {
            self.gravity = ctx.variable_value("g_gravity");
            for pm in &mut self.players {
                pm.gravity = self.gravity;
            }
            ctx.clear_modified("g_gravity");
        }
    }
}

/// Run one movement tick for a single player. Returns false if the player's
/// body is no longer registered.
pub fn run_player(world: &mut PhysicsWorld, pm: &mut PlayerState) -> bool {
    let Some(body) = world.body(pm.body) else {
        com_dprintf(format_args!("run_player: body {} not registered\n", pm.body.0));
        return false;
    };

    let mut velocity = body.velocity;
    pmove(pm, &mut velocity, &*world);

    if let Some(body) = world.body_mut(pm.body) {
        body.velocity = velocity;
    }
    true
}

/// Run every player against the same registry state.
///
/// Ground detection only reads boxes and positions and each player only
/// writes its own velocity, so players are evaluated in parallel and the
/// results applied afterwards in player order.
pub fn run_players(world: &mut PhysicsWorld, players: &mut [PlayerState]) {
    // Phase 1: parallel movement against a read-only registry
    let shared: &PhysicsWorld = world;
    let results: Vec<Option<Vec3>> = players
        .par_iter_mut()
        .map(|pm| {
            let mut velocity = shared.body(pm.body)?.velocity;
            pmove(pm, &mut velocity, shared);
            Some(velocity)
        })
        .collect();

    // Phase 2: sequential application of results
    for (pm, result) in players.iter().zip(results) {
        match result {
            Some(velocity) => {
                if let Some(body) = world.body_mut(pm.body) {
                    body.velocity = velocity;
                }
            }
            None => com_dprintf(format_args!(
                "run_players: body {} not registered\n",
                pm.body.0
            )),
        }
    }
}

/// Advance every player by one tick of `dt` seconds.
pub fn run_frame(world: &mut PhysicsWorld, game: &mut GameLocals, dt: f32) {
    with_cvar_ctx(|ctx| game.sync_cvars(ctx));

    for pm in &mut game.players {
        pm.dt = dt;
    }

    run_players(world, &mut game.players);
}

// ============================================================
// Tests
// ============================================================
