// pmove.rs: player movement
//
// Every function here works on the player's own state plus a copy of its
// body velocity. Positions are never touched: the caller sweeps the body
// through the world with the velocity left behind by `pmove`.

use bitflags::bitflags;

use qmove_common::common::com_dprintf;
use qmove_common::q_shared::{
    dot_product, vector_length, vector_ma_mut, vector_normalize, vector_scale_mut, Box3, Vec3,
    VEC3_ORIGIN, VEC3_UP,
};

use crate::physics::{BodyId, EntityId, SceneId};

// ============================================================
// Constants
// ============================================================

/// Clip overshoot, keeps clipped velocities from re-entering the plane.
pub const OVERCLIP: f32 = 1.001;

pub const JUMP_VELOCITY: f32 = 270.0;

/// `upmove` at or above this counts as holding jump.
pub const JUMP_THRESHOLD: i16 = 10;

/// How far below the player ground detection probes.
pub const GROUND_PROBE: f32 = 0.25;

// Movement parameters
pub const PM_STOPSPEED: f32 = 100.0;
pub const PM_ACCELERATE: f32 = 10.0;
pub const PM_AIRACCELERATE: f32 = 1.0;
pub const PM_FRICTION: f32 = 6.0;

pub const DEFAULT_SPEED: f32 = 320.0;
pub const DEFAULT_GRAVITY: f32 = 800.0;

/// Full deflection of one command axis.
const CMD_MAX: f32 = 127.0;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PmFlags: u8 {
        /// The current jump press has already been used.
        const JUMP_HELD = 0x01;
    }
}

// ============================================================
// Player state
// ============================================================

/// One input sample. Each axis is in [-127, 127].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserCmd {
    pub forwardmove: i16,
    pub sidemove: i16,
    /// Vertical axis, doubles as the jump button.
    pub upmove: i16,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundTrace {
    pub normal: Vec3,
}

impl Default for GroundTrace {
    fn default() -> Self {
        Self { normal: VEC3_UP }
    }
}

/// Kinematic and input state of one controlled character.
///
/// `object`, `body` and `scene` are handles into the body registry; the
/// player never owns what they point at.
#[derive(Clone, Debug)]
pub struct PlayerState {
    pub object: EntityId,
    pub body: BodyId,
    pub scene: SceneId,

    pub cmd: UserCmd,

    /// Seconds covered by this tick.
    pub dt: f32,
    pub gravity: f32,
    /// Maximum ground speed.
    pub speed: f32,
    /// Camera-relative movement axes, refreshed by the caller every tick.
    pub view_forward: Vec3,
    pub view_right: Vec3,

    pub pm_flags: PmFlags,
    pub walking: bool,
    pub ground_plane: bool,
    pub ground_trace: GroundTrace,
}

impl PlayerState {
    pub fn new(object: EntityId, body: BodyId, scene: SceneId) -> Self {
        Self {
            object,
            body,
            scene,
            cmd: UserCmd::default(),
            dt: 0.0,
            gravity: DEFAULT_GRAVITY,
            speed: DEFAULT_SPEED,
            view_forward: VEC3_ORIGIN,
            view_right: VEC3_ORIGIN,
            pm_flags: PmFlags::empty(),
            walking: false,
            ground_plane: false,
            ground_trace: GroundTrace::default(),
        }
    }
}

// ============================================================
// Callbacks trait: the engine side of ground detection
// ============================================================

/// A registered body with its box already in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBody {
    pub id: BodyId,
    pub bounds: Box3,
}

pub trait PmoveCallbacks {
    /// World-space box of `body`, or `None` if it is not registered.
    fn world_bounds(&self, body: BodyId) -> Option<Box3>;

    /// Every body in `scene`, in registry order. May include the asker.
    fn bodies_in_scene(&self, scene: SceneId) -> Vec<SceneBody>;

    /// Surface normal to stand on when `body` is the ground contact.
    /// `None` keeps whatever normal the player already has.
    fn contact_normal(&self, _body: BodyId) -> Option<Vec3> {
        None
    }
}

// ============================================================
// Movement functions
// ============================================================

/// Slide off of the impacting surface.
///
/// Velocity heading into the plane is pushed out by slightly more than its
/// normal component; velocity leaving it is pulled back by slightly less.
pub fn pm_clip_velocity(velocity: &mut Vec3, normal: &Vec3, overbounce: f32) {
    let mut backoff = dot_product(velocity, normal);

    if backoff < 0.0 {
        backoff *= overbounce;
    } else {
        backoff /= overbounce;
    }

    vector_ma_mut(velocity, -backoff, normal);
}

/// Recompute `ground_plane` and `walking`: the first body overlapping the
/// player's box, lowered by [`GROUND_PROBE`], is the ground.
pub fn player_check_ground<C: PmoveCallbacks + ?Sized>(pm: &mut PlayerState, cb: &C) {
    let was_walking = pm.walking;

    let Some(mut probe) = cb.world_bounds(pm.body) else {
        com_dprintf(format_args!(
            "player_check_ground: body {} not registered\n",
            pm.body.0
        ));
        pm.ground_plane = false;
        pm.walking = false;
        return;
    };
    probe.translate_mut(&[0.0, -GROUND_PROBE, 0.0]);

    let hit = cb
        .bodies_in_scene(pm.scene)
        .into_iter()
        .filter(|other| other.id != pm.body)
        .find(|other| probe.overlaps(&other.bounds));

    match hit {
        Some(ground) => {
            if let Some(normal) = cb.contact_normal(ground.id) {
                pm.ground_trace.normal = normal;
            }
            pm.ground_plane = true;
            pm.walking = true;
        }
        None => {
            // free fall
            pm.ground_plane = false;
            pm.walking = false;
        }
    }

    if was_walking != pm.walking {
        com_dprintf(format_args!(
            "body {}: {}\n",
            pm.body.0,
            if pm.walking { "landed" } else { "left ground" }
        ));
    }
}

/// Ground friction. Airborne players only get the low-speed snap.
pub fn player_friction(pm: &PlayerState, velocity: &mut Vec3) {
    let mut vec = *velocity;
    if pm.walking {
        vec[1] = 0.0; // ignore slope movement
    }

    let speed = vector_length(&vec);
    if speed < 1.0 {
        velocity[0] = 0.0;
        velocity[2] = 0.0;
        return;
    }

    let mut drop = 0.0f32;

    // apply ground friction
    if pm.walking {
        let control = if speed < PM_STOPSPEED { PM_STOPSPEED } else { speed };
        drop += control * PM_FRICTION * pm.dt;
    }

    // scale the velocity
    let mut newspeed = speed - drop;
    if newspeed < 0.0 {
        newspeed = 0.0;
    }
    newspeed /= speed;

    vector_scale_mut(velocity, newspeed);
}

/// Scale factor turning the raw command into a wish speed, so that
/// diagonal input is no faster than a single axis.
pub fn player_cmd_scale(pm: &PlayerState) -> f32 {
    let forward = pm.cmd.forwardmove as f32;
    let right = pm.cmd.sidemove as f32;
    let up = pm.cmd.upmove as f32;

    let max = forward.abs().max(right.abs()).max(up.abs());
    if max == 0.0 {
        return 0.0;
    }

    let total = (forward * forward + right * right + up * up).sqrt();
    (pm.speed * max) / (CMD_MAX * total)
}

/// Push velocity toward `wishdir`, never past `wishspeed` along it.
/// Components orthogonal to `wishdir` are left alone.
pub fn player_accelerate(
    pm: &PlayerState,
    velocity: &mut Vec3,
    wishdir: &Vec3,
    wishspeed: f32,
    accel: f32,
) {
    let currentspeed = dot_product(velocity, wishdir);
    let addspeed = wishspeed - currentspeed;
    if addspeed <= 0.0 {
        return;
    }
    let mut accelspeed = accel * pm.dt * wishspeed;
    if accelspeed > addspeed {
        accelspeed = addspeed;
    }

    vector_ma_mut(velocity, accelspeed, wishdir);
}

/// Fire a jump on the first tick `upmove` crosses the threshold.
/// Returns true if the player jumped.
pub fn player_check_jump(pm: &mut PlayerState, velocity: &mut Vec3) -> bool {
    if pm.cmd.upmove < JUMP_THRESHOLD {
        // not holding jump
        return false;
    }

    // must wait for jump to be released
    if pm.pm_flags.contains(PmFlags::JUMP_HELD) {
        pm.cmd.upmove = 0;
        return false;
    }

    pm.ground_plane = false;
    pm.walking = false;
    pm.pm_flags.insert(PmFlags::JUMP_HELD);

    velocity[1] = JUMP_VELOCITY;

    com_dprintf(format_args!("body {}: jump\n", pm.body.0));
    true
}

/// Wish direction and speed from the command and the flattened view axes.
fn wish_move(pm: &PlayerState, forward: &Vec3, right: &Vec3, flatten: bool) -> (Vec3, f32) {
    let mut wishvel = VEC3_ORIGIN;
    vector_ma_mut(&mut wishvel, pm.cmd.forwardmove as f32, forward);
    vector_ma_mut(&mut wishvel, pm.cmd.sidemove as f32, right);
    if flatten {
        wishvel[1] = 0.0;
    }

    let mut wishdir = wishvel;
    let wishspeed = vector_normalize(&mut wishdir);
    (wishdir, wishspeed)
}

/// Ground movement. A jump hands the rest of the tick to [`player_air_move`].
pub fn player_walk_move(pm: &mut PlayerState, velocity: &mut Vec3) {
    if player_check_jump(pm, velocity) {
        player_air_move(pm, velocity);
        return;
    }

    player_friction(pm, velocity);

    let scale = player_cmd_scale(pm);

    // project moves down to flat plane
    let mut forward = pm.view_forward;
    let mut right = pm.view_right;
    forward[1] = 0.0;
    right[1] = 0.0;

    // project the forward and right directions onto the ground plane
    pm_clip_velocity(&mut forward, &pm.ground_trace.normal, OVERCLIP);
    pm_clip_velocity(&mut right, &pm.ground_trace.normal, OVERCLIP);
    vector_normalize(&mut forward);
    vector_normalize(&mut right);

    let (wishdir, wishspeed) = wish_move(pm, &forward, &right, false);
    player_accelerate(pm, velocity, &wishdir, wishspeed * scale, PM_ACCELERATE);

    pm_clip_velocity(velocity, &pm.ground_trace.normal, OVERCLIP);

    // don't do anything if standing still
    if velocity[0] == 0.0 && velocity[2] == 0.0 {
        return;
    }

    player_step_slide_move(pm, velocity, false);
}

/// Airborne movement: weak air control plus gravity.
pub fn player_air_move(pm: &mut PlayerState, velocity: &mut Vec3) {
    player_friction(pm, velocity);

    let scale = player_cmd_scale(pm);

    // project moves down to flat plane
    let mut forward = pm.view_forward;
    let mut right = pm.view_right;
    forward[1] = 0.0;
    right[1] = 0.0;
    vector_normalize(&mut forward);
    vector_normalize(&mut right);

    let (wishdir, wishspeed) = wish_move(pm, &forward, &right, true);

    // not on ground, so little effect on velocity
    player_accelerate(pm, velocity, &wishdir, wishspeed * scale, PM_AIRACCELERATE);

    // a ground plane too steep to stand on still gets slid along
    if pm.ground_plane {
        pm_clip_velocity(velocity, &pm.ground_trace.normal, OVERCLIP);
    }

    player_step_slide_move(pm, velocity, true);
}

/// Apply one tick of gravity.
///
/// The stored velocity ends the tick at the full-step value `vy - g*dt`.
/// Returns the velocity to sweep the body with over the tick: vertical
/// speed averaged between the start and end of the step, clipped against
/// the ground plane if there is one.
pub fn player_step_slide_move(pm: &PlayerState, velocity: &mut Vec3, gravity: bool) -> Vec3 {
    if !gravity {
        return *velocity;
    }

    let mut end_velocity = *velocity;
    end_velocity[1] -= pm.gravity * pm.dt;

    let mut step_velocity = *velocity;
    step_velocity[1] = (velocity[1] + end_velocity[1]) * 0.5;
    if pm.ground_plane {
        // slide along the ground plane
        pm_clip_velocity(&mut step_velocity, &pm.ground_trace.normal, OVERCLIP);
    }

    *velocity = end_velocity;
    step_velocity
}

// ============================================================
// Public API
// ============================================================

/// Run one movement tick for `pm`. `velocity` is the player's body
/// velocity; the caller copies it out of the registry and back.
pub fn pmove<C: PmoveCallbacks + ?Sized>(pm: &mut PlayerState, velocity: &mut Vec3, cb: &C) {
    if pm.cmd.upmove < JUMP_THRESHOLD {
        // not holding jump
        pm.pm_flags.remove(PmFlags::JUMP_HELD);
    }

    player_check_ground(pm, cb);

    if pm.walking {
        player_walk_move(pm, velocity);
    } else {
        player_air_move(pm, velocity);
    }

    player_check_ground(pm, cb);
}

// ============================================================
// Unit tests
// ============================================================
