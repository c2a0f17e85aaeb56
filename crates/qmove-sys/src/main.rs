// Entry point: headless movement runner
//
//   1. Register cvars and apply `+set` arguments from the command line
//   2. Build a scene with a floor and one player standing on it
//   3. Run `sim_frames` ticks of 1/sv_fps seconds with a scripted input
//      sequence, advancing the player's position after every tick

use tracing_subscriber::EnvFilter;

use qmove_common::common::{com_init, com_printf, DISTNAME, DISTVER};
use qmove_common::cvar::{
    cvar_apply_command_line, cvar_get, cvar_get_latched_vars, cvar_variable_value, with_cvar_ctx,
    CvarError, CvarFlags,
};
use qmove_common::q_shared::{vector_ma, vector_set, Box3};
use qmove_game::g_main::{init_game, run_frame};
use qmove_game::physics::{PhysicsWorld, SceneId};
use qmove_game::pmove::{PlayerState, UserCmd};

const FLOOR_BOX: Box3 = Box3::new([-512.0, -16.0, -512.0], [512.0, 0.0, 512.0]);
const PLAYER_BOX: Box3 = Box3::new([-16.0, 0.0, -16.0], [16.0, 56.0, 16.0]);

/// Input for `frame` out of `total`: idle, run, jump while running,
/// keep running, then strafe.
fn script_cmd(frame: u32, total: u32) -> UserCmd {
    let t = frame as f32 / total.max(1) as f32;
    if t < 0.15 {
        UserCmd::default()
    } else if t < 0.5 {
        UserCmd { forwardmove: 127, ..Default::default() }
    } else if t < 0.55 {
        UserCmd { forwardmove: 127, upmove: 127, ..Default::default() }
    } else if t < 0.75 {
        UserCmd { forwardmove: 127, ..Default::default() }
    } else {
        UserCmd { sidemove: 127, ..Default::default() }
    }
}

/// Move the player's entity by its velocity, then lift it out of anything
/// it sank into from above and drop the downward speed.
fn advance_player(world: &mut PhysicsWorld, pm: &PlayerState, dt: f32) {
    let Some(velocity) = world.body(pm.body).map(|b| b.velocity) else {
        return;
    };
    let Some(entity) = world.entity_mut(pm.object) else {
        return;
    };
    entity.position = vector_ma(&entity.position, dt, &velocity);

    let Some(own) = world.world_box(pm.body) else {
        return;
    };
    let height = own.size()[1];
    let mut lift = 0.0f32;
    for (id, _) in world.bodies_in_scene(pm.scene) {
        if id == pm.body {
            continue;
        }
        let Some(other) = world.world_box(id) else {
            continue;
        };
        let depth = other.maxs[1] - own.mins[1];
        if own.overlaps(&other) && depth > 0.0 && depth < height {
            lift = lift.max(depth);
        }
    }

    if lift > 0.0 {
        if let Some(entity) = world.entity_mut(pm.object) {
            entity.position[1] += lift;
        }
        if let Some(body) = world.body_mut(pm.body) {
            if body.velocity[1] < 0.0 {
                body.velocity[1] = 0.0;
            }
        }
    }
}

/// The archived settings this run uses, one `set` line each.
fn archived_config() -> String {
    let mut buf = Vec::new();
    if with_cvar_ctx(|c| c.write_variables(&mut buf)).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_line(frame: u32, world: &PhysicsWorld, pm: &PlayerState) -> String {
    let pos = world.entity(pm.object).map_or([0.0; 3], |e| e.position);
    let vel = world.body(pm.body).map_or([0.0; 3], |b| b.velocity);
    format!(
        "frame {:4}  pos ({:8.2} {:8.2} {:8.2})  vel ({:8.2} {:8.2} {:8.2})  {}\n",
        frame,
        pos[0],
        pos[1],
        pos[2],
        vel[0],
        vel[1],
        vel[2],
        if pm.walking { "ground" } else { "air" }
    )
}

fn run(args: &[String]) -> Result<(), CvarError> {
    com_init();
    cvar_get("sv_fps", "60", CvarFlags::LATCH);
    cvar_get("sim_frames", "240", CvarFlags::empty());
    let mut game = init_game();

    cvar_apply_command_line(args)?;
    cvar_get_latched_vars();

    com_printf(&format!("{} {:.2}\n", DISTNAME, DISTVER));
    com_printf(&archived_config());

    let fps = cvar_variable_value("sv_fps").max(1.0);
    let frames = cvar_variable_value("sim_frames").max(0.0) as u32;
    let dt = 1.0 / fps;

    let scene = SceneId(0);
    let mut world = PhysicsWorld::new();
    let floor = world.spawn_entity(scene, [0.0, 0.0, 0.0]);
    world.add_body(floor, FLOOR_BOX);
    let Some(idx) = game.spawn_player(&mut world, scene, [0.0, 0.0, 0.0], PLAYER_BOX) else {
        com_printf("couldn't spawn player\n");
        return Ok(());
    };

    for frame in 0..frames {
        {
            let pm = &mut game.players[idx];
            pm.cmd = script_cmd(frame, frames);
            // camera looks down -z, slightly pitched
            vector_set(&mut pm.view_forward, 0.0, -0.2, -1.0);
            vector_set(&mut pm.view_right, 1.0, 0.0, 0.0);
        }

        run_frame(&mut world, &mut game, dt);
        advance_player(&mut world, &game.players[idx], dt);

        com_printf(&status_line(frame, &world, &game.players[idx]));
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        com_printf(&format!("{}\n", e));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmove_game::g_main::GameLocals;

    fn scene_with_player(origin: [f32; 3]) -> (PhysicsWorld, GameLocals) {
        let mut world = PhysicsWorld::new();
        let floor = world.spawn_entity(SceneId(0), [0.0, 0.0, 0.0]);
        world.add_body(floor, FLOOR_BOX);
        let mut game = GameLocals::new();
        game.spawn_player(&mut world, SceneId(0), origin, PLAYER_BOX);
        (world, game)
    }

    #[test]
    fn test_script_phases() {
        assert_eq!(script_cmd(0, 100), UserCmd::default());
        assert_eq!(script_cmd(20, 100).forwardmove, 127);
        assert_eq!(script_cmd(52, 100).upmove, 127);
        assert_eq!(script_cmd(60, 100).upmove, 0);
        assert_eq!(script_cmd(90, 100).sidemove, 127);
    }

    #[test]
    fn test_archived_config_lists_game_settings() {
        init_game();
        let config = archived_config();
        assert!(config.contains("set g_speed \""));
        assert!(config.contains("set g_gravity \""));
    }

    #[test]
    fn test_advance_lifts_out_of_floor() {
        let (mut world, game) = scene_with_player([0.0, 1.0, 0.0]);
        let pm = &game.players[0];
        world.body_mut(pm.body).unwrap().velocity = [0.0, -120.0, 0.0];

        advance_player(&mut world, pm, 0.1);

        assert_eq!(world.entity(pm.object).unwrap().position[1], 0.0);
        assert_eq!(world.body(pm.body).unwrap().velocity[1], 0.0);
    }

    #[test]
    fn test_advance_in_air_keeps_velocity() {
        let (mut world, game) = scene_with_player([0.0, 100.0, 0.0]);
        let pm = &game.players[0];
        world.body_mut(pm.body).unwrap().velocity = [10.0, -50.0, 0.0];

        advance_player(&mut world, pm, 0.1);

        assert_eq!(world.entity(pm.object).unwrap().position, [1.0, 95.0, 0.0]);
        assert_eq!(world.body(pm.body).unwrap().velocity, [10.0, -50.0, 0.0]);
    }

    #[test]
    fn test_jump_leaves_and_returns_to_ground() {
        let (mut world, mut game) = scene_with_player([0.0, 0.0, 0.0]);
        let dt = 1.0 / 60.0;
        let mut left_ground = false;
        let mut landed = false;

        for frame in 0..120 {
            game.players[0].cmd = if frame < 5 {
                UserCmd { upmove: 127, ..Default::default() }
            } else {
                UserCmd::default()
            };
            run_frame(&mut world, &mut game, dt);
            advance_player(&mut world, &game.players[0], dt);

            if !game.players[0].walking {
                left_ground = true;
            } else if left_ground {
                landed = true;
            }
        }

        assert!(left_ground);
        assert!(landed);
        assert!(world.entity(game.players[0].object).unwrap().position[1].abs() < 1.0);
    }
}
