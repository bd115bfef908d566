//! # Trajectory Executable
//!
//! Generates a trajectory from a plan of waypoints, archives it into a new
//! session and then replays it through the trajectory follower against an
//! ideal differential drive model, so that a plan can be checked before it is
//! driven.
//!
//! Usage: `traj_exec <plan.toml>`

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::env;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use traj_lib::{
    traj_follow::{Pose2, Ramsete, RamseteParams, TrajFollower},
    traj_gen::{vel_profile, TrajGen, Trajectory, Waypoint},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period of one follower cycle in the replay.
const CYCLE_PERIOD_S: f64 = 0.01;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A plan to generate a trajectory from
#[derive(Deserialize, Debug)]
struct Plan {
    waypoints: Vec<Waypoint>,
}

/// One cycle of the follower replay
#[derive(Serialize, Debug)]
struct ReplayRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    heading_rad: f64,
    target_index: usize,
    left_ms: f64,
    right_ms: f64,
    pos_error_m: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("traj_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Trajectory Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PLAN ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let plan: Plan = if args.len() == 2 {
        info!("Loading plan from \"{}\"", &args[1]);
        util::params::load_path(&args[1]).wrap_err("Failed to load plan")?
    } else {
        return Err(eyre!("Expected path to a plan as only argument"));
    };

    info!("Loaded plan with {} waypoints", plan.waypoints.len());

    // ---- GENERATE ----

    let traj_gen = TrajGen::init("traj_gen.toml").wrap_err("Failed to initialise TrajGen")?;

    let traj = traj_gen
        .generate(&plan.waypoints)
        .wrap_err("Failed to generate the trajectory")?;

    let peak_vel_ms = traj.iter().map(|s| s.vel_ms).fold(0.0, f64::max);
    let curvs_m: Vec<f64> = traj.iter().map(|s| s.curv_m).collect();
    let min_cap_ms = vel_profile::vel_caps(&curvs_m, traj_gen.params())
        .into_iter()
        .fold(std::f64::INFINITY, f64::min);

    info!(
        "Trajectory has {} samples lasting {:.03} s",
        traj.len(),
        traj.duration_s()
    );
    info!(
        "Peak velocity {:.03} m/s, tightest curvature limits velocity to {:.03} m/s\n",
        peak_vel_ms, min_cap_ms
    );

    // ---- ARCHIVE ----

    let json_path = session
        .save_json("trajectory.json", &traj)
        .wrap_err("Failed to save the trajectory")?;
    info!("Trajectory saved to {:?}", json_path);

    let num_records = Archiver::from_path(&session, "trajectory.csv")
        .wrap_err("Failed to create the trajectory archive")?
        .serialise_all(traj.records())
        .wrap_err("Failed to archive the trajectory")?;
    debug!("Archived {} trajectory records", num_records);

    // ---- REPLAY ----

    let ramsete_params: RamseteParams =
        util::params::load("ramsete.toml").wrap_err("Could not load RAMSETE params")?;

    let records = replay(&traj, Ramsete::new(ramsete_params.clone()), &ramsete_params);

    let max_error_m = records.iter().map(|r| r.pos_error_m).fold(0.0, f64::max);
    info!(
        "Replayed {} cycles, maximum position error {:.04} m",
        records.len(),
        max_error_m
    );

    Archiver::from_path(&session, "replay.csv")
        .wrap_err("Failed to create the replay archive")?
        .serialise_all(records)
        .wrap_err("Failed to archive the replay")?;

    info!("Done");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Drive an ideal differential drive robot along the trajectory with the
/// given follower, starting exactly on the first sample.
fn replay<F: TrajFollower>(traj: &Trajectory, mut follower: F, params: &RamseteParams) -> Vec<ReplayRecord> {
    let mut records = Vec::new();

    let mut pose = match traj.first() {
        Some(s) => Pose2::from(s),
        None => return records,
    };

    // A reversed robot starts with its back along the trajectory
    if params.reversed {
        pose.heading_rad = util::maths::wrap_pi(pose.heading_rad + std::f64::consts::PI);
    }

    let mut cursor = traj.cursor();
    let mut elapsed_s = 0.0;

    while !cursor.is_finished(elapsed_s) {
        let target = match cursor.advance(elapsed_s) {
            Some(t) => t,
            None => break,
        };

        let cmd = follower.follow(target, &pose);
        let (vel_ms, ang_vel_rads) = cmd.body_vels(params.track_width_m);

        records.push(ReplayRecord {
            time_s: elapsed_s,
            x_m: pose.position_m.x,
            y_m: pose.position_m.y,
            heading_rad: pose.heading_rad,
            target_index: cursor.index(),
            left_ms: cmd.left_ms,
            right_ms: cmd.right_ms,
            pos_error_m: (traj.nearest(elapsed_s).map_or(pose.position_m, |s| s.position_m)
                - pose.position_m)
                .norm(),
        });

        pose.position_m.x += vel_ms * pose.heading_rad.cos() * CYCLE_PERIOD_S;
        pose.position_m.y += vel_ms * pose.heading_rad.sin() * CYCLE_PERIOD_S;
        pose.heading_rad = util::maths::wrap_pi(pose.heading_rad + ang_vel_rads * CYCLE_PERIOD_S);

        elapsed_s += CYCLE_PERIOD_S;
    }

    records
}
