use std::io::Write;

use crate::error::Result;
use crate::sim::SimRun;

/// Write one row per tick of a run in CSV format.
///
/// Columns: time, angle_deg, steering_deg, err_pitch_deg, err_yaw_deg, err_roll_deg,
///          cmd_pitch, cmd_yaw, cmd_roll, cmd_x, cmd_y, cmd_z,
///          mode, sas, rcs, omega_x, omega_y, omega_z, mass,
///          dock_phase, dock_z, dock_lateral
pub fn write_run<W: Write>(writer: &mut W, run: &SimRun) -> Result<()> {
    writeln!(
        writer,
        "time,angle_deg,steering_deg,err_pitch_deg,err_yaw_deg,err_roll_deg,\
         cmd_pitch,cmd_yaw,cmd_roll,cmd_x,cmd_y,cmd_z,\
         mode,sas,rcs,omega_x,omega_y,omega_z,mass,\
         dock_phase,dock_z,dock_lateral"
    )?;

    for ((s, c), t) in run.states.iter().zip(&run.commands).zip(&run.telemetry) {
        let e = t.attitude.euler_error;
        writeln!(
            writer,
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},\
             {:.5},{:.5},{:.5},{:.5},{:.5},{:.5},\
             {},{},{},{:.6},{:.6},{:.6},{:.3},\
             {},{:.3},{:.3}",
            s.time,
            t.attitude.angle_from_target,
            t.attitude.steering_error,
            e.x, e.y, e.z,
            c.pitch, c.yaw, c.roll,
            c.x, c.y, c.z,
            t.arbiter.mode,
            c.sas as u8,
            c.rcs as u8,
            s.omega.x, s.omega.y, s.omega.z,
            s.mass,
            t.docking.phase,
            t.docking.z_separation,
            t.docking.lateral_separation,
        )?;
    }

    Ok(())
}

/// Write a run to a CSV file at the given path.
pub fn write_run_file(path: &str, run: &SimRun) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_run(&mut file, run)
}
