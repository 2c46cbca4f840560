//! # Navigation executable
//!
//! Runs the navigation controller at a fixed cadence.
//!
//! # Architecture
//!
//! - Initialise the session, logging, parameters and the map
//! - Select the motor driver (simulated, or GPIO on the robot)
//! - Main loop:
//!     - Telecommand processing, from the command line or a script
//!     - Navigation controller cycle
//!     - Status archiving
//!
//! Time in the loop is the simulated time, `cycle * CYCLE_PERIOD_S`. Unless `--fast` is given
//! each cycle is padded out to the cycle period.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use comms_if::tc::Tc;
use nav_lib::{
    auto::nav_ctrl::{NavCtrl, NavStatus, WheelDemand},
    map_repo::{JsonMapRepository, MapData, MapRepository},
    motor_driver::{MotorDriver, SimMotorDriver},
    params::{GpioParams, NavParams},
    tc_processor,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: u64 = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec", about = "Service robot navigation executable")]
struct Opt {
    /// Drive the motors through the GPIO pins rather than the simulated driver.
    #[structopt(long)]
    gpio: bool,

    /// Name of the map to load from `params/maps`.
    #[structopt(long, default_value = "demo")]
    map: String,

    /// Stop after this many cycles.
    #[structopt(long)]
    max_cycles: Option<u64>,

    /// Run cycles back to back instead of at the cycle rate.
    #[structopt(long)]
    fast: bool,

    /// Log every cycle's motion at trace level.
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Command,
}

/// One line of the status archive.
#[derive(Debug, Serialize)]
struct StatusRecord {
    time_s: f64,
    state: &'static str,
    x_m: f64,
    y_m: f64,
    heading_deg: f64,
    progress: f64,
    eta_s: f64,
    target_x_m: Option<f64>,
    target_y_m: Option<f64>,
    left_pct: f64,
    right_pct: f64,
    speed_multiplier: f64,
    last_event: Option<&'static str>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
enum Command {
    /// Travel to the given point, pause, and return to base.
    #[structopt(name = "goto")]
    Goto {
        /// The x-coordinate of the destination.
        x_m: f64,

        /// The y-coordinate of the destination.
        y_m: f64,
    },

    /// Travel to a point of interest of the loaded map and return to base.
    #[structopt(name = "poi")]
    Poi { name: String },

    /// Execute the TC script at the given path.
    #[structopt(name = "script")]
    Script {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
}

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    /// A single TC from the command line, taken on the first cycle.
    Single(Option<Tc>),
    Script(ScriptInterpreter),
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = if opt.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Service Robot Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params: NavParams =
        util::params::load("nav.toml").wrap_err("Could not load navigation params")?;

    info!("Parameters loaded");

    // ---- LOAD MAP ----

    let repo = JsonMapRepository::from_params_dir().wrap_err("Could not find the maps")?;
    let mut map = repo
        .load_map(&opt.map)
        .wrap_err_with(|| format!("Could not load the map \"{}\"", opt.map))?;

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match opt.cmd {
        Command::Goto { x_m, y_m } => TcSource::Single(Some(Tc::NavigateAndReturn { x_m, y_m })),
        Command::Poi { ref name } => TcSource::Single(Some(Tc::NavigateToPoi {
            name: name.clone(),
        })),
        Command::Script { ref path } => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
    };

    // ---- INITIALISE MODULES ----

    let driver: Box<dyn MotorDriver> = if opt.gpio {
        info!("Using the GPIO motor driver");
        gpio_driver(&params.gpio)?
    } else {
        info!("Using the simulated motor driver");
        Box::new(SimMotorDriver::new())
    };

    let mut nav = NavCtrl::new(params, driver);
    nav.set_forbidden_areas(map.forbidden_areas.clone());

    let mut archiver = Archiver::from_path(&session, "nav_status.csv")
        .wrap_err("Failed to create the status archive")?;

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut num_cycles: u64 = 0;
    let mut was_active = false;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let time_s = num_cycles as f64 * CYCLE_PERIOD_S;

        // ---- TELECOMMAND PROCESSING ----

        let mut tcs_done = false;

        match tc_source {
            TcSource::Single(ref mut tc) => match tc.take() {
                Some(tc) => exec_tc(&tc, &mut nav, &mut map, &repo),
                None => tcs_done = true,
            },
            TcSource::Script(ref mut si) => match si.get_pending_tcs(time_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        exec_tc(tc, &mut nav, &mut map, &repo);
                    }
                }
                PendingTcs::EndOfScript => tcs_done = true,
            },
        }

        // ---- NAVIGATION PROCESSING ----

        nav.tick(CYCLE_PERIOD_S);

        let status = nav.get_navigation_status();

        // Save each new route in the session
        if status.navigation_active && !was_active {
            if let Some(route) = nav.route() {
                session.save_with_timestamp("route.json", route.clone());
            }
        }
        was_active = status.navigation_active;

        if num_cycles % CYCLE_FREQUENCY_HZ == 0 {
            debug!(
                "{} at ({:.2}, {:.2}) heading {:.1}, progress {:.0} %, {:.1} s remaining",
                status.state,
                status.position_m.x,
                status.position_m.y,
                status.heading_deg,
                status.progress * 100.0,
                status.estimated_time_remaining_s
            );
        }

        // ---- WRITE ARCHIVES ----

        archiver
            .serialise(StatusRecord::new(time_s, &status, nav.last_demand()))
            .wrap_err("Failed to archive the status")?;

        // ---- EXIT CONDITIONS ----

        if tcs_done && !status.navigation_active {
            info!("All TCs processed and navigation finished, stopping");
            break;
        }

        num_cycles += 1;

        if let Some(max) = opt.max_cycles {
            if num_cycles >= max {
                warn!("Maximum number of cycles ({}) reached, stopping", max);
                break;
            }
        }

        // ---- CYCLE MANAGEMENT ----

        if !opt.fast {
            let cycle_dur = Instant::now() - cycle_start_instant;

            match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                ),
            }
        }
    }

    // ---- SHUTDOWN ----

    let status = nav.get_navigation_status();
    info!(
        "Final state {} at ({:.3}, {:.3}) heading {:.2} after {} cycles",
        status.state, status.position_m.x, status.position_m.y, status.heading_deg, num_cycles
    );

    nav.cleanup();
    session.exit();

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn exec_tc<D: MotorDriver>(
    tc: &Tc,
    nav: &mut NavCtrl<D>,
    map: &mut MapData,
    repo: &dyn MapRepository,
) {
    info!("Executing TC {:?}", tc);

    if let Err(e) = tc_processor::exec(tc, nav, map, repo) {
        warn!("Could not execute TC: {}", e);
    }
}

/// Build the GPIO motor driver from the Raspberry Pi's pins.
#[cfg(target_arch = "arm")]
fn gpio_driver(params: &GpioParams) -> Result<Box<dyn MotorDriver>, Report> {
    use nav_lib::motor_driver::{GpioMotorDriver, MotorChannel};
    use rppal::{
        gpio::Gpio,
        pwm::{Channel, Polarity, Pwm},
    };

    let gpio = Gpio::new().wrap_err("Could not access the GPIO")?;
    let output = |pin: u8| -> Result<rppal::gpio::OutputPin, Report> {
        Ok(gpio
            .get(pin)
            .wrap_err_with(|| format!("Could not get GPIO pin {}", pin))?
            .into_output())
    };
    let pwm = |channel: Channel| {
        Pwm::with_frequency(channel, params.pwm_frequency_hz, 0.0, Polarity::Normal, false)
            .wrap_err_with(|| format!("Could not open PWM channel {:?}", channel))
    };

    let left = MotorChannel::new(
        output(params.left_direction_pin)?,
        output(params.left_brake_pin)?,
        pwm(Channel::Pwm0)?,
        params.left_inverted,
    );
    let right = MotorChannel::new(
        output(params.right_direction_pin)?,
        output(params.right_brake_pin)?,
        pwm(Channel::Pwm1)?,
        params.right_inverted,
    );

    let driver = GpioMotorDriver::new(left, right).wrap_err("Could not start the motor driver")?;

    Ok(Box::new(driver))
}

#[cfg(not(target_arch = "arm"))]
fn gpio_driver(_params: &GpioParams) -> Result<Box<dyn MotorDriver>, Report> {
    Err(color_eyre::eyre::eyre!(
        "The GPIO motor driver is only available on the robot (ARM Linux targets)"
    ))
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StatusRecord {
    fn new(time_s: f64, status: &NavStatus, demand: &WheelDemand) -> Self {
        Self {
            time_s,
            state: status.state.as_str(),
            x_m: status.position_m.x,
            y_m: status.position_m.y,
            heading_deg: status.heading_deg,
            progress: status.progress,
            eta_s: status.estimated_time_remaining_s,
            target_x_m: status.current_target.map(|t| t.x),
            target_y_m: status.current_target.map(|t| t.y),
            left_pct: demand.left_pct,
            right_pct: demand.right_pct,
            speed_multiplier: status.speed_multiplier,
            last_event: status.last_event.as_ref().map(|e| e.kind()),
        }
    }
}
