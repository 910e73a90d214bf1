use clap::{App, Arg};
use colored::*;
use spacetwin::component::{Component, ComponentRoutine, PrescalerConfig};
use spacetwin::{RunSummary, SimulationCase, SimulationConfig};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Bus heartbeat: the simplest component that proves the scheduler is alive.
#[derive(Default)]
struct Heartbeat {
    beats: u64,
}

impl ComponentRoutine for Heartbeat {
    fn main_routine(&mut self, count: u64) {
        self.beats += 1;
        debug!(count, beats = self.beats, "Heartbeat");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("spacetwin-sim")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Space Systems Engineering Team")
        .about("🛰️  Spacecraft digital twin - time-stepped simulation kernel")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON simulation configuration")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("end-time")
                .short("t")
                .long("end-time")
                .value_name("SECONDS")
                .help("Override the simulated end time")
                .takes_value(true)
                .validator(|v| match v.parse::<f64>() {
                    Ok(t) if t.is_finite() && t >= 0.0 => Ok(()),
                    _ => Err("End time must be a non-negative number".into()),
                }),
        )
        .arg(
            Arg::with_name("trials")
                .short("n")
                .long("trials")
                .value_name("COUNT")
                .help("Number of Monte Carlo trials")
                .takes_value(true)
                .default_value("1")
                .validator(|v| match v.parse::<u32>() {
                    Ok(n) if n > 0 => Ok(()),
                    _ => Err("Trials must be a positive integer".into()),
                }),
        )
        .arg(
            Arg::with_name("log-dir")
                .short("l")
                .long("log-dir")
                .value_name("DIR")
                .help("Write CSV logs and the archived configuration here")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Summary output format")
                .takes_value(true)
                .possible_values(&["json", "table"])
                .default_value("table"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug logging"),
        )
        .get_matches();

    let verbose = matches.is_present("verbose");
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match matches.value_of("config") {
        Some(path) => SimulationConfig::from_file(Path::new(path))?,
        None => SimulationConfig::default(),
    };
    if let Some(end_time) = matches.value_of("end-time") {
        config.time.end_time_s = end_time.parse()?;
    }
    if let Some(directory) = matches.value_of("log-dir") {
        config.logging.directory = Some(directory.into());
    }
    config.validate()?;

    let trials: u32 = matches.value_of("trials").unwrap_or("1").parse()?;
    let format = matches.value_of("format").unwrap_or("table");

    println!("{}", "🛰️  Spacecraft Digital Twin".bright_blue().bold());
    println!("{}", "===========================".bright_blue());
    if verbose {
        println!("{} {}", "Central body:".dimmed(), config.central_body);
        println!("{} {:?}", "Integrator:".dimmed(), config.integrator.scheme);
    }

    let mut case = SimulationCase::new(&config)?;
    let heartbeat = Rc::new(RefCell::new(Component::with_prescalers(
        Heartbeat::default(),
        &PrescalerConfig::default(),
    )));
    case.scheduler_mut().register_component(&heartbeat)?;

    for trial in 1..=trials {
        if trial > 1 {
            case.reset()?;
        }
        info!(trial, trials, "Starting trial");
        let summary = case.run()?;
        print_summary(trial, &summary, format)?;
    }

    println!(
        "{} {} heartbeats over {} trial(s)",
        "✅".green(),
        heartbeat.borrow().routine().beats,
        trials
    );

    Ok(())
}

fn print_summary(trial: u32, summary: &RunSummary, format: &str) -> Result<(), serde_json::Error> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let [x, y, z] = summary.position_i_m;
    let radius_km = (x * x + y * y + z * z).sqrt() / 1000.0;

    println!("{} {}", "📊".bright_blue(), format!("Trial {trial}").bright_blue().bold());
    println!("  {} {:.3} s ({} steps)", "Elapsed:".bright_white(), summary.elapsed_s, summary.steps);
    println!("  {} {}", "Component ticks:".bright_white(), summary.component_ticks);
    println!(
        "  {} {} (h = {:.4e} s, err = {:.3e})",
        "Orbit steps:".bright_white(),
        summary.orbit_steps,
        summary.final_step_width_s,
        summary.final_local_error
    );
    println!("  {} {:.3} km", "Orbit radius:".bright_white(), radius_km);
    println!("  {} {}", "Attitude steps:".bright_white(), summary.attitude_steps);
    println!("  {} {:?}", "Attitude q_i2b:".bright_white(), summary.attitude_i2b);
    println!("  {} {:?}", "Angular velocity [rad/s]:".bright_white(), summary.angular_velocity_b_rad_s);
    println!("  {} {:?}", "Total torque [Nm]:".bright_white(), summary.total_torque_b_nm);
    println!("  {} {:?}", "Total force [N]:".bright_white(), summary.total_force_b_n);
    println!("  {} {:?}", "Total accel [m/s2]:".bright_white(), summary.total_acceleration_i_m_s2);
    println!("  {} {}", "Log rows:".bright_white(), summary.log_rows.to_string().bright_cyan());

    Ok(())
}
