//! CLI command implementations.

use std::fs::File;
use std::io::BufWriter;

use kitesim_bench::metrics::ScenarioMetrics;
use kitesim_bench::runner::ScenarioRunner;
use kitesim_bench::scenarios::{Scenario, ScenarioKind};
use kitesim_debug::KiteSnapshot;
use kitesim_io::{run_simulation, validate_input, SimulationInput};
use kitesim_telemetry::{EventBus, JsonLinesSink, Severity, TracingSink};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Run a simulation from config file.
pub fn simulate(config_path: &str, snapshot_path: Option<&str>, events_path: Option<&str>) -> CliResult {
    println!("kitesim Simulation");
    println!("──────────────────");
    println!("Config: {config_path}");
    println!();

    let input = SimulationInput::load(config_path)?;

    let mut bus = EventBus::with_sink(Box::new(TracingSink::new(Severity::Warning)));
    if let Some(path) = events_path {
        let file = BufWriter::new(File::create(path)?);
        bus.add_sink(Box::new(JsonLinesSink::new(file)));
    }

    println!(
        "Running: {:.2}s at dt={:.4}s ({} steps)",
        input.run.duration,
        input.run.dt,
        input.run.frames()
    );

    let outcome = run_simulation(&input, bus)?;
    let metrics = &outcome.output.metrics;
    let [x, y, z] = outcome.output.final_position;

    println!();
    println!("  Wall time:     {:.3}s", metrics.wall_time_seconds);
    println!("  Steps:         {}", metrics.timestep_count);
    println!("  Final pos:     ({x:.3}, {y:.3}, {z:.3})");
    println!("  Final speed:   {:.4} m/s", metrics.final_speed);
    println!("  Line error:    {:.5}m (peak {:.5}m)", metrics.final_max_error, metrics.peak_max_error);
    println!(
        "  Tension:       L {:.2}N  R {:.2}N  ({:.1}% asym)",
        metrics.final_tension[0], metrics.final_tension[1], metrics.final_asymmetry
    );
    println!("  Warning steps: {}", metrics.warning_steps);
    println!("  Recoveries:    {}", metrics.recoveries);

    if let Some(path) = snapshot_path {
        outcome.snapshot.save(path)?;
        println!();
        println!("Snapshot written to: {path}");
    }
    if let Some(path) = events_path {
        println!("Events written to: {path}");
    }

    Ok(())
}

/// Run benchmark suite.
pub fn benchmark(scenario_name: &str, output_path: Option<&str>) -> CliResult {
    println!("kitesim Benchmark Suite");
    println!("═══════════════════════");
    println!();

    let scenarios: Vec<ScenarioKind> = if scenario_name == "all" {
        ScenarioKind::all().to_vec()
    } else {
        match ScenarioKind::from_name(scenario_name) {
            Some(kind) => vec![kind],
            None => {
                let available: Vec<&str> = ScenarioKind::all().iter().map(|k| k.name()).collect();
                eprintln!("Unknown scenario: {scenario_name}");
                eprintln!("Available: {}, all", available.join(", "));
                return Err("Unknown scenario".into());
            }
        }
    };

    let mut all_metrics = Vec::new();

    for &kind in &scenarios {
        let scenario = Scenario::from_kind(kind)?;

        println!(
            "Running: {} ({} steps, {} disturbances)",
            kind.name(),
            scenario.timesteps,
            scenario.disturbances.len(),
        );

        let metrics = ScenarioRunner::run(&scenario)
            .map_err(|e| format!("Benchmark failed: {e}"))?;

        println!("  Wall time:     {:.3}s", metrics.total_wall_time);
        println!("  Avg step:      {:.4}ms", metrics.avg_step_time * 1000.0);
        println!("  Line error:    {:.5}m", metrics.final_line_error);
        println!("  Final speed:   {:.4}m/s", metrics.final_speed);
        if let (Some(asym), Some(side)) = (metrics.pull_asymmetry, &metrics.pull_dominant) {
            println!("  Pull:          {asym:.2}% ({side})");
        }
        println!();

        all_metrics.push(metrics);
    }

    let csv = ScenarioMetrics::to_csv(&all_metrics);
    if let Some(path) = output_path {
        std::fs::write(path, &csv)?;
        println!("Results written to: {path}");
    } else {
        println!("CSV Output:");
        println!("{csv}");
    }

    Ok(())
}

/// Inspect a state snapshot.
pub fn inspect(path: &str) -> CliResult {
    println!("kitesim Snapshot Inspector");
    println!("──────────────────────────");
    println!();

    let snapshot = KiteSnapshot::load(path).map_err(|e| format!("Failed to read snapshot: {e}"))?;
    let [px, py, pz] = snapshot.position;
    let [qx, qy, qz, qw] = snapshot.orientation;

    println!("Timestep:     {}", snapshot.timestep);
    println!("Sim time:     {:.4}s", snapshot.sim_time);
    println!("Position:     ({px:.4}, {py:.4}, {pz:.4})");
    println!("Orientation:  ({qx:.4}, {qy:.4}, {qz:.4}, {qw:.4})");
    println!("Speed:        {:.4}m/s", snapshot.velocity().length());
    println!("Spin:         {:.4}rad/s", snapshot.angular_velocity().length());
    println!(
        "Lines:        L {:.3}m  R {:.3}m",
        snapshot.line_lengths[0], snapshot.line_lengths[1]
    );

    Ok(())
}

/// Validate a simulation input.
pub fn validate(path: &str) -> CliResult {
    println!("kitesim Validator");
    println!("─────────────────");
    println!();

    if !(path.ends_with(".toml") || path.ends_with(".json")) {
        println!("Unsupported file format. Use .toml or .json.");
        return Ok(());
    }

    println!("Validating input: {path}");
    let input = SimulationInput::load(path)?;
    match validate_input(&input) {
        Ok(()) => println!(
            "✅ Input is valid ({} steps, {:.1}m lines).",
            input.run.frames(),
            input.config.lines.length
        ),
        Err(e) => {
            println!("❌ Validation failed: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}
