use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use turing_canvas::{
    EngineConfig, EngineError, HaltReport, Machine, Outcome, RunOutcome, SampleManager, SimEvent,
    SnapshotLoader, Tape, MAX_EXECUTION_STEPS,
};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// The machine snapshot (.json) to run
    #[clap(short, long, conflicts_with = "sample")]
    machine: Option<PathBuf>,

    /// Run one of the embedded sample machines, by name
    #[clap(short, long)]
    sample: Option<String>,

    /// Replace the tape with these symbols, starting at cell 0
    #[clap(short, long)]
    tape: Option<String>,

    /// Initial head position
    #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
    head: i64,

    /// Print each step of the execution
    #[clap(short = 'd', long)]
    step: bool,

    /// Run in real time, one step per interval
    #[clap(short, long)]
    animate: bool,

    /// List the embedded sample machines
    #[clap(short, long)]
    list: bool,

    /// Base step interval in milliseconds
    #[clap(long)]
    interval: Option<u64>,

    /// Speed divisor applied to the step interval
    #[clap(long)]
    speed: Option<u32>,

    /// Engine configuration file (.json)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

enum Finish {
    Listed,
    Halted(HaltReport),
    StepLimit(usize),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(Finish::Listed) => ExitCode::SUCCESS,
        Ok(Finish::Halted(report)) => {
            print_report(&report);
            match report.outcome {
                Outcome::Accept => ExitCode::SUCCESS,
                Outcome::Reject => ExitCode::from(1),
            }
        }
        Ok(Finish::StepLimit(steps)) => {
            eprintln!("Machine did not halt within {} steps", steps);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<Finish, EngineError> {
    if cli.list {
        for index in 0..SampleManager::get_sample_count() {
            let info = SampleManager::get_sample_info(index)?;
            println!(
                "{:>2}. {} ({} states, {} transitions, tape: [{}])",
                info.index, info.name, info.state_count, info.transition_count, info.initial_tape
            );
        }
        return Ok(Finish::Listed);
    }

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(interval) = cli.interval {
        config.sim.base_interval_ms = interval;
    }
    if let Some(speed) = cli.speed {
        config.sim.speed_divisor = speed;
    }

    let mut snapshot = match (&cli.machine, &cli.sample) {
        (Some(path), _) => SnapshotLoader::load_snapshot(path)?,
        (None, Some(name)) => SampleManager::get_sample_by_name(name)?,
        (None, None) => {
            return Err(EngineError::FileError(
                "Either --machine or --sample is required".to_string(),
            ))
        }
    };
    if let Some(tape) = &cli.tape {
        snapshot.tape = Tape::from_input(tape, 0);
    }

    let mut machine = Machine::from_snapshot(snapshot, config);
    machine.set_head(cli.head)?;

    if cli.animate {
        animate(&mut machine, cli.step)
    } else if cli.step {
        print_state(&machine);
        let mut events = machine.play()?;
        let mut steps = 0;
        loop {
            for event in &events {
                match event {
                    SimEvent::Stepped { .. } => print_state(&machine),
                    SimEvent::Halted(report) => return Ok(Finish::Halted(report.clone())),
                    SimEvent::Aborted(e) => return Err(e.clone()),
                    _ => {}
                }
            }
            steps += 1;
            if steps > MAX_EXECUTION_STEPS {
                machine.pause();
                return Ok(Finish::StepLimit(MAX_EXECUTION_STEPS));
            }
            events = machine.advance(machine.interval());
        }
    } else {
        match machine.run_to_halt(MAX_EXECUTION_STEPS)? {
            RunOutcome::Halted(report) => Ok(Finish::Halted(report)),
            RunOutcome::StepLimit { steps } => Ok(Finish::StepLimit(steps)),
        }
    }
}

/// Drives the machine with the wall clock at roughly 60 frames per second.
fn animate(machine: &mut Machine, verbose: bool) -> Result<Finish, EngineError> {
    print_state(machine);
    let mut events = machine.play()?;
    let mut last = Instant::now();

    loop {
        for event in &events {
            match event {
                SimEvent::Stepped { .. } if verbose => print_state(machine),
                SimEvent::Stepped { .. } => {}
                SimEvent::Halted(report) => return Ok(Finish::Halted(report.clone())),
                SimEvent::Aborted(e) => return Err(e.clone()),
                _ => {}
            }
        }
        if machine.cursor().steps >= MAX_EXECUTION_STEPS {
            machine.pause();
            return Ok(Finish::StepLimit(MAX_EXECUTION_STEPS));
        }

        thread::sleep(FRAME);
        let now = Instant::now();
        events = machine.advance(now - last);
        last = now;
    }
}

fn print_state(machine: &Machine) {
    let cursor = machine.cursor();
    let state = cursor
        .current_state
        .as_ref()
        .or(machine.store().start_state())
        .and_then(|id| machine.store().state(id).ok())
        .map(|state| {
            if state.mnemonic.is_empty() {
                state.id.to_string()
            } else {
                state.mnemonic.clone()
            }
        })
        .unwrap_or_default();

    println!(
        "Step: {}, State: {}, Head: {}, Tape: [{}]",
        cursor.steps,
        state,
        cursor.head,
        machine.store().tape().symbols()
    );
}

fn print_report(report: &HaltReport) {
    let verdict = match report.outcome {
        Outcome::Accept => "accepted",
        Outcome::Reject => "rejected",
    };
    println!(
        "\nMachine {} in state {} after {} steps.",
        verdict, report.state, report.steps
    );
    println!("Initial tape: [{}]", report.initial_tape);
    println!("Final tape:   [{}]", report.final_tape);
}
