use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use routine_core::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Length of one clock tick
const TICK: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "routine")]
#[command(about = "Interactive exercise routine player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a routine step by step (default)
    Play {
        /// Routine file (defaults to the configured one, then the built-in routine)
        #[arg(long)]
        routine: Option<PathBuf>,

        /// Run the whole routine with synthetic ticks and no waiting
        #[arg(long)]
        simulate: bool,
    },

    /// Show the expanded steps of a routine
    Timeline {
        #[arg(long)]
        routine: Option<PathBuf>,

        /// Print steps as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a routine file for problems
    Validate {
        file: PathBuf,
    },

    /// Show or change player settings
    Settings {
        #[arg(long)]
        sound: Option<Switch>,

        #[arg(long)]
        countdown: Option<Switch>,

        #[arg(long)]
        auto_advance: Option<Switch>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(s: Switch) -> bool {
        matches!(s, Switch::On)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    routine_core::logging::init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_config_path);
    let config = Config::load_or_default(&config_path)?;

    match cli.command {
        Some(Commands::Play { routine, simulate }) => cmd_play(routine, simulate, &config),
        Some(Commands::Timeline { routine, json }) => cmd_timeline(routine, json, &config),
        Some(Commands::Validate { file }) => cmd_validate(&file),
        Some(Commands::Settings {
            sound,
            countdown,
            auto_advance,
        }) => cmd_settings(
            SettingsUpdate {
                sound_enabled: sound.map(bool::from),
                countdown_enabled: countdown.map(bool::from),
                auto_advance_enabled: auto_advance.map(bool::from),
            },
            config,
            &config_path,
        ),
        None => {
            // Default to "play" command
            cmd_play(None, false, &config)
        }
    }
}

/// Routine from the command line, then the config, then the built-in one
fn resolve_routine(arg: Option<PathBuf>, config: &Config) -> Result<Routine> {
    match arg.or_else(|| config.routine.path.clone()) {
        Some(path) => Routine::load_from(&path),
        None => Ok(default_routine()),
    }
}

fn cmd_timeline(routine: Option<PathBuf>, json: bool, config: &Config) -> Result<()> {
    let routine = resolve_routine(routine, config)?;
    let steps = expand_exercises(&routine.exercises);

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    println!("{}", routine.title);
    if !routine.subtitle.is_empty() {
        println!("{}", routine.subtitle);
    }

    for (section, indices) in group_by_section(&steps) {
        println!();
        println!("{}", section);
        for index in indices {
            let step = &steps[index];
            println!("  {:>3}. {:<28} {}", index + 1, step.name, step.timeline_meta());
        }
    }

    println!();
    println!(
        "Total time: {} ({} steps)",
        format_time(total_duration(&steps)),
        steps.len()
    );
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)?;
    let routine = Routine::parse(&contents)?;
    let errors = routine.validate();

    if !errors.is_empty() {
        eprintln!("Routine validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Routine(format!("{} problems", errors.len())));
    }

    let steps = expand_exercises(&routine.exercises);
    println!(
        "✓ {} is valid: {} exercises, {} steps, {}",
        file.display(),
        routine.exercises.len(),
        steps.len(),
        format_time(total_duration(&steps))
    );
    Ok(())
}

fn cmd_settings(update: SettingsUpdate, mut config: Config, config_path: &Path) -> Result<()> {
    if !update.is_empty() {
        config.settings.apply(update);
        config.save_to(config_path)?;
        println!("✓ Settings saved");
    }

    let on_off = |v: bool| if v { "on" } else { "off" };
    println!("  sound:        {}", on_off(config.settings.sound_enabled));
    println!("  countdown:    {}", on_off(config.settings.countdown_enabled));
    println!("  auto-advance: {}", on_off(config.settings.auto_advance_enabled));
    Ok(())
}

fn cmd_play(routine: Option<PathBuf>, simulate: bool, config: &Config) -> Result<()> {
    let routine = resolve_routine(routine, config)?;
    let mut controller = SessionController::from_routine(&routine, config.settings);

    if controller.steps().is_empty() {
        println!("No steps in routine '{}'", routine.title);
        return Ok(());
    }

    let (tx, signals) = channel();
    controller.subscribe(Box::new(ChannelObserver::new(tx)));

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", routine.title);
    println!("╰─────────────────────────────────────────╯");
    if !routine.subtitle.is_empty() {
        println!("  {}", routine.subtitle);
    }

    tracing::info!(
        "Playing '{}' ({} steps, {:?})",
        routine.title,
        controller.steps().len(),
        controller.settings()
    );

    let started_at = Utc::now();
    if simulate {
        run_simulated(&mut controller, &signals)?;
    } else {
        run_interactive(&mut controller, &signals)?;
    }

    if controller.state().is_complete() {
        print_completion(started_at);
    }
    Ok(())
}

/// Walk the whole routine: start each timed step, tick it out, move on
fn run_simulated(controller: &mut SessionController, signals: &Receiver<Signal>) -> Result<()> {
    let mut shown = None;

    while !controller.state().is_complete() {
        if shown != Some(controller.state().step_index()) {
            shown = Some(controller.state().step_index());
            print_step(controller);
        }

        let state = *controller.state();
        let timed = controller.current_step().map_or(false, ExpandedStep::is_timed);

        if !timed {
            controller.next(false);
        } else if state.phase() == Phase::Idle {
            controller.start();
        } else if state.is_running() {
            controller.tick();
        } else if let Some(token) = controller.pending_auto_advance() {
            controller.fire_auto_advance(token);
        } else {
            controller.next(false);
        }

        announce(controller.settings(), signals);
    }

    Ok(())
}

/// Drive the session from stdin commands and a one-second clock
fn run_interactive(controller: &mut SessionController, signals: &Receiver<Signal>) -> Result<()> {
    let (tx, input) = channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    print_help();
    print_step(controller);

    let mut armed: Option<TimerHandle> = None;
    let mut next_tick: Option<Instant> = None;
    let mut auto_advance: Option<(AutoAdvance, Instant)> = None;

    loop {
        // Re-arm the second boundary whenever the live timer changes
        let handle = controller.timer_handle();
        if handle != armed {
            armed = handle;
            next_tick = handle.map(|_| Instant::now() + TICK);
        }

        auto_advance = match (controller.pending_auto_advance(), auto_advance) {
            (Some(token), Some((pending, at))) if pending == token => Some((token, at)),
            (Some(token), _) => Some((token, Instant::now() + token.delay)),
            (None, _) => None,
        };

        let wake = [next_tick, auto_advance.map(|(_, at)| at)]
            .into_iter()
            .flatten()
            .min();

        let received = match wake {
            Some(at) => input.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => input.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(line) => {
                let before = controller.state().step_index();
                if !handle_command(controller, line.trim()) {
                    tracing::debug!("Quit at step {}", controller.state().step_index());
                    break;
                }
                if controller.state().step_index() != before {
                    print_step(controller);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                if let Some(at) = next_tick.filter(|&at| at <= now) {
                    next_tick = Some(at + TICK);
                    controller.tick();
                }
                if let Some((token, _)) = auto_advance.filter(|&(_, at)| at <= now) {
                    auto_advance = None;
                    if controller.fire_auto_advance(token) {
                        print_step(controller);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }

        announce(controller.settings(), signals);
        print_status(controller);

        if controller.state().is_complete() && controller.pending_auto_advance().is_none() {
            println!("  'r' to start again, 'q' to quit");
        }
    }

    Ok(())
}

/// Apply one typed command; false means quit
fn handle_command(controller: &mut SessionController, command: &str) -> bool {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("") {
        "" | "space" | "t" => controller.toggle(),
        "n" => controller.next(false),
        "p" => controller.previous(),
        "r" if controller.state().is_complete() => controller.restart(),
        "r" => controller.reset(),
        "g" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n >= 1 => controller.go_to(n - 1),
            _ => println!("  usage: g <step number>"),
        },
        "q" => return false,
        "h" | "?" => print_help(),
        other => println!("  unknown command '{}', 'h' for help", other),
    }
    true
}

fn print_help() {
    println!("─────────────────────────────────────────");
    println!("  Enter  start / pause");
    println!("  n      next step");
    println!("  p      previous step");
    println!("  r      reset timer");
    println!("  g N    go to step N");
    println!("  q      quit");
    println!("─────────────────────────────────────────");
}

fn print_step(controller: &SessionController) {
    let view = controller.view();
    let Some(step) = view.step else {
        return;
    };

    println!();
    println!(
        "[{}/{}] {}  ({:.0}%)",
        view.step_index + 1,
        view.total_steps,
        step.section,
        view.progress_percent
    );
    println!("  {}", step.name);

    let label = step.set_label();
    if !label.is_empty() {
        println!("  {}", label);
    }
    match &step.kind {
        StepKind::Timed { duration } => println!("  ⏱ {}", format_time(*duration)),
        StepKind::Reps { reps } if step.set_number.is_some() => println!("  → {}", reps),
        StepKind::Reps { .. } => {}
    }
    if let Some(ref instructions) = step.instructions {
        println!("  ℹ {}", instructions);
    }
    if let Some(ref feel) = step.feel {
        println!("  ✦ Feel: {}", feel);
    }
}

fn print_status(controller: &SessionController) {
    let view = controller.view();
    if view.is_complete {
        return;
    }

    let status = match (view.countdown_seconds, view.remaining_seconds) {
        (Some(n), _) => format!("  starting in {}{}", n, if view.is_paused { " (paused)" } else { "" }),
        (None, Some(remaining)) => format!(
            "  {} {}",
            format_time(remaining),
            if view.is_paused { "⏸" } else { "▶" }
        ),
        (None, None) => return,
    };
    println!("{}", status);
    let _ = io::stdout().flush();
}

/// The audio collaborator: one marker line per signal when sound is on
fn announce(settings: &Settings, signals: &Receiver<Signal>) {
    for signal in signals.try_iter() {
        if let Signal::StepCompleted { step_index } = signal {
            println!("  ✓ Step {} done", step_index + 1);
        }
        if !settings.sound_enabled {
            continue;
        }
        match signal {
            Signal::CountdownTick(n) => println!("  ♪ {}", n),
            Signal::CountdownFinished => println!("  ♪ GO"),
            Signal::FinalSeconds(n) => println!("  ♪ {}s left", n),
            Signal::StepCompleted { .. } => println!("  ♪ ding"),
            Signal::RoutineCompleted => println!("  ♪ fanfare"),
        }
    }
}

fn print_completion(started_at: DateTime<Utc>) {
    let elapsed = (Utc::now() - started_at).num_seconds().max(0);
    println!();
    println!("🎉 Routine complete!");
    println!(
        "  Session time: {}",
        format_time(u32::try_from(elapsed).unwrap_or(u32::MAX))
    );
}
