use std::fmt::Write as _;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use poller_core::models::JobState;
use poller_core::registry;
use poller_core::scheduling::{PollScheduler, SchedulerLifecycle, SchedulerSnapshot};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Stop,
    Status,
    Help,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.to_ascii_lowercase().as_str() {
            "stop" => Self::Stop,
            "status" => Self::Status,
            "help" => Self::Help,
            _ => Self::Unknown(trimmed.to_string()),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConsoleExit {
    Stopped,
    Interrupted,
}

impl ConsoleExit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stop command",
            Self::Interrupted => "interrupt signal",
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Stopped => ExitCode::SUCCESS,
            Self::Interrupted => ExitCode::from(130),
        }
    }
}

/// Serves operator commands and signals until a stop is requested, then
/// shuts the scheduler down.
pub async fn run(scheduler: Arc<PollScheduler>, shutdown_timeout: Duration) -> ConsoleExit {
    let mut commands = spawn_command_reader();
    let mut listening = commands.is_some();
    let mut signals = true;

    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    health.set_missed_tick_behavior(MissedTickBehavior::Delay);
    health.tick().await;

    println!("API poller running. Type 'help' for available commands.");

    let exit = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c(), if signals => match signal {
                Ok(()) => {
                    println!();
                    tracing::info!("interrupt received, shutting down");
                    break ConsoleExit::Interrupted;
                }
                Err(error) => {
                    tracing::error!(error = %error, "unable to listen for interrupt signal");
                    signals = false;
                }
            },
            command = recv(&mut commands), if listening => match command {
                Some(Command::Stop) => {
                    println!("Shutdown initiated...");
                    break ConsoleExit::Stopped;
                }
                Some(Command::Status) => print!("{}", render_status(&scheduler.snapshot())),
                Some(Command::Help) => print!("{}", render_help()),
                Some(Command::Unknown(input)) => {
                    println!("Unknown command: {input}");
                    println!("Type 'help' for available commands");
                }
                None => {
                    listening = false;
                    tracing::info!("console input closed, use Ctrl+C to stop");
                }
            },
            _ = health.tick() => health_check(&scheduler),
        }
    };

    scheduler.shutdown().await;
    if scheduler.await_termination(shutdown_timeout).await {
        println!("Shutdown complete.");
    } else {
        tracing::warn!(
            timeout_secs = shutdown_timeout.as_secs_f64(),
            "scheduler did not terminate in time"
        );
    }
    exit
}

async fn recv(commands: &mut Option<mpsc::Receiver<Command>>) -> Option<Command> {
    match commands {
        Some(receiver) => receiver.recv().await,
        None => None,
    }
}

/// Reads stdin on a plain thread so a pending read never holds up runtime
/// shutdown.
fn spawn_command_reader() -> Option<mpsc::Receiver<Command>> {
    let (sender, receiver) = mpsc::channel(8);
    let spawned = std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        tracing::warn!(error = %error, "failed to read console input");
                        return;
                    }
                };
                if let Some(command) = Command::parse(&line)
                    && sender.blocking_send(command).is_err()
                {
                    return;
                }
            }
        });

    match spawned {
        Ok(_) => Some(receiver),
        Err(error) => {
            tracing::warn!(error = %error, "console input unavailable");
            None
        }
    }
}

fn health_check(scheduler: &PollScheduler) {
    let snapshot = scheduler.snapshot();
    tracing::debug!(
        lifecycle = snapshot.lifecycle.as_str(),
        occupied = snapshot.occupied,
        ready = snapshot.ready.len(),
        jobs = snapshot.jobs.len(),
        "health check"
    );

    if snapshot.lifecycle == SchedulerLifecycle::Running
        && !snapshot.jobs.is_empty()
        && snapshot
            .jobs
            .iter()
            .all(|job| job.state == JobState::Stopped)
    {
        tracing::warn!("scheduler reports running but every job has stopped");
    }
}

fn render_help() -> String {
    let mut out = [
        "=== API Poller Commands ===",
        "stop   - Gracefully shutdown the application",
        "status - Show current application status",
        "help   - Show this help information",
        "",
        "Sources:",
    ]
    .join("\n");
    out.push('\n');
    for descriptor in registry::sources() {
        let _ = writeln!(
            out,
            "  {:<8} {} ({})",
            descriptor.id.as_str(),
            descriptor.display_name,
            descriptor.description
        );
    }
    out
}

fn render_status(snapshot: &SchedulerSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== API Poller Status ===");
    let _ = writeln!(out, "Scheduler: {}", snapshot.lifecycle.as_str());
    if let Some(uptime) = snapshot.uptime {
        let _ = writeln!(out, "Uptime: {}", format_uptime(uptime));
    }
    let _ = writeln!(
        out,
        "Slots: {}/{} occupied (peak {})",
        snapshot.occupied, snapshot.max_concurrency, snapshot.peak_occupancy
    );
    let ready = if snapshot.ready.is_empty() {
        "-".to_string()
    } else {
        snapshot.ready.join(", ")
    };
    let _ = writeln!(out, "Ready queue: {ready}");
    for job in &snapshot.jobs {
        let _ = writeln!(
            out,
            "  {:<8} {:<8} every {}s  runs={} failures={} records={}",
            job.source,
            job.state.as_str(),
            job.interval.as_secs(),
            job.activations,
            job.failures,
            job.records_forwarded
        );
    }
    out
}

fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
