use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use auto_clicker::plan::{clicks_per_second, parse_interval, INTERVAL_PRESETS};
use auto_clicker::{
    ButtonMode, EnigoDriver, GlobalCancelSource, NativeDesktop, PointerDriver, RunState, SessionConfig,
    SessionController, SessionEvent, Target, TargetMode,
};
use clap::Parser;
use crossbeam_channel::{bounded, select, Receiver};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "auto-clicker", version, about = "Click repeatedly at a fixed rate. Enter stops; so does ESC with the `hooks` feature.")]
struct Cli {
    /// Delay between clicks: `100`, `100ms`, `1s`, `1.5 s`
    #[arg(short, long, default_value = "100ms", value_parser = parse_interval_arg)]
    interval: Duration,

    #[arg(short, long, value_enum, default_value_t = ButtonMode::Left)]
    mode: ButtonMode,

    /// Physical clicks to send
    #[arg(short = 'n', long, default_value_t = 100)]
    count: u64,

    /// Ignore --count and run until stopped
    #[arg(short, long)]
    continuous: bool,

    /// Skip the 3-second safety countdown
    #[arg(long)]
    no_countdown: bool,

    #[arg(short, long, value_enum, default_value_t = TargetMode::Follow)]
    target: TargetMode,

    /// X for `--target fixed`
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    x: i32,

    /// Y for `--target fixed`
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    y: i32,

    /// Print the current mouse position and exit
    #[arg(long)]
    pick: bool,

    /// List interval presets and exit
    #[arg(long)]
    presets: bool,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            interval_ms: self.interval.as_millis() as u64,
            button: self.mode,
            count: self.count,
            continuous: self.continuous,
            countdown: !self.no_countdown,
            target: self.target,
            fixed_x: self.x,
            fixed_y: self.y,
        }
    }
}

fn parse_interval_arg(s: &str) -> Result<Duration, String> {
    parse_interval(s).map_err(|e| e.to_string())
}

/// Signals once per line read from `input`. The channel closes at EOF, so a
/// detached stdin never stops a run.
fn stop_requests<R: BufRead + Send + 'static>(input: R) -> io::Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    thread::Builder::new().name("stop-reader".into()).spawn(move || {
        for line in input.lines() {
            if line.is_err() || tx.send(()).is_err() {
                break;
            }
        }
    })?;
    Ok(rx)
}

#[cfg(feature = "hooks")]
fn panic_key() -> Arc<dyn GlobalCancelSource> {
    Arc::new(auto_clicker::RdevPanicKey)
}

#[cfg(not(feature = "hooks"))]
fn panic_key() -> Arc<dyn GlobalCancelSource> {
    Arc::new(auto_clicker::NoPanicKey)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.presets {
        for (label, ms) in INTERVAL_PRESETS {
            println!("{label:>7}  {:.2} cps", clicks_per_second(Duration::from_millis(*ms)));
        }
        return ExitCode::SUCCESS;
    }

    let driver = match EnigoDriver::new() {
        Ok(d) => Arc::new(d),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.pick {
        return match driver.position() {
            Ok((x, y)) => {
                println!("X: {x}  Y: {y}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Pick failed: could not read mouse position: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let config = cli.session_config();
    let mut controller = SessionController::new(driver, panic_key(), Arc::new(NativeDesktop));
    let events = controller.events();

    match controller.start(&config) {
        Ok(target) => {
            let rate = clicks_per_second(cli.interval);
            match target {
                Target::Follow => println!("Rate: {rate:.2} cps, following the cursor"),
                Target::Fixed { x, y } => println!("Rate: {rate:.2} cps, clicking at ({x}, {y})"),
            }
        }
        Err(e) => {
            eprintln!("Invalid input: {e}");
            return ExitCode::from(2);
        }
    }

    let mut stops = match stop_requests(io::BufReader::new(io::stdin())) {
        Ok(rx) => {
            println!("Press Enter to stop.");
            Some(rx)
        }
        Err(e) => {
            tracing::warn!("stop key reader unavailable: {e}");
            None
        }
    };

    let end = loop {
        let stop_rx = stops.clone().unwrap_or_else(crossbeam_channel::never);
        select! {
            recv(events) -> event => match event {
                Ok(SessionEvent::Progress(n)) => println!("Clicks performed: {n}"),
                Ok(SessionEvent::Status { message, .. }) => println!("Status: {message}"),
                Ok(SessionEvent::Error(message)) => eprintln!("{message}"),
                Ok(SessionEvent::Finished(state)) => break state,
                Err(_) => break controller.last_state().unwrap_or(RunState::Errored),
            },
            recv(stop_rx) -> line => match line {
                Ok(()) => controller.stop(),
                Err(_) => stops = None,
            },
            default(Duration::from_millis(250)) => {
                // The scheduler always ends with `Finished`; only a panic skips it.
                if !controller.is_running() {
                    break controller.last_state().unwrap_or(RunState::Errored);
                }
            }
        }
    };
    controller.shutdown(Duration::from_secs(2));

    match end {
        RunState::Completed | RunState::Stopped => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
