//! Stopwatch demo.
//!
//! Without arguments, runs a few timed functions and lets them print their
//! elapsed times. With `rewrite <file> [companion-dir]`, instruments a Rust
//! source file, prints the result and writes companion files.
//!
//! Engine logs go to stderr; set `LAPTIME_LOG=debug` to see them.

use std::env;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use laptime::time;
use laptime_engine::{instrument_source, CollectedDiagnostics, Engine, FileEmitter, Severity};
use tracing::{error, info};

struct Lap {
    number: u32,
}

#[laptime::instrument]
impl Lap {
    #[time(format = "lap took %s ms")]
    fn run(&self) -> u32 {
        thread::sleep(Duration::from_millis(5 * u64::from(self.number)));
        self.number
    }

    #[time(clock = nanosecond, format = "split computed in %s ns")]
    fn split(&self, total: u32) -> Option<u32> {
        if total == 0 {
            // Still reported: the cleanup runs on early returns too.
            return None;
        }
        Some(self.number * 100 / total)
    }

    #[time(format = "pit stop aborted after %s ms")]
    fn pit_stop(&self) {
        thread::sleep(Duration::from_millis(3));
        panic!("lap {} lost a wheel", self.number);
    }
}

#[time(format = "warmup took %s ms")]
fn warmup() {
    thread::sleep(Duration::from_millis(2));
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [] => race(),
        [command, file] if command == "rewrite" => rewrite(Path::new(file), None),
        [command, file, dir] if command == "rewrite" => {
            rewrite(Path::new(file), Some(PathBuf::from(dir)))
        }
        _ => bail!("usage: stopwatch [rewrite <file> [companion-dir]]"),
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LAPTIME_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn race() -> anyhow::Result<()> {
    warmup();

    let laps: Vec<Lap> = (1..=3).map(|number| Lap { number }).collect();
    let total: u32 = laps.iter().map(Lap::run).sum();
    for lap in &laps {
        lap.split(total);
    }
    laps[0].split(0);

    // The panic is reported by the cleanup before it reaches us.
    panic::set_hook(Box::new(|_| {}));
    let crashed = panic::catch_unwind(|| laps[1].pit_stop()).is_err();
    let _ = panic::take_hook();
    info!(crashed, "race finished");

    // Companion generated by `#[laptime::instrument]` for `Lap`.
    let _ = LapAutogenerate::new();
    Ok(())
}

fn rewrite(file: &Path, companion_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let source =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let dir = match companion_dir {
        Some(dir) => dir,
        None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let mut engine = Engine::default();
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = FileEmitter::new(&dir);
    let (output, summary) =
        instrument_source(&source, Vec::new(), &mut engine, &mut diagnostics, &mut emitter)
            .with_context(|| format!("failed to instrument {}", file.display()))?;

    for diagnostic in diagnostics.iter() {
        match diagnostic.severity {
            Severity::Error => error!("{diagnostic}"),
            _ => info!("{diagnostic}"),
        }
    }
    info!(
        instrumented = summary.instrumented.len(),
        failed = summary.failed.len(),
        companions = summary.artifacts.len(),
        "rewrote {}",
        file.display()
    );

    print!("{output}");
    if diagnostics.has_errors() {
        bail!("{} callable(s) could not be instrumented", summary.failed.len());
    }
    Ok(())
}
