//! CLI entry point: `packetdsp <config-file> <wav-file>`.
//!
//! Loads a line-delimited JSON chain configuration and a WAV file, runs
//! every configured decode chain over the audio in parallel, correlates
//! the results, and prints a report.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use packetdsp::config::ConfigLine;
use packetdsp::report::RunReport;

/// Exit codes, matching the original decoder's convention. Wrong argument
/// count (2) is handled by `clap` itself, which also exits 2 on a usage
/// error.
mod exit_code {
    pub const BAD_CONFIG: i32 = 3;
    pub const BAD_AUDIO: i32 = 4;
}

#[derive(Parser, Debug)]
#[command(name = "packetdsp", about = "Offline packet-radio decoder")]
struct Args {
    /// Line-delimited JSON decode-chain configuration file.
    config_file: PathBuf,

    /// WAV file to decode.
    wav_file: PathBuf,

    /// Verbosity (-v, -vv, ...).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Per-chain error isolation (see [`packetdsp::chain::run_all`]) relies on
/// `catch_unwind` to contain a panicking chain. Confirm once at startup
/// that this process is actually built with the unwind panic strategy
/// (not `panic = "abort"`, which would make that isolation silently
/// useless and crash the whole run instead).
fn check_panic_unwind_strategy() {
    let caught = std::panic::catch_unwind(|| panic!("packetdsp startup sanity check")).is_err();
    if !caught {
        eprintln!("packetdsp: built with panic=abort; per-chain error isolation would not work");
        std::process::exit(1);
    }
}

fn main() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    check_panic_unwind_strategy();
    std::panic::set_hook(default_hook);

    let args = Args::parse();

    stderrlog::new()
        .module(module_path!())
        .verbosity(1 + args.verbose as usize)
        .init()
        .expect("logger should only be initialized once");

    let start = Instant::now();

    let config_lines = match packetdsp::config::load(&args.config_file) {
        Ok(lines) => lines,
        Err(e) => {
            log::error!("unreadable config file {}: {e}", args.config_file.display());
            std::process::exit(exit_code::BAD_CONFIG);
        }
    };

    let chains: Vec<_> = config_lines
        .iter()
        .filter_map(|line| match line {
            ConfigLine::DemodChain(c) => Some(c.clone()),
            ConfigLine::Report(_) => None,
        })
        .collect();
    let report_config = config_lines
        .iter()
        .find_map(|line| match line {
            ConfigLine::Report(r) => Some(r.clone()),
            ConfigLine::DemodChain(_) => None,
        })
        .unwrap_or_default();

    if chains.is_empty() {
        log::warn!("no demod_chain entries found in {}", args.config_file.display());
    }

    let wave = match packetdsp::wav::load(&args.wav_file) {
        Ok(w) => w,
        Err(e) => {
            log::error!("unreadable audio file {}: {e}", args.wav_file.display());
            std::process::exit(exit_code::BAD_AUDIO);
        }
    };

    let (packets, raw_batches) = packetdsp::chain::run_all(&chains, wave.sample_rate as packetdsp::Float, &wave.samples);

    let report = RunReport::new(&packets, &raw_batches, report_config);
    print!("{}", report.render());
    log::info!("elapsed: {:.3}s", start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Args;

    #[test]
    fn cli_definition_is_well_formed() {
        Args::command().debug_assert();
    }
}
