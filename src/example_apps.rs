use std::error::Error;
use std::path::PathBuf;

use clap::{ArgAction, Parser, error::ErrorKind};
use tracing::debug;

use crate::artifact::write_protocol;
use crate::config::NBackBuilder;
use crate::constants::config::DEFAULT_HORIZON;
use crate::constants::protocol::{DEFAULT_MATCH_TRIALS, DEFAULT_TRIALS};
use crate::errors::NBackError;
use crate::protocol::{ProtocolConfig, generate_protocol};
use crate::rng::DeterministicRng;
use crate::types::LureOffset;

#[derive(Debug, Parser)]
#[command(
    name = "nbackgen",
    disable_help_subcommand = true,
    about = "Generates n-back task stimulus lists.",
    long_about = "Generate one n-back block and print it as two lines: the symbols, then one condition code per symbol ('m' match, 'l' lure, '-' mismatch or warm-up).",
    after_help = "A build that cannot place every requested lure fails; rerun with another --seed or change the parameters."
)]
struct NBackGenCli {
    #[arg(
        short = 'n',
        value_parser = parse_positive_usize,
        help = "n, i.e. how many items one has to look back in the task"
    )]
    n: usize,
    #[arg(
        short = 't',
        long,
        default_value_t = DEFAULT_TRIALS,
        help = "Number of trials to generate"
    )]
    trials: usize,
    #[arg(
        long = "match-trials",
        default_value_t = DEFAULT_MATCH_TRIALS,
        value_parser = parse_unit_rate,
        help = "Relative amount of match trials"
    )]
    match_trials: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON,
        help = "Number of the last few symbols considered a match or lure if they reoccur"
    )]
    horizon: usize,
    #[arg(
        long = "lure",
        num_args = 2,
        value_names = ["OFFSET", "RATE"],
        allow_negative_numbers = true,
        action = ArgAction::Append,
        help = "Request RATE of all mismatch trials as lures at the n + OFFSET position, repeat as needed"
    )]
    lure: Vec<f64>,
    #[arg(long, help = "Symbols allowed in the task")]
    alphabet: Option<String>,
    #[arg(long, help = "Random number generator seed (drawn from entropy when omitted)")]
    seed: Option<u64>,
    #[arg(
        long = "seed-marker",
        help = "Write 's' instead of '-' for the warm-up positions"
    )]
    seed_marker: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "nback_protocol",
    disable_help_subcommand = true,
    about = "Generate n-back blocks for several n",
    long_about = "Generate a fixed number of n-back blocks per n, moving to the next seed whenever a block cannot place its lures, and write them as two-line files.",
    after_help = "Output layout: <OUT>/<n>back/<i>.txt plus <OUT>/<n>back/seeds.json."
)]
struct ProtocolCli {
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON protocol config; defaults apply to missing fields"
    )]
    config: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Output directory")]
    out: PathBuf,
    #[arg(
        long = "seed-marker",
        help = "Write 's' instead of '-' for the warm-up positions"
    )]
    seed_marker: bool,
}

/// Generate one block and print it to stdout.
pub fn run_nbackgen<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) =
        parse_cli::<NBackGenCli, _>(std::iter::once("nbackgen".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let artifact = generate_artifact(&cli)?;
    print!("{artifact}");
    Ok(())
}

/// Generate a protocol's blocks and write them below `--out`.
pub fn run_protocol<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) = parse_cli::<ProtocolCli, _>(
        std::iter::once("nback_protocol".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let config = match &cli.config {
        Some(path) => ProtocolConfig::from_path(path)?,
        None => ProtocolConfig::default(),
    };
    let runs = generate_protocol(&config)?;
    let written = write_protocol(&cli.out, &runs, cli.seed_marker)?;

    for run in &runs {
        let seeds = run.seeds();
        println!(
            "{}back: {} blocks (seeds {})",
            run.n,
            run.blocks.len(),
            format_seeds(&seeds)
        );
    }
    println!("{} files written to {}", written.len(), cli.out.display());
    Ok(())
}

fn generate_artifact(cli: &NBackGenCli) -> Result<String, NBackError> {
    let mut builder = NBackBuilder::new()
        .n(cli.n)
        .trials(cli.trials)
        .match_trials(cli.match_trials)
        .horizon(cli.horizon);
    if let Some(alphabet) = &cli.alphabet {
        builder = builder.alphabet(alphabet.as_str());
    }
    for (offset, rate) in parse_lure_pairs(&cli.lure)? {
        builder = builder.lure_rate(offset, rate);
    }

    let seed = cli.seed.unwrap_or_else(rand::random);
    debug!(seed, "generating n-back block");
    let sequence = builder.build_sequence(&mut DeterministicRng::new(seed))?;
    Ok(sequence.to_artifact_string(cli.seed_marker))
}

/// 2^63: `f64` offsets strictly below this in magnitude convert to `LureOffset` without saturating.
const MAX_LURE_OFFSET: f64 = 9_223_372_036_854_775_808.0;

fn parse_lure_pairs(raw: &[f64]) -> Result<Vec<(LureOffset, f64)>, NBackError> {
    raw.chunks(2)
        .map(|pair| match *pair {
            [offset, rate] if offset.fract() == 0.0 && offset.abs() < MAX_LURE_OFFSET => {
                Ok((offset as LureOffset, rate))
            }
            [offset, _] => Err(NBackError::Configuration(format!(
                "--lure offset {offset} must be an integer within {}",
                LureOffset::MAX
            ))),
            _ => Err(NBackError::Configuration(
                "--lure expects an offset and a rate".to_string(),
            )),
        })
        .collect()
}

fn format_seeds(seeds: &[u64]) -> String {
    if seeds.is_empty() {
        return "none".to_string();
    }
    seeds
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("-n must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_unit_rate(raw: &str) -> Result<f64, String> {
    let parsed = raw
        .parse::<f64>()
        .map_err(|_| format!("invalid proportion '{raw}': must be a float"))?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(format!("proportion {parsed} must be within [0, 1]"));
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> NBackGenCli {
        NBackGenCli::try_parse_from(std::iter::once("nbackgen").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_follow_builder_defaults() {
        let cli = parse(&["-n", "2"]);
        assert_eq!(cli.trials, DEFAULT_TRIALS);
        assert_eq!(cli.horizon, DEFAULT_HORIZON);
        assert!(cli.lure.is_empty());
        assert!(cli.seed.is_none());
    }

    #[test]
    fn repeated_lure_flags_accumulate_pairs() {
        let cli = parse(&["-n", "2", "--lure", "1", "0.1", "--lure", "-1", "0.05"]);
        assert_eq!(
            parse_lure_pairs(&cli.lure).unwrap(),
            vec![(1, 0.1), (-1, 0.05)]
        );
    }

    #[test]
    fn fractional_lure_offset_is_rejected() {
        assert!(parse_lure_pairs(&[1.5, 0.1]).is_err());
    }

    #[test]
    fn n_must_be_positive() {
        assert!(NBackGenCli::try_parse_from(["nbackgen", "-n", "0"]).is_err());
        assert!(NBackGenCli::try_parse_from(["nbackgen"]).is_err());
    }

    #[test]
    fn seeded_artifact_is_reproducible() {
        let cli = parse(&["-n", "2", "--trials", "20", "--seed", "42"]);
        let first = generate_artifact(&cli).unwrap();
        let second = generate_artifact(&cli).unwrap();
        assert_eq!(first, second);
        let lines: Vec<&str> = first.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].chars().count(), 22);
        assert_eq!(lines[1].chars().count(), 22);
    }

    #[test]
    fn seed_listing_names_every_seed() {
        assert_eq!(format_seeds(&[1, 2, 4]), "1, 2, 4");
        assert_eq!(format_seeds(&[7]), "7");
        assert_eq!(format_seeds(&[]), "none");
    }

    #[test]
    fn out_of_range_lure_offset_is_rejected() {
        let cli = parse(&["-n", "2", "--lure", "-1e300", "0.1", "--seed", "1"]);
        assert!(matches!(
            parse_lure_pairs(&cli.lure),
            Err(NBackError::Configuration(_))
        ));
        assert!(parse_lure_pairs(&[f64::INFINITY, 0.1]).is_err());
        assert!(parse_lure_pairs(&[f64::NAN, 0.1]).is_err());
        assert!(generate_artifact(&cli).is_err());
    }
}
