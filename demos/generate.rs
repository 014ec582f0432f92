//! A small illustration of wiring a `VariableSet` + `GenerationBootstrap`
//! together behind a CLI, kept out of the published library surface.
//!
//! Not part of the crate's public API — this binary only exists to exercise
//! the engine end to end from the command line.

use std::io::{self, Write};

use clap::Parser;
use moriarty::constraints::{Alphabet, Between, Length};
use moriarty::generation::config::GenerationConfig;
use moriarty::generation::GenerationBootstrap;
use moriarty::random::RandomEngine;
use moriarty::values::ValueSet;
use moriarty::variable_set::VariableSet;
use moriarty::variables::{Integer, StringVar};

/// Generate one test case: an integer `n` and a lowercase string `s` of
/// length `n`, then print both to stdout separated by a newline.
#[derive(Parser)]
struct Args {
    /// Seed word for the deterministic random engine.
    #[arg(long, default_value_t = 1)]
    seed: i64,

    /// Upper bound for the generated length `n`.
    #[arg(long, default_value_t = 20)]
    max_len: i64,
}

fn main() -> anyhow::Result<()> {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Args::parse();

    let mut variables = VariableSet::new();
    variables.add("n", Box::new(Integer::new().with(Between::literal(1, args.max_len))))?;
    variables.add(
        "s",
        Box::new(
            StringVar::new()
                .with(Length::expr("n"))
                .with(Alphabet::lower_case()),
        ),
    )?;

    let mut values = ValueSet::new();
    let mut random = RandomEngine::new(&[args.seed]);
    let mut config = GenerationConfig::new();
    GenerationBootstrap::generate_all_values(&variables, &mut values, &mut random, &mut config, None)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", values.get_int("n")?.expect("n was generated"))?;
    writeln!(out, "{}", values.get("s").expect("s was generated").as_str()?)?;
    log::info!("generated {} variables", values.len());
    Ok(())
}
