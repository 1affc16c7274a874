use std::io::BufRead;

use anyhow::{Context, Result};

use eftguessr::location::sanitize_for_storage;
use eftguessr::parser::{ParseMode, parse_coordinates_with};

/// Parse screenshot filenames given as arguments (or one per stdin line) and
/// report which naming convention matched.
///
/// `--best-effort` accepts loose numbers with a zero coordinate.
/// `--sanitize` also prints the storage-safe name for each input.
fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mode = if take_flag(&mut args, "--best-effort") {
        ParseMode::BestEffort
    } else {
        ParseMode::Strict
    };
    let sanitize = take_flag(&mut args, "--sanitize");
    let suffix = chrono::Utc::now().timestamp_millis();

    let input: Vec<String> = if args.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .context("failed to read filenames from stdin")?
    } else {
        args
    };
    let names: Vec<&str> = input
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();

    let mut failures = 0usize;
    for name in &names {
        match parse_coordinates_with(name, mode) {
            Ok(parsed) => {
                let c = parsed.coordinates;
                println!(
                    "{:<14} x={:<10} y={:<10} z={:<10} {name}",
                    format!("{:?}", parsed.format),
                    c.x,
                    c.y,
                    c.z
                );
            }
            Err(e) => {
                failures += 1;
                println!("{:<14} {e}", "unparsed");
            }
        }
        if sanitize {
            println!("{:<14} {}", "", sanitize_for_storage(name, suffix));
        }
    }

    eprintln!("{} parsed, {failures} failed", names.len() - failures);
    Ok(())
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    }
}
