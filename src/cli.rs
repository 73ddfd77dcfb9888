use std::path::Path;

use chrono::Local;
use log::{debug, info};

use crate::config::{config_path, load_config, RosterConfig};
use crate::data::candidate::CandidatePool;
use crate::data::export::{write_roster_csv, write_sampling_csv};
use crate::data::loader::{load_candidates, DEFAULT_CANDIDATES_PATH};
use crate::data::validate::{validate_pool, ValidationSeverity};
use crate::optimizer::reconcile::Roster;
use crate::optimizer::{
    optimize_roster_with_progress, OptimizationReport, OptimizerStrategy, RosterScenario,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Optimize,
    Sample,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("optimize") => Some(Command::Optimize),
        Some("sample") => Some(Command::Sample),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("usage: gridpick <optimize|sample|validate> [csv] [--table] [--dry-run]");
        return 2;
    };

    let path = config_path();
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {err}", path.display());
            return 1;
        }
    };
    let flags = Flags::from_args(args);

    match command {
        Command::Optimize => handle_optimize(&flags, &config),
        Command::Sample => handle_sample(&flags, config),
        Command::Validate => handle_validate(&flags, &config),
    }
}

/// Positional arguments after the command, plus the `--` switches.
#[derive(Debug, Default)]
struct Flags<'a> {
    positional: Vec<&'a String>,
    table: bool,
    dry_run: bool,
}

impl<'a> Flags<'a> {
    fn from_args(args: &'a [String]) -> Self {
        let mut flags = Self::default();
        for arg in args.iter().skip(2) {
            match arg.as_str() {
                "--table" => flags.table = true,
                "--dry-run" => flags.dry_run = true,
                _ => flags.positional.push(arg),
            }
        }
        flags
    }

    fn csv_path(&self) -> &str {
        self.positional
            .first()
            .map(|value| value.as_str())
            .unwrap_or(DEFAULT_CANDIDATES_PATH)
    }

    fn arg(&self, position: usize) -> Option<&String> {
        self.positional.get(position).copied()
    }
}

fn load_pool(path: &str) -> Option<CandidatePool> {
    match load_candidates(path) {
        Ok(pool) => {
            info!("loaded {} candidate(s) from {path}", pool.len());
            Some(pool)
        }
        Err(err) => {
            eprintln!("{path}: {err}");
            None
        }
    }
}

fn handle_optimize(flags: &Flags<'_>, config: &RosterConfig) -> i32 {
    let Some(pool) = load_pool(flags.csv_path()) else {
        return 1;
    };
    let scenario = RosterScenario {
        pool: &pool,
        config,
        strategy: OptimizerStrategy::Exact,
        seed: 0,
    };
    let report = match optimize_roster_with_progress(&scenario, |_, _| {}) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("optimization failed: {err}");
            return 1;
        }
    };

    if !flags.dry_run {
        let stamp = Local::now().naive_local();
        match write_roster_csv(&config.output_dir, &report.roster, stamp) {
            Ok(path) => info!("roster written to {}", path.display()),
            Err(err) => {
                eprintln!("{err}");
                return 1;
            }
        }
    }
    print_report(&report, flags.table)
}

fn handle_sample(flags: &Flags<'_>, mut config: RosterConfig) -> i32 {
    let Some(pool) = load_pool(flags.csv_path()) else {
        return 1;
    };
    if let Some(raw) = flags.arg(1) {
        config.trial_count = parse_usize_arg(Some(raw), "trials", config.trial_count).max(1);
    }
    let seed = match flags.arg(2) {
        Some(raw) => parse_u64_arg(Some(raw), "seed", config.resolve_seed()),
        None => config.resolve_seed(),
    };
    info!("sampling {} trial(s) with seed {seed}", config.trial_count);

    let scenario = RosterScenario {
        pool: &pool,
        config: &config,
        strategy: OptimizerStrategy::Sampling,
        seed,
    };
    let report = match optimize_roster_with_progress(&scenario, |done, total| {
        debug!("sampling progress: {done}/{total}");
    }) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("sampling failed: {err}");
            return 1;
        }
    };

    if !flags.dry_run {
        if let Some(solution) = &report.sampling {
            let partition = pool.partition(config.targets(), config.budget);
            match write_sampling_csv(
                &config.output_dir,
                &solution.retained,
                partition.free.members(),
                &pool,
                Local::now().naive_local(),
            ) {
                Ok(path) => info!(
                    "{} retained trial(s) written to {}",
                    solution.retained.len(),
                    path.display()
                ),
                Err(err) => {
                    eprintln!("{err}");
                    return 1;
                }
            }
        }
    }
    print_report(&report, flags.table)
}

fn handle_validate(flags: &Flags<'_>, config: &RosterConfig) -> i32 {
    let path = flags.csv_path();
    let Some(pool) = load_pool(path) else {
        return 1;
    };
    let report = validate_pool(&pool, config);
    for diagnostic in &report.diagnostics {
        eprintln!("- {diagnostic}");
    }
    if report.has_errors() {
        eprintln!(
            "validation failed: {} error(s), {} warning(s)",
            report.count(ValidationSeverity::Error),
            report.count(ValidationSeverity::Warning)
        );
        1
    } else {
        println!(
            "validation passed: {} ({} warning(s))",
            Path::new(path).display(),
            report.count(ValidationSeverity::Warning)
        );
        0
    }
}

fn print_report(report: &OptimizationReport, as_table: bool) -> i32 {
    if as_table {
        print_table(&report.roster);
        return 0;
    }
    match serde_json::to_string_pretty(report) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize optimization result: {err}");
            1
        }
    }
}

fn print_table(roster: &Roster) {
    println!("type\tname\tsalary\tscore\tstarred");
    for entry in &roster.entries {
        println!(
            "{}\t{}\t{:.2}\t{:.3}\t{}",
            entry.category,
            entry.name,
            entry.cost,
            entry.score,
            if entry.starred { "*" } else { "" }
        );
    }
    println!(
        "total\t\t{:.2}\t{:.3}\t",
        roster.total_cost(),
        roster.total_score()
    );
}

fn parse_usize_arg(raw: Option<&String>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

fn parse_u64_arg(raw: Option<&String>, name: &str, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}
