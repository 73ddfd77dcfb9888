//! Run the sampling solver once sequentially and once on the worker pool, then print
//! timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup [trials]

use std::env;
use std::time::Instant;

use gridpick::data::candidate::{Candidate, CandidatePool, Category, CategoryCounts};
use gridpick::optimizer::constraints::ConstraintModel;
use gridpick::optimizer::sampling::{SamplingConfig, SamplingSolver};
use gridpick::optimizer::star::StarEligibility;

fn synthetic_pool() -> CandidatePool {
    let drivers = (0..20).map(|i| {
        Candidate::new(
            i,
            format!("Driver_{i}"),
            Category::Driver,
            4.0 + ((i * 7) % 20) as f64,
            40.0 + ((i * 13) % 60) as f64,
        )
    });
    let teams = (0..10).map(|i| {
        Candidate::new(
            20 + i,
            format!("Team_{i}"),
            Category::Team,
            10.0 + ((i * 3) % 20) as f64,
            60.0 + ((i * 11) % 40) as f64,
        )
    });
    CandidatePool::new(drivers.chain(teams).collect())
}

fn main() {
    let trials = env::args()
        .nth(1)
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(200_000);
    let pool = synthetic_pool();
    let partition = pool.partition(CategoryCounts::new(5, 1), 100.0);
    let model = match ConstraintModel::from_partition(&partition) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("synthetic pool is infeasible: {err}");
            std::process::exit(1);
        }
    };
    let solver = SamplingSolver::new(
        SamplingConfig {
            trial_count: trials,
            inclusion_threshold: 0.0,
            max_retries: 100,
            seed: 12345,
        },
        StarEligibility::new(15.0),
    );

    println!("Sampling: {} candidates x {} trials", pool.len(), trials);
    println!();

    let t0 = Instant::now();
    let sequential = solver.solve_sequential(&partition, &model);
    let elapsed_seq = t0.elapsed();
    let seq_ms = elapsed_seq.as_secs_f64() * 1000.0;
    println!(
        "Sequential:  {:.2} ms  ({:.1} trials/s)",
        seq_ms,
        trials as f64 / elapsed_seq.as_secs_f64()
    );

    let t0 = Instant::now();
    let parallel = solver.solve(&partition, &model);
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!(
        "Parallel:    {:.2} ms  ({:.1} trials/s)",
        par_ms,
        trials as f64 / elapsed_par.as_secs_f64()
    );

    println!();
    println!("Speedup:     {:.2}x (parallel vs sequential)", seq_ms / par_ms);

    match (sequential, parallel) {
        (Ok(seq), Ok(par)) => {
            assert_eq!(seq.retained, par.retained, "sequential and parallel runs diverged");
            println!(
                "(Results match: {} retained, best {:.1} points)",
                par.retained.len(),
                par.best().map(|trial| trial.points).unwrap_or_default()
            );
        }
        (seq, par) => {
            eprintln!("sampling failed: sequential={seq:?} parallel={par:?}");
            std::process::exit(1);
        }
    }
}
