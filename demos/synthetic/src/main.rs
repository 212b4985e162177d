use argh::FromArgs;
use nalgebra::DMatrix;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use granni::k3d::{
    linalg::{relative_error, transform_points},
    synthetic::{condition_number, random_linear_map},
};
use granni::matching::{match_point_sets, MatchParams};

#[derive(FromArgs)]
/// Recover a random linear map between a bumpy sphere and its shuffled image
struct Args {
    /// number of points of the target cloud
    #[argh(option, short = 'n', default = "600")]
    num_points: usize,

    /// number of points kept in the source cloud, defaults to all of them
    #[argh(option)]
    num_src: Option<usize>,

    /// condition number of the generated map
    #[argh(option, default = "5.0")]
    cond: f64,

    /// number of randomized trials
    #[argh(option, short = 't', default = "1024")]
    trials: usize,

    /// base seed of the trials and of the generated instance
    #[argh(option, default = "0")]
    seed: u64,

    /// number of worker threads, defaults to the available parallelism
    #[argh(option)]
    threads: Option<usize>,

    /// recycle the workers after this many trials each
    #[argh(option)]
    max_trials_per_worker: Option<usize>,

    /// convergence tolerance of the quadratic assignment solver
    #[argh(option, default = "1e-3")]
    tolerance: f64,
}

// Points on the surface `r = 1 + 0.3·sin(3θ)·cos(2φ)`, which has no symmetries.
fn bumpy_sphere(num_points: usize, rng: &mut StdRng) -> DMatrix<f64> {
    let mut points = DMatrix::zeros(3, num_points);
    for mut col in points.column_iter_mut() {
        let theta = rng.random_range(0.0..std::f64::consts::PI);
        let phi = rng.random_range(0.0..2.0 * std::f64::consts::PI);
        let r = 1.0 + 0.3 * (3.0 * theta).sin() * (2.0 * phi).cos();
        col[0] = r * theta.sin() * phi.cos();
        col[1] = r * theta.sin() * phi.sin();
        col[2] = r * theta.cos();
    }
    points
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let num_src = args.num_src.unwrap_or(args.num_points);
    let mut rng = StdRng::seed_from_u64(args.seed);

    let target_points = bumpy_sphere(args.num_points, &mut rng);
    let linear_map = random_linear_map(3, args.cond, &mut rng)?;
    log::info!("generated map with condition number {:.3}", condition_number(&linear_map));

    // the target is the image of the source under the map, in a random order
    let mut order = (0..args.num_points).collect::<Vec<_>>();
    order.shuffle(&mut rng);
    let points_dst = transform_points(&target_points, &linear_map)?.select_columns(&order);
    let points_src = target_points.columns(0, num_src.min(args.num_points)).into_owned();

    println!(
        "Source: #{} points, target: #{} points",
        points_src.ncols(),
        points_dst.ncols()
    );

    let params = MatchParams {
        num_trials: args.trials,
        tolerance: args.tolerance,
        seed: args.seed,
        num_threads: args.threads,
        max_trials_per_worker: args.max_trials_per_worker,
        ..Default::default()
    };

    let now = std::time::Instant::now();
    let result = match_point_sets(&points_src, &points_dst, &params)?;
    println!("Matching took {:?}", now.elapsed());

    let num_correct = result
        .correspondence
        .iter()
        .enumerate()
        .filter(|&(i, &j)| order[j] == i)
        .count();

    println!("Trials: {:?}", result.trials);
    println!(
        "Consensus: {:.3}{}",
        result.consensus,
        if result.degenerate { " (degenerate)" } else { "" }
    );
    println!("Correct matches: {num_correct}/{}", result.correspondence.len());
    println!("Recovered map:{}", result.linear_map);
    println!(
        "Relative error: {:.6}",
        relative_error(&linear_map, &result.linear_map)
    );

    Ok(())
}
