mod cli;
use cli::*;

fn main() -> Result<(), Box<dyn Error>> {

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let Cli {
        amps, mask, fibres, response,
        isotropic, noconstraint, directions, shells, lmax,
        deterministic, normalisation, constraint_samples, max_iterations,
        n_threads, progress,
    } = Cli::parse();

    let mut timer = Progress::new();

    timer.start("Reading images");
    let images = Images::new(read_f32_4d(&amps)?, read_mask(&mask)?, read_f32_4d(&fibres)?)?;
    timer.done();
    let [nx, ny, nz] = images.dims();
    info!("{nx} x {ny} x {nz} voxels, {} volumes, {} in mask",
          images.n_volumes(), group_digits(images.count_masked()));

    let shells = resolve_shells(directions.as_deref(), &amps, shells.as_deref())?;

    let options = Options {
        isotropic,
        lmax,
        constrained: !noconstraint,
        completion: if deterministic { FrameCompletion::Deterministic } else { FrameCompletion::Random },
        normalisation,
        icls: IclsSettings { constraint_samples, max_iterations, ..IclsSettings::default() },
        progress,
    };

    let pool = rayon::ThreadPoolBuilder::new().num_threads(n_threads.unwrap_or(0)).build()?;
    timer.start("Estimating response functions");
    let responses = pool.install(|| estimate(&images, &shells, &options))?;
    timer.done();

    save_matrix(&responses.matrix, &response)?;
    info!("Wrote {} response function(s) to {}", responses.shells.len(), response.display());
    Ok(())
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::error::Error;

use amp2response::{
    estimate, IclsSettings, Images, Options, FrameCompletion,
    io::{hdf5::{read_f32_4d, read_mask}, resolve_shells, text::save_matrix},
    utils::{group_digits, timing::Progress},
};

use clap::Parser;
use env_logger::Env;
use log::info;
