use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use grainsim::{
    core::io::table::{read_particles_from_path, write_results},
    core::models::system::ParticleSystem,
    core::properties::table::MaterialPropertyTable,
    engine::progress::ProgressReporter,
    workflows::probe::{self, ProbeResult},
};
use std::fs::File;
use std::io::BufWriter;
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let partial_config = PartialRunConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    info!("Loading material properties from {:?}", &args.materials);
    let table = MaterialPropertyTable::load(&args.materials)?;

    info!("Loading particles from {:?}", &args.particles);
    let particles = read_particles_from_path(&args.particles)?;
    if particles.is_empty() {
        return Err(CliError::Argument(format!(
            "Particle table '{}' contains no particles",
            args.particles.display()
        )));
    }
    let system = ParticleSystem::new(particles);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Probing {} particle(s) for {} step(s) on {} worker(s)...",
        system.len(),
        config.steps,
        config.workers
    );
    let result = probe::run(&config, &system, &table, &reporter)?;

    print_summary(&result);
    if progress_handler.advisory_count() > 0 {
        warn!(
            count = progress_handler.advisory_count(),
            "Stability advisories were raised during the run."
        );
    }

    if let Some(output) = &args.output {
        info!("Writing per-particle loads to {:?}", output);
        let writer = BufWriter::new(File::create(output)?);
        write_results(writer, system.particles(), &result.forces)?;
        println!("✓ Forces and torques written to: {}", output.display());
    }

    Ok(())
}

fn print_summary(result: &ProbeResult) {
    println!(
        "Contacts: {} pair(s) in range, {} touching, {} wall contact(s).",
        result.contacts.pairs, result.contacts.touching, result.contacts.wall_contacts
    );

    for (index, load) in result.wall_loads.iter().enumerate() {
        println!(
            "  Wall #{}: force ({:.6e}, {:.6e}, {:.6e})",
            index + 1,
            load.delta_f.x,
            load.delta_f.y,
            load.delta_f.z
        );
    }

    match result.reports.last() {
        Some(report) => println!(
            "Stability (step {}): vmax = {:.6e}, courant time = {:.6e}, dt/courant = {:.6}, vmax*dt/skin = {:.6}",
            report.step,
            report.vmax,
            report.courant_time,
            report.fraction_courant,
            report.fraction_skin
        ),
        None => println!("Stability monitor was not sampled."),
    }
}
