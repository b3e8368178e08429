//! Beam generation command line
//!
//! Builds a canonical-coordinate beam from a generator configuration and a
//! transform chain, and optionally saves it for a tracking engine.

use std::path::PathBuf;
use std::process::ExitCode;

use beam_generator::{BeamBuilder, ConfigDocument, DistGenerator, GeneratorVersion};
use beam_physics::tensor::{PX, PY, PZ, X, Y, Z};
use beam_physics::{Beam, CoordinateTransform, LongitudinalConvention, Precision};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "beamgen")]
#[command(about = "Generate a particle beam in canonical phase-space coordinates")]
struct Cli {
    /// Base generator configuration (YAML)
    base: PathBuf,

    /// Transform chain to install into the base configuration (YAML)
    transforms: PathBuf,

    /// Reference momentum p0c (eV/c)
    #[arg(long)]
    p0c: f64,

    /// Save the beam to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Floating point width of the beam
    #[arg(long, value_enum, default_value_t = PrecisionArg::F32)]
    precision: PrecisionArg,

    /// Sign convention of the longitudinal coordinate z
    #[arg(long, value_enum, default_value_t = ZConvention::AheadPositive)]
    z_convention: ZConvention,

    /// Pretend to be an older generator revision (e.g. 0.9.0)
    #[arg(long)]
    generator_version: Option<GeneratorVersion>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PrecisionArg {
    F32,
    F64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ZConvention {
    /// Particles ahead of the reference have z > 0
    AheadPositive,
    /// Particles ahead of the reference have z < 0
    AheadNegative,
}

impl From<ZConvention> for LongitudinalConvention {
    fn from(convention: ZConvention) -> Self {
        match convention {
            ZConvention::AheadPositive => LongitudinalConvention::AheadPositive,
            ZConvention::AheadNegative => LongitudinalConvention::AheadNegative,
        }
    }
}

fn main() -> ExitCode {
    // RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.precision {
        PrecisionArg::F32 => run::<f32>(&cli),
        PrecisionArg::F64 => run::<f64>(&cli),
    }
}

fn run<P: Precision>(cli: &Cli) -> ExitCode {
    let generator = cli
        .generator_version
        .map_or_else(DistGenerator::new, DistGenerator::with_version);
    let transform = CoordinateTransform::default().with_convention(cli.z_convention.into());
    let builder = BeamBuilder::new(generator).with_transform(transform);

    let documents = ConfigDocument::from_path(&cli.base)
        .and_then(|base| Ok((base, ConfigDocument::from_path(&cli.transforms)?)));
    let outcome = documents.and_then(|(base, transforms)| {
        builder.build_and_persist::<P>(base, &transforms, cli.p0c, cli.output.as_deref())
    });

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(error) => {
            log::error!("Beam generation failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    summarize(&outcome.beam);
    match outcome.persistence_error() {
        Some(error) => {
            log::error!("Beam was built but not saved: {error}");
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

fn summarize<P: Precision>(beam: &Beam<P>) {
    log::info!(
        "✓ {} particles at s = {} m, p0c = {} eV/c, mc2 = {} eV",
        beam.particle_count(),
        beam.s(),
        beam.p0c(),
        beam.mc2()
    );

    let count = beam.particle_count() as f64;
    for (name, column) in [("x", X), ("px", PX), ("y", Y), ("py", PY), ("z", Z), ("pz", PZ)] {
        let values: Vec<f64> = beam.coordinates().column(column).map(P::widen).collect();
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
        log::info!("  {name:>2}: mean = {mean:+.6e}, rms = {:.6e}", variance.sqrt());
    }
}
