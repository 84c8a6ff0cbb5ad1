use std::path::PathBuf;

use anyhow::Result;
use pathwave::PathTracer;

#[derive(clap::Parser)]
#[clap(author, version)]
struct CliArgs {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    Render(RenderArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    // Scene description file.
    #[arg(long)]
    scene: PathBuf,

    // Samples per pixel, defaults to the scene's sampler setting.
    #[arg(long)]
    spp: Option<u32>,

    // Extra copy of the final image next to the default "{n}spp.png".
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    use clap::Parser;

    env_logger::init();

    match CliArgs::parse().command {
        Commands::Render(args) => {
            let mut path_tracer = PathTracer::new(&args.scene)?;
            let samples = args.spp.unwrap_or_else(|| path_tracer.samples_per_pixel());
            path_tracer.render(samples)?;
            if let Some(output) = args.output {
                path_tracer.output(output)?;
            }
            Ok(())
        }
    }
}
