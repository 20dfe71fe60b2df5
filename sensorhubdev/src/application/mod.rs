pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use sensorhub_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Ingest {
            inputs,
            recursive,
            device,
            hub,
        } => handlers::handle_ingest(&hub, inputs, recursive, device),
        Commands::Import {
            zst,
            hash,
            name,
            device,
            hub,
        } => handlers::handle_import(&hub, zst, &hash, name, device),
        Commands::Verify { hash, hub } => handlers::handle_verify(&hub, &hash),
        Commands::Frames { hash, hub } => handlers::handle_frames(&hub, &hash),
        Commands::Batches { hash, hub } => handlers::handle_batches(&hub, &hash),
        Commands::Ls { stats, hub } => handlers::handle_ls(&hub, stats),
        Commands::Rm { file_id, hub } => handlers::handle_rm(&hub, &file_id),
        Commands::Parse {
            file_id,
            device,
            watch,
            hub,
        } => handlers::handle_parse(&hub, &file_id, device, watch),
        Commands::Progress { file_id, hub } => handlers::handle_progress(&hub, &file_id),
        Commands::Recover { hub } => handlers::handle_recover(&hub),
        Commands::Download { pairs, hub } => handlers::handle_download(&hub, pairs),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
