use clap::{Args, Parser, Subcommand};
use sensorhub_core::DeviceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "sensorhubdev CLI (alpha)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Clone, Debug, Default)]
pub struct HubArgs {
    /// Storage root; overrides `storage.root` from the config
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Config file base name (without extension), e.g. "config/sensorhub"
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload raw logs; directories are walked for `.rawdata` files
    Ingest {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// descend into subdirectories
        #[arg(long)]
        recursive: bool,
        /// device family; guessed from each filename when omitted
        #[arg(long)]
        device: Option<DeviceKind>,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Register an already compressed `.raw.zst` blob
    Import {
        zst: PathBuf,
        /// MD5 of the decompressed content (32 hex chars)
        #[arg(long)]
        hash: String,
        /// name to register; defaults to the zst file name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        device: Option<DeviceKind>,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Check a blob against its hash and rebuild its frame index
    Verify {
        hash: String,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Print the stored frame index of a blob
    Frames {
        hash: String,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Print the batch plan a parallel parse would use
    Batches {
        hash: String,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// List registered files, newest first
    Ls {
        /// also print catalog totals
        #[arg(long)]
        stats: bool,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Remove a file; its blob goes with the last reference
    Rm {
        file_id: String,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Parse a file into parquet tables
    Parse {
        file_id: String,
        #[arg(long)]
        device: Option<DeviceKind>,
        /// stream progress events to stderr while parsing
        #[arg(long)]
        watch: bool,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Show the parse state of a file
    Progress {
        file_id: String,
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Reset parses left in `processing` by an interrupted run
    Recover {
        #[command(flatten)]
        hub: HubArgs,
    },

    /// Fetch logs over HTTP and ingest them: URL NAME [URL NAME]...
    Download {
        #[arg(required = true, num_args = 2.., value_names = ["URL", "FILENAME"])]
        pairs: Vec<String>,
        #[command(flatten)]
        hub: HubArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shared_hub_flags() {
        let cli = Cli::try_parse_from([
            "sensorhubdev",
            "parse",
            "f-1",
            "--device",
            "ring",
            "--root",
            "/tmp/hub",
        ])
        .unwrap();
        match cli.command {
            Commands::Parse {
                file_id,
                device,
                watch,
                hub,
            } => {
                assert_eq!(file_id, "f-1");
                assert_eq!(device, Some(DeviceKind::Ring));
                assert!(!watch);
                assert_eq!(hub.root, Some(PathBuf::from("/tmp/hub")));
                assert_eq!(hub.config, None);
            }
            _ => panic!("expected parse"),
        }
    }

    #[test]
    fn download_takes_url_name_pairs() {
        let cli = Cli::try_parse_from([
            "sensorhubdev",
            "download",
            "http://h/a",
            "a.rawdata",
            "http://h/b",
            "b.rawdata",
        ])
        .unwrap();
        let Commands::Download { pairs, .. } = cli.command else {
            panic!("expected download");
        };
        assert_eq!(pairs.len(), 4);
        assert!(Cli::try_parse_from(["sensorhubdev", "download", "http://h/a"]).is_err());
    }
}
