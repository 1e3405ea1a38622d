//! Command-line surface: one subcommand per verb, parsed with `clap`'s derive API.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gallerysync", version, about = "Mirrors local photo/video directories into a remote gallery")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Remote account nickname to operate against. Falls back to `GALLERYSYNC_USER` if unset.
    #[arg(short, long, global = true, env = "GALLERYSYNC_USER")]
    pub user: Option<String>,

    /// Base URL of the remote service's REST API. Falls back to `GALLERYSYNC_BASE_URL` if unset.
    #[arg(long, global = true, env = "GALLERYSYNC_BASE_URL")]
    pub base_url: Option<String>,

    /// Log HTTP method, URI, and status for every remote call.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Perform the OAuth1 three-legged exchange and persist the resulting token.
    Login {
        #[arg(long = "key")]
        consumer_key: String,
        #[arg(long = "secret")]
        consumer_secret: String,
    },
    /// Delete the persisted credential file.
    Logout,
    /// List the children of the node at `path`.
    Ls {
        path: Option<String>,
        #[arg(short = 'l', long = "long")]
        long: bool,
    },
    /// Create Folder nodes.
    Mkdir {
        paths: Vec<String>,
        #[arg(short = 'p', long)]
        parents: bool,
    },
    /// Create an Album node (intermediates become Folders).
    Mkalbum {
        paths: Vec<String>,
        #[arg(short = 'p', long)]
        parents: bool,
    },
    /// Remove empty Folder nodes.
    Rmdir { paths: Vec<String> },
    /// Remove nodes.
    Rm {
        paths: Vec<String>,
        #[arg(short = 'f', long)]
        force: bool,
        #[arg(short = 'p', long)]
        parents: bool,
    },
    /// Upload one or more files into an existing album.
    Upload {
        files: Vec<PathBuf>,
        album_path: String,
    },
    /// Mirror local source directories into remote destination paths.
    Sync(SyncArgs),
    /// Add paths/globs to the ignore list.
    Ignore { patterns: Vec<String> },
    /// Remove paths/globs from the ignore list.
    Include { patterns: Vec<String> },
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// One or more `src[:dst]` pairs; `dst` defaults to the source's base name under the root.
    pub pairs: Vec<String>,

    /// Delete remote images with no local counterpart, instead of only reporting them.
    #[arg(long)]
    pub delete: bool,

    #[arg(long)]
    pub folder_threads: Option<usize>,
    #[arg(long)]
    pub file_threads: Option<usize>,
    #[arg(long)]
    pub upload_threads: Option<usize>,

    /// Persist the thread-count flags above as the new defaults.
    #[arg(long)]
    pub set_defaults: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_parses_multiple_pairs_and_flags() {
        let cli = Cli::parse_from([
            "gallerysync",
            "sync",
            "photos:2015/vacation",
            "--delete",
            "--file_threads",
            "16",
        ]);
        match cli.command {
            Command::Sync(args) => {
                assert_eq!(args.pairs, vec!["photos:2015/vacation".to_string()]);
                assert!(args.delete);
                assert_eq!(args.file_threads, Some(16));
            }
            other => panic!("expected Sync, got {other:?}"),
        }
    }
}
