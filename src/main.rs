use std::{path::PathBuf, sync::Arc};

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotback::{
    backup::BackupOptions,
    cli::{self, BackupArgs, UploadArgs},
    config, error,
    types::PkceToken,
};
use tokio::sync::Mutex;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Export your library into CSV files
    Backup(BackupCommand),

    /// Upload an existing backup to an object store
    Upload(UploadCommand),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct BackupCommand {
    /// Root directory of the backup tree
    #[clap(long, short, default_value = "spotify-backup")]
    output: PathBuf,

    /// Number of sections fetched at the same time
    #[clap(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=8))]
    workers: u16,

    /// Only list followed playlists, without their tracks
    #[clap(long)]
    skip_foreign_tracks: bool,

    /// Upload the finished backup to this bucket
    #[clap(long)]
    bucket: Option<String>,

    /// Key prefix inside the bucket
    #[clap(long, default_value = "", requires = "bucket")]
    prefix: String,
}

#[derive(Parser, Debug, Clone)]
pub struct UploadCommand {
    /// Target bucket
    #[clap(long)]
    bucket: String,

    /// Key prefix inside the bucket
    #[clap(long, default_value = "")]
    prefix: String,

    /// Root directory of the backup tree
    #[clap(long, short, default_value = "spotify-backup")]
    output: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(Arc::clone(&oauth_result)).await;
        }
        Command::Backup(opt) => {
            let upload = opt.bucket.map(|bucket| UploadArgs {
                bucket,
                prefix: opt.prefix,
            });
            cli::backup(BackupArgs {
                output: opt.output,
                options: BackupOptions {
                    workers: opt.workers as usize,
                    foreign_tracks: !opt.skip_foreign_tracks,
                },
                upload,
            })
            .await
        }
        Command::Upload(opt) => {
            cli::upload(
                opt.output,
                UploadArgs {
                    bucket: opt.bucket,
                    prefix: opt.prefix,
                },
            )
            .await
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
