use std::path::PathBuf;

use tabled::Table;
use tokio_util::sync::CancellationToken;

use crate::{
    backup::{self, BackupContext, BackupOptions, BackupTree},
    config, error, info,
    management::TokenManager,
    spotify::{
        Credentials, SpotifyApi,
        pager::{PagerContext, RetryPolicy},
    },
    success,
    utils::ARTIST_DELIMITER,
    warning,
};

use super::upload::{UploadArgs, upload_tree};

#[derive(Debug, Clone)]
pub struct BackupArgs {
    pub output: PathBuf,
    pub options: BackupOptions,
    /// Upload the finished tree when set.
    pub upload: Option<UploadArgs>,
}

pub async fn backup(args: BackupArgs) {
    let token_mgr = match TokenManager::load().await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load token. Please run spotback auth\n Error: {}", e);
        }
    };

    let api = SpotifyApi::new(config::spotify_apiurl(), Credentials::managed(token_mgr));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warning!("Interrupted, stopping after the current request...");
            on_interrupt.cancel();
        }
    });
    let pager = PagerContext::new(RetryPolicy::default(), cancel);

    let user = match api.current_user(&pager).await {
        Ok(user) => user,
        Err(e) => error!("Cannot load your Spotify profile. Err: {}", e),
    };
    info!(
        "Logged in as {}",
        user.display_name.as_deref().unwrap_or(&user.id)
    );
    info!(
        "Writing to {} (multiple artists are separated by '{}')",
        args.output.display(),
        ARTIST_DELIMITER
    );

    let ctx = BackupContext {
        api,
        tree: BackupTree::new(&args.output),
        pager,
        options: args.options,
        user_id: user.id,
    };

    let report = backup::run(&ctx).await;
    println!("{}", Table::new(report.table_rows()));

    if let Some(e) = report.terminal_error() {
        error!("Backup stopped. Err: {}", e);
    }

    let failed = report.failed().count();
    let skipped: usize = report.sections.iter().map(|r| r.skipped.len()).sum();
    if report.is_complete() {
        success!("Backup complete: {}", args.output.display());
    } else {
        warning!(
            "Backup finished with {} failed sections and {} skipped playlists. Run it again to retry them",
            failed,
            skipped
        );
    }

    if let Some(target) = args.upload {
        match upload_tree(&args.output, &target).await {
            Ok(count) => success!("Uploaded {} files to {}", count, target.bucket),
            Err(e) => error!(
                "Upload failed. Local files are kept in {}. Err: {}",
                args.output.display(),
                e
            ),
        }
    }

    if failed > 0 {
        std::process::exit(2);
    }
}
