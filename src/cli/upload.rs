use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config, error, info, success,
    upload::{HttpObjectStore, Uploader},
};

/// Where an upload goes.
#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub bucket: String,
    pub prefix: String,
}

/// Uploads the backup tree at `output`.
pub async fn upload(output: PathBuf, args: UploadArgs) {
    if !output.is_dir() {
        error!(
            "Nothing to upload: {} is not a directory. Run spotback backup first",
            output.display()
        );
    }

    match upload_tree(&output, &args).await {
        Ok(count) => success!(
            "Uploaded {} files to {}/{}",
            count,
            args.bucket,
            args.prefix.trim_matches('/')
        ),
        Err(e) => error!(
            "Upload failed. Local files are kept in {}. Err: {}",
            output.display(),
            e
        ),
    }
}

/// Shared with `spotback backup --bucket`.
pub(crate) async fn upload_tree(output: &Path, args: &UploadArgs) -> crate::Res<usize> {
    let endpoint = config::object_store_url()?;
    info!("Uploading {} to {}", output.display(), endpoint);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{bar:40.blue} {pos}/{len} {msg}")
            .map_err(|e| e.to_string())?
            .progress_chars("=> "),
    );

    let store =
        HttpObjectStore::new(endpoint, config::object_store_token()).with_progress(pb.clone());
    let result = store.upload(output, &args.bucket, &args.prefix).await;
    pb.finish_and_clear();

    Ok(result?.len())
}
