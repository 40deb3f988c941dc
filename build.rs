//! Build script for spotback.
//!
//! Copies `.env.example` into the local data directory
//! (`~/.local/share/spotback` on Linux), next to where the CLI looks for its
//! `.env` file. A missing template only produces a cargo warning.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join(".env.example");

    let target_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spotback");
    fs::create_dir_all(&target_dir)?;

    if template.is_file() {
        fs::copy(&template, target_dir.join(".env.example"))?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            template.display()
        );
    }

    Ok(())
}
