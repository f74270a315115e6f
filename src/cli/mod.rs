pub mod device;
pub mod run;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::config::SwisstextConfig;
use crate::embedding::local::ModelFiles;

/// Hub URL of a file in a model repository.
fn hub_file_url(hub_url: &str, model_name: &str, file: &str) -> String {
    format!(
        "{}/{}/resolve/main/{file}",
        hub_url.trim_end_matches('/'),
        model_name.trim()
    )
}

/// Download the ONNX export and tokenizer of `model_name` into the cache.
///
/// Files already present are kept. An unknown model name fails with the
/// hub's HTTP status.
pub async fn model_download(config: &SwisstextConfig, model_name: &str) -> Result<ModelFiles> {
    let files = ModelFiles::in_cache(&config.resolved_cache_dir(), model_name);
    std::fs::create_dir_all(&files.dir)
        .with_context(|| format!("failed to create cache dir: {}", files.dir.display()))?;

    let hub = &config.model.hub_url;

    if files.model.exists() {
        println!("Model already exists at {}", files.model.display());
    } else {
        println!("Downloading {model_name} model.onnx...");
        download_file(&hub_file_url(hub, model_name, "onnx/model.onnx"), &files.model).await?;
        println!("Model saved to {}", files.model.display());
    }

    if files.tokenizer.exists() {
        println!("Tokenizer already exists at {}", files.tokenizer.display());
    } else {
        println!("Downloading {model_name} tokenizer.json...");
        download_file(&hub_file_url(hub, model_name, "tokenizer.json"), &files.tokenizer).await?;
        println!("Tokenizer saved to {}", files.tokenizer.display());
    }

    Ok(files)
}

/// Download a file from a URL with progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download of {url} failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
