//! Writing projected views to CSV and reading them back.

use std::path::Path;

use futures::StreamExt;
use tracing::info;

use crate::ranking::error::RankingResult;
use crate::ranking::view::View;

/// Write `view` to `path` as CSV, creating missing parent directories.
///
/// The file holds exactly the view's headers and rendered cells, in order.
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub async fn export_view(view: &View, path: impl AsRef<Path>) -> RankingResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = tokio::fs::File::create(path).await?;
    let mut writer = csv_async::AsyncWriter::from_writer(file);
    writer.write_record(&view.headers).await?;
    for record in view.records() {
        writer.write_record(&record).await?;
    }
    writer.flush().await?;

    info!("Exported {} rows to {}", view.len(), path.display());
    Ok(())
}

/// Read an exported CSV back as its header row and string records.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub async fn read_records(path: impl AsRef<Path>) -> RankingResult<(Vec<String>, Vec<Vec<String>>)> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    let mut reader = csv_async::AsyncReaderBuilder::new().create_reader(bytes.as_slice());

    let headers = reader.headers().await?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    let mut records = reader.records();
    while let Some(record) = records.next().await {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}
