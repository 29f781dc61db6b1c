use std::path::{Path, PathBuf};

use tokio::fs::{create_dir_all, File};
use tokio::io::{AsyncWriteExt, BufWriter};

pub const QR_DIR: &str = "qr_codes";

pub async fn prepare_io(media_dir: &Path) -> std::io::Result<PathBuf> {
    let qr_dir = media_dir.join(QR_DIR);
    create_dir_all(&qr_dir).await?;
    Ok(qr_dir)
}

/// Creates or truncates `path`, making parent directories as needed.
pub async fn write_io_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    let mut writer = BufWriter::new(File::create(path).await?);
    writer.write_all(bytes).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_under_prepared_directory() {
        let media = tempfile::tempdir().unwrap();
        let qr_dir = prepare_io(media.path()).await.unwrap();
        assert!(qr_dir.is_dir());

        let target = qr_dir.join("SBU000001_qr.png");
        write_io_file(&target, b"first").await.unwrap();
        write_io_file(&target, b"second").await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"second");
    }
}
