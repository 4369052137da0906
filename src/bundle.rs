use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Packs every generated `*_gradecard.pdf` under `output_dir` into a single
/// zip archive for bulk download. Returns the number of cards bundled.
pub fn bundle_cards(output_dir: &Path, archive_path: &Path) -> anyhow::Result<usize> {
    let mut cards: Vec<PathBuf> = fs::read_dir(output_dir)
        .with_context(|| format!("failed to read output directory {}", output_dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().ends_with("_gradecard.pdf"))
                .unwrap_or(false)
        })
        .collect();
    cards.sort();

    if cards.is_empty() {
        anyhow::bail!("no grade cards found in {}", output_dir.display());
    }

    let file = File::create(archive_path)
        .with_context(|| format!("failed to create archive {}", archive_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for card in &cards {
        let name = card
            .file_name()
            .and_then(|name| name.to_str())
            .context("grade card file name is not valid UTF-8")?;
        zip.start_file(name, options)?;
        zip.write_all(&fs::read(card)?)?;
    }
    zip.finish()?;

    Ok(cards.len())
}
