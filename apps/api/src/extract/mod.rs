//! CV text extraction — walks a folder recursively and produces one
//! `Document` per candidate file, never a gap: files that yield no text get a
//! placeholder marker so downstream batching stays aligned with the folder
//! contents.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

/// One candidate document: file name plus whatever text could be extracted.
/// Immutable once produced.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub text: String,
}

impl Document {
    /// Formats the document for embedding into a batch, prefixed with its
    /// file name so the model can attribute fields back to a candidate.
    pub fn labeled(&self) -> String {
        format!("{} : \n{}", self.file_name, self.text)
    }
}

/// Marker substituted when no text could be extracted from a file.
pub fn placeholder_for(file_name: &str) -> String {
    format!("[No readable text in {file_name}]")
}

/// Extracts all candidate documents under `folder`, recursing into
/// subdirectories. Entries are visited in sorted name order so repeated runs
/// over the same folder produce the same document sequence.
///
/// Unsupported file types are skipped; supported files that fail extraction
/// contribute a placeholder document rather than an error.
pub fn extract_all(folder: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    walk(folder, &mut documents)
        .with_context(|| format!("Failed to read CV folder {}", folder.display()))?;
    info!("Extracted {} CV documents from {}", documents.len(), folder.display());
    Ok(documents)
}

fn walk(dir: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Cannot open directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, documents)?;
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let text = match extension.as_str() {
            "pdf" => extract_pdf(&path),
            "txt" | "md" => extract_plain(&path),
            _ => continue,
        };

        let text = match text {
            Some(text) => text,
            None => {
                warn!("No text extracted from {}", path.display());
                placeholder_for(&file_name)
            }
        };

        documents.push(Document { file_name, text });
    }

    Ok(())
}

/// PDF extraction via `pdf-extract`. Returns `None` for encrypted, scanned,
/// or otherwise unreadable files.
fn extract_pdf(path: &Path) -> Option<String> {
    match pdf_extract::extract_text(path) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            warn!("PDF extraction failed for {}: {e}", path.display());
            None
        }
    }
}

fn extract_plain(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            None
        }
    }
}
