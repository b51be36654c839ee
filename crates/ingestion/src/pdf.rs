//! PDF text extraction module
//!
//! Extracts per-page text from PDF files using lopdf. Each page becomes one
//! [`SourceDocument`] tagged with its file path and 0-based page index.

use lexrag_common::document::{PAGE_KEY, SOURCE_KEY};
use lexrag_common::errors::{AppError, Result};
use lexrag_common::{Metadata, SourceDocument};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load every page of every matching file directly inside `dir`.
///
/// Files are visited in file-name order. An unreadable directory or file
/// fails the whole load.
pub fn load_pdf_directory(dir: &Path, extension: &str) -> Result<Vec<SourceDocument>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::load(dir.display(), format!("Cannot read directory: {}", e)))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| AppError::load(dir.display(), format!("Cannot list directory: {}", e)))?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, extension) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in &paths {
        documents.extend(load_pdf(path)?);
    }

    info!(
        dir = %dir.display(),
        files = paths.len(),
        pages = documents.len(),
        "Loaded PDF documents"
    );

    Ok(documents)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension.trim_start_matches('.')))
        .unwrap_or(false)
}

/// Extract one document per page from a PDF file
pub fn load_pdf(path: &Path) -> Result<Vec<SourceDocument>> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| AppError::load(path.display(), format!("Failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    debug!(path = %path.display(), page_count = pages.len(), "Extracting text from PDF");

    let source = path.display().to_string();
    let mut documents = Vec::with_capacity(pages.len());

    for (index, (page_num, page_id)) in pages.iter().enumerate() {
        let text = match extract_page_text(&doc, *page_num, *page_id) {
            Ok(text) => clean_text(&text),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    page = page_num,
                    error = %e,
                    "Failed to extract text from page, keeping it empty"
                );
                String::new()
            }
        };

        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), json!(source));
        metadata.insert(PAGE_KEY.to_string(), json!(index));
        documents.push(SourceDocument::new(text, metadata));
    }

    Ok(documents)
}

/// Extract text from a single page.
///
/// Uses lopdf's font-aware extraction and falls back to scanning the raw
/// content stream when that yields nothing.
fn extract_page_text(
    doc: &lopdf::Document,
    page_num: u32,
    page_id: lopdf::ObjectId,
) -> std::result::Result<String, String> {
    match doc.extract_text(&[page_num]) {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        extracted => {
            let content = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
            let text = extract_text_from_content(&content);
            if text.trim().is_empty() {
                if let Err(e) = extracted {
                    return Err(e.to_string());
                }
            }
            Ok(text)
        }
    }
}

/// Extract text from PDF content stream
fn extract_text_from_content(content: &[u8]) -> String {
    // Simple text extraction - looks for text between BT and ET operators
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    text
}

/// Extract text from a PDF text operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // (text) Tj, (text) ' and (text) "
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
            if start < end {
                return Some(decode_pdf_string(&line[start + 1..end]));
            }
        }
    }

    // [(text) num (text) num] TJ
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => in_paren = true,
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse whitespace runs and strip byte-order marks
fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
