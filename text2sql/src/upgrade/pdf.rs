//! Minimal single-page PDF writer for text-only documents.
//!
//! Layout uses millimetres from the top-left corner of an A4 page, the same
//! convention as browser-side PDF generators. Text is set in the built-in
//! Helvetica font with WinAnsi (Windows-1252) encoding. Characters that
//! encoding cannot represent are replaced by `?`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const PAGE_WIDTH_PT: f64 = 595.28;
const PAGE_HEIGHT_PT: f64 = 841.89;
const PT_PER_MM: f64 = 72.0 / 25.4;

#[derive(Debug, Clone, PartialEq)]
struct TextItem {
    size: f64,
    x_mm: f64,
    y_mm: f64,
    text: String,
}

/// A one-page text document.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    font_size: f64,
    items: Vec<TextItem>,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        Self {
            font_size: 16.0,
            items: Vec::new(),
        }
    }

    /// Font size for subsequent text, in points.
    pub fn set_font_size(&mut self, size: f64) -> &mut Self {
        self.font_size = size;
        self
    }

    /// Place `text` with its baseline at (`x_mm`, `y_mm`) from the top-left.
    pub fn text(&mut self, text: &str, x_mm: f64, y_mm: f64) -> &mut Self {
        self.items.push(TextItem {
            size: self.font_size,
            x_mm,
            y_mm,
            text: text.to_string(),
        });
        self
    }

    /// Serialize to PDF bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let content = self
            .items
            .iter()
            .map(|item| {
                let x = item.x_mm * PT_PER_MM;
                let y = PAGE_HEIGHT_PT - item.y_mm * PT_PER_MM;
                format!(
                    "BT /F1 {} Tf {x:.2} {y:.2} Td ({}) Tj ET",
                    item.size,
                    escape_text(&item.text)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH_PT} {PAGE_HEIGHT_PT}] \
                 /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
            ),
            format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            let _ = write!(out, "{} 0 obj\n{body}\nendobj\n", i + 1);
        }

        let xref_at = out.len();
        let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(out, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        );
        out.into_bytes()
    }

    /// Write the document to `dir/filename`, returning the full path.
    pub fn save(&self, dir: &Path, filename: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        let path = dir.join(filename);
        std::fs::write(&path, self.to_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Windows-1252 code for `c`, if it has one.
fn winansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        ' '..='~' | '\u{a0}'..='\u{ff}' => return u8::try_from(u32::from(c)).ok(),
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// Escape a string literal. Non-ASCII WinAnsi codes are written as octal
/// escapes so the content stream stays ASCII.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => match winansi_byte(c) {
                Some(b) if b.is_ascii() => out.push(char::from(b)),
                Some(b) => {
                    let _ = write!(out, "\\{b:03o}");
                }
                None => out.push('?'),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape_text(r"a(b)\c"), r"a\(b\)\\c");
        assert_eq!(escape_text("café"), r"caf\351");
        assert_eq!(escape_text("€5 – “ok”"), r"\2005 \226 \223ok\224");
        assert_eq!(escape_text("日本"), "??");
    }

    #[test]
    fn test_stream_length_excludes_final_eol() {
        let mut doc = PdfDocument::new();
        doc.text("one", 10.0, 10.0).text("Müller", 10.0, 20.0);
        let text = String::from_utf8(doc.to_bytes()).unwrap();

        let length: usize = text
            .split("/Length ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .parse()
            .unwrap();
        let start = text.find("stream\n").unwrap() + "stream\n".len();
        let end = text.find("\nendstream").unwrap();

        assert_eq!(end - start, length);
        assert!(text[start..end].ends_with("Tj ET"));
        assert!(text.is_ascii());
    }

    #[test]
    fn test_document_structure() {
        let mut doc = PdfDocument::new();
        doc.set_font_size(22.0).text("Hello (world)", 20.0, 20.0);
        let bytes = doc.to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains(r"(Hello \(world\)) Tj"));
        assert!(text.contains("/F1 22 Tf 56.69 785.20 Td"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut doc = PdfDocument::new();
        doc.text("x", 10.0, 10.0);
        let text = String::from_utf8(doc.to_bytes()).unwrap();

        let xref = text.find("xref\n").unwrap();
        let entries: Vec<usize> = text[xref..]
            .lines()
            .skip(3)
            .take(5)
            .map(|l| l[..10].parse().unwrap())
            .collect();
        for (i, offset) in entries.iter().enumerate() {
            assert!(text[*offset..].starts_with(&format!("{} 0 obj", i + 1)));
        }

        let startxref: usize = text
            .lines()
            .skip_while(|l| *l != "startxref")
            .nth(1)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(startxref, xref);
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.text("saved", 20.0, 20.0);

        let path = doc.save(dir.path(), "out.pdf").unwrap();

        assert_eq!(path, dir.path().join("out.pdf"));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
    }
}
