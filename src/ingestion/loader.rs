//! Loader back-ends: local files, remote documents, YouTube transcripts.
//!
//! Each back-end turns one [`SourceDescriptor`] into zero or more
//! [`Document`]s. An empty source is not an error — it simply yields no
//! documents, and callers decide what that means for them.

use std::path::{Path, PathBuf};

use regex::Regex;
use reqwest::Client;
use tokio::fs;
use tracing::debug;
use url::Url;

use crate::types::{Document, RagError};

/// Declared format of a source, keyed the way back-ends are dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    Transcript,
}

/// A typed pointer to one ingestible source.
#[derive(Clone, Debug)]
pub enum SourceDescriptor {
    /// A file on disk. When `format` is `None` it is inferred from the
    /// extension (`.pdf`, `.txt`, `.md`).
    LocalFile {
        path: PathBuf,
        format: Option<DocumentFormat>,
    },
    /// A document fetched over HTTP, with an explicitly declared format.
    Remote { url: Url, format: DocumentFormat },
    /// A caption/transcript endpoint returning timedtext XML.
    Transcript { url: Url },
}

impl SourceDescriptor {
    /// Local file with format inferred from its extension.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::LocalFile {
            path: path.into(),
            format: None,
        }
    }

    /// Local file with an explicitly declared format.
    pub fn local_with_format(path: impl Into<PathBuf>, format: DocumentFormat) -> Self {
        Self::LocalFile {
            path: path.into(),
            format: Some(format),
        }
    }

    /// Remote plain-text document.
    pub fn remote_text(url: Url) -> Self {
        Self::Remote {
            url,
            format: DocumentFormat::PlainText,
        }
    }

    /// Remote PDF document.
    pub fn remote_pdf(url: Url) -> Self {
        Self::Remote {
            url,
            format: DocumentFormat::Pdf,
        }
    }

    /// Transcript of a YouTube video, via the public timedtext endpoint.
    pub fn youtube_transcript(video_id: &str, lang: &str) -> Result<Self, RagError> {
        let url = Url::parse(&format!(
            "https://video.google.com/timedtext?lang={lang}&v={video_id}"
        ))
        .map_err(|err| RagError::Load {
            source_id: video_id.to_string(),
            reason: format!("invalid transcript url: {err}"),
        })?;
        Ok(Self::Transcript { url })
    }

    /// Stable identifier used as the `source_id` of loaded documents.
    pub fn id(&self) -> String {
        match self {
            Self::LocalFile { path, .. } => path.display().to_string(),
            Self::Remote { url, .. } | Self::Transcript { url } => url.to_string(),
        }
    }
}

/// Loads all documents behind `source`.
///
/// May read the filesystem or perform network I/O; never writes. Returns an
/// empty vector for an empty source.
pub async fn load(client: &Client, source: &SourceDescriptor) -> Result<Vec<Document>, RagError> {
    debug!(source = %source.id(), "loading source");
    match source {
        SourceDescriptor::LocalFile { path, format } => {
            let format = match format {
                Some(format) => *format,
                None => infer_format(path)?,
            };
            match format {
                DocumentFormat::Pdf => load_local_pdf(path).await,
                DocumentFormat::PlainText => load_local_text(path).await,
                DocumentFormat::Transcript => Err(RagError::UnsupportedFormat(format!(
                    "local file {} cannot be a transcript",
                    path.display()
                ))),
            }
        }
        SourceDescriptor::Remote { url, format } => match format {
            DocumentFormat::Pdf => load_remote_pdf(client, url).await,
            DocumentFormat::PlainText => load_remote_text(client, url).await,
            DocumentFormat::Transcript => load_transcript(client, url).await,
        },
        SourceDescriptor::Transcript { url } => load_transcript(client, url).await,
    }
}

fn infer_format(path: &Path) -> Result<DocumentFormat, RagError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => Ok(DocumentFormat::Pdf),
        Some("txt") | Some("md") => Ok(DocumentFormat::PlainText),
        other => Err(RagError::UnsupportedFormat(format!(
            "{} (extension {:?})",
            path.display(),
            other.unwrap_or("none")
        ))),
    }
}

async fn load_local_text(path: &Path) -> Result<Vec<Document>, RagError> {
    let source_id = path.display().to_string();
    let text = fs::read_to_string(path).await.map_err(|err| RagError::Load {
        source_id: source_id.clone(),
        reason: err.to_string(),
    })?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![Document::new(source_id, text)])
}

async fn load_local_pdf(path: &Path) -> Result<Vec<Document>, RagError> {
    let source_id = path.display().to_string();
    let owned = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
        .await
        .map_err(|err| RagError::Load {
            source_id: source_id.clone(),
            reason: format!("pdf extraction task failed: {err}"),
        })?
        .map_err(|err| RagError::Load {
            source_id: source_id.clone(),
            reason: format!("pdf extraction failed: {err}"),
        })?;
    Ok(pages_to_documents(&source_id, &text))
}

async fn load_remote_text(client: &Client, url: &Url) -> Result<Vec<Document>, RagError> {
    let text = fetch(client, url).await?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![Document::new(url.to_string(), text)])
}

async fn load_remote_pdf(client: &Client, url: &Url) -> Result<Vec<Document>, RagError> {
    let source_id = url.to_string();
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| RagError::Load {
            source_id: source_id.clone(),
            reason: err.to_string(),
        })?;
    let bytes = response.bytes().await.map_err(|err| RagError::Load {
        source_id: source_id.clone(),
        reason: err.to_string(),
    })?;
    let extract_id = source_id.clone();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|err| RagError::Load {
            source_id: extract_id.clone(),
            reason: format!("pdf extraction task failed: {err}"),
        })?
        .map_err(|err| RagError::Load {
            source_id: extract_id,
            reason: format!("pdf extraction failed: {err}"),
        })?;
    Ok(pages_to_documents(&source_id, &text))
}

/// Fetches timedtext XML and strips it down to the spoken text.
async fn load_transcript(client: &Client, url: &Url) -> Result<Vec<Document>, RagError> {
    let body = fetch(client, url).await?;
    let text = strip_timedtext(&body);
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![Document::new(url.to_string(), text)])
}

async fn fetch(client: &Client, url: &Url) -> Result<String, RagError> {
    let source_id = url.to_string();
    client
        .get(url.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| RagError::Load {
            source_id: source_id.clone(),
            reason: err.to_string(),
        })?
        .text()
        .await
        .map_err(|err| RagError::Load {
            source_id: source_id,
            reason: err.to_string(),
        })
}

/// `pdf-extract` separates pages with form feeds; one `Document` per page,
/// mirroring how PDF loaders commonly report page-level provenance.
fn pages_to_documents(source_id: &str, text: &str) -> Vec<Document> {
    text.split('\x0c')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(index, page)| Document::new(format!("{source_id}#page={}", index + 1), page))
        .collect()
}

/// Extracts caption text from timedtext XML: cue contents concatenated in
/// order, markup removed, the handful of entities the endpoint emits decoded.
fn strip_timedtext(xml: &str) -> String {
    // Panics are unreachable: both patterns are literals known to compile.
    let cue = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("static regex");
    let tag = Regex::new(r"<[^>]+>").expect("static regex");

    let mut parts: Vec<String> = Vec::new();
    for capture in cue.captures_iter(xml) {
        let inner = tag.replace_all(&capture[1], " ");
        let decoded = decode_entities(&inner);
        if !decoded.trim().is_empty() {
            parts.push(decoded.trim().to_string());
        }
    }
    parts.join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_plain_text_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "hello from disk").await.unwrap();

        let client = Client::new();
        let docs = load(&client, &SourceDescriptor::local(&path)).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].raw_text, "hello from disk");
        assert_eq!(docs[0].source_id, path.display().to_string());
    }

    #[tokio::test]
    async fn empty_file_yields_no_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        tokio::fs::write(&path, "   \n").await.unwrap();

        let client = Client::new();
        let docs = load(&client, &SourceDescriptor::local(&path)).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn unknown_extension_is_unsupported() {
        let client = Client::new();
        let err = load(&client, &SourceDescriptor::local("report.docx"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let client = Client::new();
        let err = load(&client, &SourceDescriptor::local("/no/such/file.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Load { .. }));
    }

    #[test]
    fn timedtext_is_stripped_and_decoded() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<transcript>
  <text start="0.0" dur="2.5">Hello &amp; welcome</text>
  <text start="2.5" dur="3.0">to <i>the</i> show</text>
  <text start="5.5" dur="1.0">   </text>
</transcript>"#;
        assert_eq!(strip_timedtext(xml), "Hello & welcome to  the  show");
    }

    #[test]
    fn pdf_pages_become_separate_documents() {
        let docs = pages_to_documents("a.pdf", "page one\x0cpage two\x0c \x0cpage four");
        let ids: Vec<&str> = docs.iter().map(|d| d.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a.pdf#page=1", "a.pdf#page=2", "a.pdf#page=4"]);
    }

    #[test]
    fn transcript_descriptor_builds_timedtext_url() {
        let source = SourceDescriptor::youtube_transcript("abc123", "en").unwrap();
        let SourceDescriptor::Transcript { url } = &source else {
            panic!("expected transcript descriptor");
        };
        assert!(url.as_str().contains("v=abc123"));
        assert!(url.as_str().contains("lang=en"));
    }
}
