//! Static retrieval payload
//!
//! Serves a canned search response, either the bundled sample or a JSON
//! file read on every call. The raw records are lenient (missing fields
//! default) and chunk URLs are turned into a single `document` source.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use super::{RetrievalError, Retriever};
use crate::domain::models::{Attachment, Author, Chunk, Document, Source};

const SAMPLE_PAYLOAD: &str = include_str!("../../../fixtures/sample_search_result.json");

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawResponse {
    data: RawAttachment,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAttachment {
    doc: Vec<RawDocument>,
    chunks: Vec<RawChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAuthor {
    name: String,
    institution: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    idx: i64,
    title: String,
    authors: Vec<RawAuthor>,
    #[serde(rename = "publicationDate")]
    publication_date: String,
    language: String,
    keywords: Vec<String>,
    publisher: String,
    journal: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChunk {
    id: i64,
    doc_id: i64,
    text: String,
    url: String,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Document {
            idx: raw.idx,
            title: raw.title,
            authors: raw
                .authors
                .into_iter()
                .map(|a| Author {
                    name: a.name,
                    institution: a.institution,
                })
                .collect(),
            publication_date: raw.publication_date,
            language: raw.language,
            keywords: raw.keywords,
            publisher: raw.publisher,
            journal: raw.journal,
        }
    }
}

impl From<RawChunk> for Chunk {
    fn from(raw: RawChunk) -> Self {
        Chunk {
            id: raw.id,
            doc_id: raw.doc_id,
            text: raw.text,
            source: vec![Source {
                source_type: "document".to_string(),
                id: raw.id,
                url: raw.url,
            }],
        }
    }
}

fn parse_payload(raw: &str) -> Result<Attachment, RetrievalError> {
    let response: RawResponse = serde_json::from_str(raw)?;
    Ok(Attachment {
        doc: response.data.doc.into_iter().map(Document::from).collect(),
        chunks: response.data.chunks.into_iter().map(Chunk::from).collect(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    path: Option<PathBuf>,
}

impl StaticRetriever {
    /// Serve the payload bundled with the binary
    pub fn sample() -> Self {
        Self { path: None }
    }

    /// Serve the payload in `path`, re-read on every search
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, query: &str) -> Result<Attachment, RetrievalError> {
        tracing::debug!(query = query, "Serving static retrieval payload");

        match &self.path {
            None => parse_payload(SAMPLE_PAYLOAD),
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| RetrievalError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                parse_payload(&raw)
            }
        }
    }
}
