use serde::{Deserialize, Serialize};

/// Document author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub institution: String,
}

/// Retrieved document metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub idx: i64,
    pub title: String,
    pub authors: Vec<Author>,
    #[serde(rename = "publicationDate")]
    pub publication_date: String,
    pub language: String,
    pub keywords: Vec<String>,
    pub publisher: String,
    pub journal: String,
}

/// Citation for a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub source_type: String,
    pub id: i64,
    pub url: String,
}

/// Passage of a retrieved document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub doc_id: i64,
    pub text: String,
    pub source: Vec<Source>,
}

/// Retrieval result: ordered documents plus the chunks used as answer context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub doc: Vec<Document>,
    pub chunks: Vec<Chunk>,
}

impl Attachment {
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty() && self.chunks.is_empty()
    }

    /// Chunks whose `doc_id` matches no returned document
    pub fn orphan_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks
            .iter()
            .filter(|c| !self.doc.iter().any(|d| d.idx == c.doc_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_wire_names() {
        let doc = Document {
            idx: 1,
            title: "Graph Retrieval".to_string(),
            authors: vec![Author {
                name: "Li Wei".to_string(),
                institution: "Tsinghua".to_string(),
            }],
            publication_date: "2023-05-01".to_string(),
            language: "en".to_string(),
            keywords: vec!["rag".to_string()],
            publisher: "ACM".to_string(),
            journal: "SIGIR".to_string(),
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["publicationDate"], "2023-05-01");
        assert!(value.get("publication_date").is_none());
        assert_eq!(value["authors"][0]["institution"], "Tsinghua");
    }

    #[test]
    fn test_source_type_field() {
        let source = Source {
            source_type: "document".to_string(),
            id: 3,
            url: "https://example.org/3".to_string(),
        };
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["type"], "document");
    }

    #[test]
    fn test_orphan_chunks() {
        let attachment = Attachment {
            doc: vec![],
            chunks: vec![Chunk {
                id: 1,
                doc_id: 42,
                text: "t".to_string(),
                source: vec![],
            }],
        };
        assert!(!attachment.is_empty());
        assert_eq!(attachment.orphan_chunks().count(), 1);
        assert!(Attachment::default().is_empty());
    }
}
