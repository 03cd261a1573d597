//! Vector index lookup over the index service's HTTP API

use super::VectorIndex;
use ragforge_common::{
    config::IndexConfig,
    errors::{AppError, Result},
    models::RetrievedChunk,
};
use serde::{Deserialize, Serialize};

pub struct HttpVectorIndex {
    client: reqwest::Client,
    url: String,
}

impl HttpVectorIndex {
    pub fn new(client: reqwest::Client, config: &IndexConfig) -> Self {
        Self {
            client,
            url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.query_path.trim_start_matches('/')
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    user_id: &'a str,
    query: &'a str,
    k: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    relevant_docs: Vec<RelevantDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelevantDoc {
    document_name: Option<String>,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    content: String,
    server_filename: Option<String>,
}

impl From<RelevantDoc> for RetrievedChunk {
    fn from(doc: RelevantDoc) -> Self {
        let document_name = doc
            .document_name
            .or_else(|| doc.server_filename.clone())
            .unwrap_or_else(|| "Unknown Document".to_string());
        RetrievedChunk {
            source_id: doc.server_filename.unwrap_or_else(|| document_name.clone()),
            content: doc.content,
            score: doc.score,
            document_name,
        }
    }
}

#[async_trait::async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn query(&self, user_id: &str, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let response = self
            .client
            .post(&self.url)
            .json(&QueryRequest {
                user_id,
                query: text,
                k,
            })
            .send()
            .await
            .map_err(|e| AppError::Internal {
                message: format!("vector index request failed: {}", e.without_url()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal {
                message: format!(
                    "vector index error {}: {}",
                    status,
                    body.chars().take(300).collect::<String>()
                ),
            });
        }

        let parsed: QueryResponse = response.json().await.map_err(|e| AppError::Internal {
            message: format!("Failed to parse vector index response: {}", e),
        })?;

        Ok(parsed
            .relevant_docs
            .into_iter()
            .map(RetrievedChunk::from)
            // Empty chunks carry nothing to cite
            .filter(|chunk| !chunk.content.trim().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joins_cleanly() {
        let index = HttpVectorIndex::new(
            reqwest::Client::new(),
            &IndexConfig {
                base_url: "http://rag:5001/".into(),
                query_path: "/query_rag_documents".into(),
            },
        );
        assert_eq!(index.url, "http://rag:5001/query_rag_documents");
    }

    #[test]
    fn test_response_mapping() {
        let parsed: QueryResponse = serde_json::from_value(json!({
            "relevantDocs": [
                { "documentName": "Lecture 3.pdf", "score": 0.82, "content": "Gradients flow backwards", "serverFilename": "1700_lecture3.pdf" },
                { "documentName": "Notes.md", "score": 0.5, "content": "Chain rule" }
            ],
            "status": "success"
        }))
        .unwrap();

        let chunks: Vec<RetrievedChunk> = parsed.relevant_docs.into_iter().map(RetrievedChunk::from).collect();

        assert_eq!(chunks[0].source_id, "1700_lecture3.pdf");
        assert_eq!(chunks[0].document_name, "Lecture 3.pdf");
        assert_eq!(chunks[1].source_id, "Notes.md");
        assert_eq!(chunks[1].score, 0.5);
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(QueryRequest {
            user_id: "u1",
            query: "backprop",
            k: 5,
        })
        .unwrap();
        assert_eq!(body, json!({ "user_id": "u1", "query": "backprop", "k": 5 }));
    }
}
