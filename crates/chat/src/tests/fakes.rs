//! Recording stand-ins for the completion service and the corpus.

use async_trait::async_trait;
use chrono::Utc;
use docchat_core::{AppError, AppResult};
use docchat_knowledge::{CorpusListing, DocumentEntry, RetrievedChunk, SimilarityRetriever};
use docchat_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::Mutex;

/// Marker present only in the built-in summary template.
pub const SUMMARY_MARKER: &str = "generate a query that extends the question";

/// Completion client answering summary and answer prompts with canned text.
pub struct FakeClient {
    pub summary: String,
    pub answer: String,
    pub fail: bool,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl FakeClient {
    pub fn new(summary: &str, answer: &str) -> Self {
        Self {
            summary: summary.to_string(),
            answer: answer.to_string(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("", "")
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn summary_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.prompt.contains(SUMMARY_MARKER))
            .count()
    }

    pub fn answer_requests(&self) -> Vec<LlmRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.prompt.contains(SUMMARY_MARKER))
            .collect()
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(AppError::Llm("service unavailable".to_string()));
        }

        let content = if request.prompt.contains(SUMMARY_MARKER) {
            self.summary.clone()
        } else {
            self.answer.clone()
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}

/// Retriever returning fixed chunks and recording its queries.
pub struct FakeRetriever {
    pub chunks: Vec<RetrievedChunk>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl FakeRetriever {
    pub fn new(texts: &[&str]) -> Self {
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, text)| RetrievedChunk {
                text: text.to_string(),
                source_path: format!("doc{}.md", i),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect();

        Self {
            chunks,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SimilarityRetriever for FakeRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        self.calls.lock().unwrap().push((query.to_string(), top_k));
        Ok(self.chunks.clone())
    }
}

/// Listing with a fixed set of documents.
pub struct FakeListing(pub Vec<&'static str>);

impl CorpusListing for FakeListing {
    fn list_documents(&self) -> AppResult<Vec<DocumentEntry>> {
        Ok(self
            .0
            .iter()
            .map(|path| DocumentEntry {
                relative_path: path.to_string(),
                size_bytes: 10,
                chunk_count: 1,
                ingested_at: Utc::now(),
            })
            .collect())
    }
}
