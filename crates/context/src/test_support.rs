//! In-memory fakes for the provider and vector index seams

use crate::providers::{LlmProvider, ProviderRequest, ProviderResult};
use crate::retrieval::VectorIndex;
use ragforge_common::errors::{AppError, Result};
use ragforge_common::models::{ApiKeys, ProviderKind, RetrievedChunk, Task};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn chunk(content: &str, document: &str, score: f32) -> RetrievedChunk {
    RetrievedChunk {
        source_id: format!("{}.pdf", document),
        content: content.to_string(),
        score,
        document_name: document.to_string(),
    }
}

type ErrorFactory = Arc<dyn Fn(ProviderKind) -> AppError + Send + Sync>;

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail(ErrorFactory),
}

/// Scripted provider that records every request it receives
pub struct FakeProvider {
    kind: ProviderKind,
    default_reply: Reply,
    replies: HashMap<Task, Reply>,
    delay: Option<Duration>,
    requires_key: bool,
    calls: Mutex<Vec<ProviderRequest>>,
}

impl FakeProvider {
    pub fn replying(kind: ProviderKind, text: &str) -> Self {
        Self {
            kind,
            default_reply: Reply::Text(text.to_string()),
            replies: HashMap::new(),
            delay: None,
            requires_key: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, task: Task, text: &str) -> Self {
        self.replies.insert(task, Reply::Text(text.to_string()));
        self
    }

    pub fn with_failure(mut self, task: Task, make: impl Fn(ProviderKind) -> AppError + Send + Sync + 'static) -> Self {
        self.replies.insert(task, Reply::Fail(Arc::new(make)));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject requests that carry no key for this provider
    pub fn requiring_key(mut self) -> Self {
        self.requires_key = true;
        self
    }

    pub fn calls(&self) -> Vec<ProviderRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, task: Task) -> Vec<ProviderRequest> {
        self.calls().into_iter().filter(|r| r.task == task).collect()
    }

    fn check_key(&self, credentials: &ApiKeys) -> Result<()> {
        if self.requires_key && credentials.for_provider(self.kind).is_none() {
            return Err(AppError::MissingCredential { provider: self.kind });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LlmProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn preflight(&self, credentials: &ApiKeys) -> Result<()> {
        self.check_key(credentials)
    }

    async fn dispatch(&self, request: &ProviderRequest) -> Result<ProviderResult> {
        self.check_key(&request.credentials)?;
        self.calls.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.get(&request.task).unwrap_or(&self.default_reply).clone();
        match reply {
            Reply::Text(text) => Ok(ProviderResult {
                raw_text: text,
                model: request.model.clone().unwrap_or_else(|| "fake-model".to_string()),
            }),
            Reply::Fail(make) => Err(make(self.kind)),
        }
    }
}

/// Vector index answering from a fixed table keyed by query text
#[derive(Default)]
pub struct FakeIndex {
    results: HashMap<String, Vec<RetrievedChunk>>,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, String, usize)>>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, chunks: Vec<RetrievedChunk>) -> Self {
        self.results.insert(query.to_string(), chunks);
        self
    }

    pub fn with_failure(mut self, query: &str) -> Self {
        self.failures.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// `(user_id, query, k)` per lookup, in call order
    pub fn calls(&self) -> Vec<(String, String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queried_texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = self.calls().into_iter().map(|(_, text, _)| text).collect();
        texts.sort();
        texts
    }
}

#[async_trait::async_trait]
impl VectorIndex for FakeIndex {
    async fn query(&self, user_id: &str, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string(), k));

        if let Some(delay) = self.delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        if self.failures.contains(text) {
            return Err(AppError::Internal {
                message: format!("index unavailable for '{}'", text),
            });
        }

        Ok(self
            .results
            .get(text)
            .map(|chunks| chunks.iter().take(k).cloned().collect())
            .unwrap_or_default())
    }
}

/// Serve one canned HTTP response on a local port and return its base URL.
/// The full request is read before answering.
pub async fn serve_once(status: u16, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{}", addr)
}

async fn read_request(socket: &mut TcpStream) {
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        received.extend_from_slice(&buf[..n]);

        let Some(head_end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..head_end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= head_end + 4 + body_len {
            return;
        }
    }
}
