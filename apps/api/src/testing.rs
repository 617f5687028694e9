//! Test doubles shared by the unit tests: a scripted AI capability, an
//! in-memory file store, and fixtures.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::ingestion::progress::IngestionRegistry;
use crate::llm_client::capability::{AiCapability, ExtractionOutcome, InvokeOptions};
use crate::llm_client::LlmError;
use crate::models::question::{Difficulty, NewQuestion, QuestionRow, QuestionType};
use crate::models::resume::{NewResume, ParsingStatus, ResumeRow};
use crate::models::session::{NewSession, SessionRow};
use crate::results::aggregator::ResultsSummary;
use crate::results::cache::SummaryCache;
use crate::state::AppState;
use crate::storage::{object_key, DocumentKind, FileStorage, IncomingFile, UploadedDocument};
use crate::store::memory::MemoryStore;
use crate::store::EntityStore;

/// AI capability whose answers are queued up front. An empty queue answers
/// with `LlmError::EmptyContent`.
#[derive(Default)]
pub struct MockAi {
    extractions: Mutex<VecDeque<Result<ExtractionOutcome, LlmError>>>,
    generations: Mutex<VecDeque<Result<Value, LlmError>>>,
    scores: Mutex<VecDeque<Result<Value, LlmError>>>,
    pub prompts: Mutex<Vec<String>>,
    pub generate_options: Mutex<Vec<InvokeOptions>>,
}

impl MockAi {
    pub fn push_extraction(&self, outcome: Result<ExtractionOutcome, LlmError>) {
        self.extractions.lock().unwrap().push_back(outcome);
    }

    pub fn push_generation(&self, output: Result<Value, LlmError>) {
        self.generations.lock().unwrap().push_back(output);
    }

    pub fn push_score(&self, output: Result<Value, LlmError>) {
        self.scores.lock().unwrap().push_back(output);
    }

    pub fn score_calls_remaining(&self) -> usize {
        self.scores.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AiCapability for MockAi {
    async fn extract(
        &self,
        _document: &UploadedDocument,
        _schema: &Value,
    ) -> Result<ExtractionOutcome, LlmError> {
        self.extractions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }

    async fn generate(
        &self,
        prompt: &str,
        _schema: &Value,
        options: &InvokeOptions,
    ) -> Result<Value, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.generate_options.lock().unwrap().push(*options);
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }

    async fn score(&self, prompt: &str, _schema: &Value) -> Result<Value, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.scores
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

#[derive(Default)]
pub struct MemoryFileStorage {
    fail: bool,
    uploads: Mutex<Vec<String>>,
}

impl MemoryFileStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn upload(
        &self,
        file: &IncomingFile,
        kind: DocumentKind,
    ) -> Result<UploadedDocument, AppError> {
        if self.fail {
            return Err(AppError::S3("bucket unavailable".to_string()));
        }
        let key = object_key(Uuid::new_v4(), &file.file_name);
        self.uploads.lock().unwrap().push(key.clone());
        Ok(UploadedDocument {
            file_url: format!("http://localhost:9000/test-bucket/{key}"),
            file_name: file.file_name.clone(),
            kind,
            bytes: file.bytes.clone(),
        })
    }
}

/// Summary cache backed by a map. `failing()` errors on every call.
#[derive(Default)]
pub struct MemorySummaryCache {
    fail: bool,
    entries: Mutex<HashMap<Uuid, ResultsSummary>>,
}

impl MemorySummaryCache {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl SummaryCache for MemorySummaryCache {
    async fn get(&self, session_id: Uuid) -> anyhow::Result<Option<ResultsSummary>> {
        if self.fail {
            anyhow::bail!("cache unavailable");
        }
        Ok(self.entries.lock().unwrap().get(&session_id).cloned())
    }

    async fn put(&self, summary: &ResultsSummary) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("cache unavailable");
        }
        self.entries
            .lock()
            .unwrap()
            .insert(summary.session_id, summary.clone());
        Ok(())
    }
}

pub fn pdf_file(name: &str) -> IncomingFile {
    IncomingFile {
        file_name: name.to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: Bytes::from_static(b"%PDF-1.4 test document"),
    }
}

/// Extraction output for a well-formed résumé.
pub fn sample_extraction() -> Value {
    json!({
        "candidate_name": "Jane Doe",
        "email": "jane@example.com",
        "phone": "987-654-3210",
        "skills": ["Python", "Data Analysis"],
        "experience_years": 3,
        "education": [
            {"degree": "M.S. Data Science", "institution": "Data University", "year": "2020"}
        ],
        "work_experience": [
            {"company": "Data Corp", "position": "Analyst", "duration": "2020-2023"}
        ],
        "ats_score": 92,
        "recommended_domain": "Data Science"
    })
}

/// A valid five-question generation payload.
pub fn question_set() -> Value {
    json!({
        "questions": [
            {"question": "Explain the bias-variance tradeoff.", "type": "technical", "difficulty": "medium"},
            {"question": "How would you detect data leakage in a pipeline?", "type": "technical", "difficulty": "hard"},
            {"question": "Tell me about a time you disagreed with a stakeholder.", "type": "behavioral", "difficulty": "easy"},
            {"question": "Describe a project you are proud of.", "type": "behavioral", "difficulty": "medium"},
            {"question": "Your model degrades in production overnight. What do you do?", "type": "situational", "difficulty": "hard"}
        ]
    })
}

pub fn new_resume(experience_years: Option<i32>) -> NewResume {
    NewResume {
        candidate_name: "Jane Doe".to_string(),
        email: Some("jane@example.com".to_string()),
        phone: None,
        skills: vec!["Python".to_string(), "Data Analysis".to_string()],
        experience_years,
        education: vec![],
        work_experience: vec![],
        ats_score: 92,
        recommended_domain: Some("Data Science".to_string()),
        parsing_status: ParsingStatus::Completed,
        file_url: "http://localhost:9000/test-bucket/resumes/x/jane.pdf".to_string(),
    }
}

pub async fn seed_resume(store: &MemoryStore) -> ResumeRow {
    store.create_resume(new_resume(Some(3))).await.unwrap()
}

/// Seeds a scheduled session whose questions have the given types, in order.
pub async fn seed_session(
    store: &MemoryStore,
    types: &[QuestionType],
) -> (SessionRow, Vec<QuestionRow>) {
    let resume = seed_resume(store).await;
    let questions = types
        .iter()
        .enumerate()
        .map(|(i, t)| NewQuestion {
            question: format!("Question {}", i + 1),
            question_type: *t,
            difficulty: Difficulty::Medium,
        })
        .collect();
    store
        .create_session_with_questions(
            NewSession {
                resume_id: resume.id,
                target_role: "Data Scientist".to_string(),
            },
            questions,
        )
        .await
        .unwrap()
}

/// Five questions: two technical, two behavioral, one situational.
pub const STANDARD_TYPES: [QuestionType; 5] = [
    QuestionType::Technical,
    QuestionType::Technical,
    QuestionType::Behavioral,
    QuestionType::Behavioral,
    QuestionType::Situational,
];

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/interviewai_test".to_string(),
        redis_url: "redis://localhost:6379".to_string(),
        s3_bucket: "test-bucket".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: "test".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        max_upload_bytes: 1024 * 1024,
        session_ttl_minutes: 120,
        session_sweep_interval_secs: 300,
        question_web_context: false,
    }
}

/// An `AppState` wired to in-memory backends, with handles kept for
/// scripting and inspection.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub ai: Arc<MockAi>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let ai = Arc::new(MockAi::default());
        let state = AppState {
            store: store.clone(),
            storage: Arc::new(MemoryFileStorage::default()),
            ai: ai.clone(),
            summaries: Arc::new(MemorySummaryCache::default()),
            ingestions: IngestionRegistry::default(),
            config: test_config(),
        };
        Self { state, store, ai }
    }
}
