use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub address: String,
    pub secure: bool,
    pub client_name: String,
    pub client_version: String,
    pub namespace: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Title,
    DocTranslate,
}

#[derive(Debug, Clone)]
pub struct TranslateParams {
    pub job_id: String,
    pub namespace: String,
    pub primitive: Primitive,
    pub source: String,
    pub template_helper: Option<String>,
    pub src: String,
    pub tgt: String,
    pub wiki_uri: String,
    pub page_id: String,
    pub page_slug: String,
}

#[derive(Debug, Clone)]
pub struct CheckTitleResult {
    pub ready: bool,
    pub message: String,
    pub eta_seconds: u32,
}

#[derive(Debug, Clone)]
pub struct TranslateOutcome {
    pub success: bool,
    pub translated_title: String,
    pub translated_markdown: String,
    pub tokens_used: u64,
    pub inference_seconds: f64,
    pub error: Option<String>,
}
