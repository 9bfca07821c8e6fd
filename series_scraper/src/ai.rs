use crate::AiError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";

static HEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#+)([^\s#])").expect("static pattern"));
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([*-])(\S)").expect("static pattern"));

/// Inserts the space the card renderer needs after line-leading `#`, `*` and
/// `-` markers. Applying it twice is the same as applying it once.
pub fn sanitize_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = HEADING_MARKER.replace_all(text, "$1 $2");
    LIST_MARKER.replace_all(&text, "$1 $2").into_owned()
}

/// Text posted when generation fails.
pub fn fallback_description(series_name: &str) -> String {
    format!("**车系介绍**\n检测到新车系 **{series_name}**，请相关同事关注。")
}

fn prompt(series_name: &str) -> String {
    format!(
        "请你作为一位专业的汽车评论员，详细介绍一下“{series_name}”这个车系。\
         请从以下几个方面展开，并使用段落组织语言:\n\
         1. 品牌背景和车系历史\n\
         2. 外观设计和内饰特点\n\
         3. 动力系统和性能表现\n\
         4. 主要的科技配置和安全功能\n\
         5. 市场定位、主要竞争对手和目标用户群体。\n\
         请用流畅、吸引人的语言进行描述，分段清晰，且不要在回复的开头和结尾添加任何```markdown或```标记。"
    )
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini client that writes a review-style introduction of a car series,
/// grounded with Google Search.
pub struct DescriptionGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DescriptionGenerator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Raw generated text, trimmed. Not sanitized.
    pub async fn generate(&self, series_name: &str) -> Result<String, AiError> {
        info!(series = %series_name, model = %self.model, "generating description");

        let payload = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt(series_name) }]
                }
            ],
            "tools": [{ "google_search": {} }]
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status { status, body });
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        debug!(chars = text.chars().count(), "description generated");
        Ok(text.to_string())
    }
}
