use std::path::Path;

use async_trait::async_trait;
use rand::Rng;
use series_scraper::{
    ai::{fallback_description, sanitize_markdown, DescriptionGenerator},
    scraper::series_url,
    table::{self, Candidate},
    AiError, TableError,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    card::series_card,
    config::Config,
    feishu::{FeishuClient, FeishuError},
    selector::{select_unsent, Selection},
    sent_log::{SentLog, SentLogError},
};

/// Writes the body text for a series.
#[async_trait]
pub trait Describer: Send + Sync {
    async fn describe(&self, series_name: &str) -> Result<String, AiError>;
}

#[async_trait]
impl Describer for DescriptionGenerator {
    async fn describe(&self, series_name: &str) -> Result<String, AiError> {
        self.generate(series_name).await
    }
}

/// The chat backend: authentication, image hosting and delivery.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn access_token(&self) -> Result<String, FeishuError>;
    async fn upload_image(&self, token: &str, image_url: &str) -> Result<String, FeishuError>;
    async fn dispatch(&self, token: &str, card: &Value) -> Result<(), FeishuError>;
}

pub struct FeishuMessenger {
    client: FeishuClient,
    app_id: String,
    app_secret: String,
    chat_id: String,
}

impl FeishuMessenger {
    pub fn new(client: FeishuClient, config: &Config) -> Self {
        Self {
            client,
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl Messenger for FeishuMessenger {
    async fn access_token(&self) -> Result<String, FeishuError> {
        self.client
            .tenant_access_token(&self.app_id, &self.app_secret)
            .await
    }

    async fn upload_image(&self, token: &str, image_url: &str) -> Result<String, FeishuError> {
        self.client.upload_image_from_url(token, image_url).await
    }

    async fn dispatch(&self, token: &str, card: &Value) -> Result<(), FeishuError> {
        self.client.send_card(token, &self.chat_id, card).await
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load candidate table: {0}")]
    Table(#[from] TableError),

    #[error("failed to load sent log: {0}")]
    SentLog(#[from] SentLogError),

    #[error("failed to obtain access token: {0}")]
    Token(#[source] FeishuError),

    #[error("failed to upload image: {0}")]
    Upload(#[source] FeishuError),

    #[error("failed to dispatch message: {0}")]
    Dispatch(#[source] FeishuError),

    #[error("series {id} was posted but could not be recorded: {source}")]
    Record {
        id: String,
        #[source]
        source: SentLogError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing left to post.
    Exhausted,
    Posted { id: String },
}

/// One daily run: pick an unsent series, post it, then record it.
pub struct Poster<'a> {
    describer: &'a dyn Describer,
    messenger: &'a dyn Messenger,
    series_base_url: &'a str,
}

impl<'a> Poster<'a> {
    pub fn new(
        describer: &'a dyn Describer,
        messenger: &'a dyn Messenger,
        series_base_url: &'a str,
    ) -> Self {
        Self {
            describer,
            messenger,
            series_base_url,
        }
    }

    /// The sent log is only written after the backend confirms delivery, so
    /// any failure before that leaves the series eligible for the next run.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        table_path: &Path,
        sent_log_path: &Path,
        rng: &mut R,
    ) -> Result<RunOutcome, PipelineError> {
        let mut sent = SentLog::load(sent_log_path)?;
        info!(sent = sent.len(), path = %sent.path().display(), "loaded sent log");

        let candidates = table::read_candidates(table_path)?;
        let candidate = match select_unsent(candidates, &sent, rng) {
            Selection::Picked(candidate) => candidate,
            Selection::Exhausted => {
                info!("every series has already been posted");
                return Ok(RunOutcome::Exhausted);
            }
        };

        self.post(&candidate).await?;

        sent.record(&candidate.id)
            .map_err(|source| PipelineError::Record {
                id: candidate.id.clone(),
                source,
            })?;
        Ok(RunOutcome::Posted { id: candidate.id })
    }

    async fn post(&self, candidate: &Candidate) -> Result<(), PipelineError> {
        let token = self
            .messenger
            .access_token()
            .await
            .map_err(PipelineError::Token)?;

        let description = self.description(&candidate.name).await;

        let image_key = self
            .messenger
            .upload_image(&token, &candidate.image_url)
            .await
            .map_err(PipelineError::Upload)?;

        let link = series_url(self.series_base_url, &candidate.id);
        info!(%link, "series detail link");
        let card = series_card(&candidate.name, &image_key, &link, &description);

        self.messenger
            .dispatch(&token, &card)
            .await
            .map_err(PipelineError::Dispatch)?;

        info!(id = %candidate.id, name = %candidate.name, "series posted");
        Ok(())
    }

    /// Generated text, sanitized for the card renderer. Falls back to a fixed
    /// template when generation fails.
    async fn description(&self, series_name: &str) -> String {
        match self.describer.describe(series_name).await {
            Ok(text) => sanitize_markdown(&text),
            Err(e) => {
                warn!(series = %series_name, error = %e, "description generation failed, using fallback");
                fallback_description(series_name)
            }
        }
    }
}
