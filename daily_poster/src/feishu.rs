use reqwest::{
    header::{HeaderValue, CONTENT_TYPE},
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_FEISHU_BASE_URL: &str = "https://open.feishu.cn";

#[derive(Debug, Error)]
pub enum FeishuError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feishu API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    image_key: Option<String>,
}

fn check(code: i64, msg: String) -> Result<(), FeishuError> {
    if code == 0 {
        Ok(())
    } else {
        Err(FeishuError::Api { code, msg })
    }
}

/// Thin client for the Feishu open platform endpoints the poster uses.
#[derive(Clone)]
pub struct FeishuClient {
    client: Client,
    base_url: String,
}

impl FeishuClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn tenant_access_token(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<String, FeishuError> {
        let res: TokenResponse = self
            .client
            .post(self.endpoint("/open-apis/auth/v3/tenant_access_token/internal"))
            .json(&json!({ "app_id": app_id, "app_secret": app_secret }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        check(res.code, res.msg)?;
        let token = res
            .tenant_access_token
            .ok_or(FeishuError::MissingField("tenant_access_token"))?;
        info!("obtained tenant access token");
        Ok(token)
    }

    /// Downloads `image_url` and uploads the bytes as a message image.
    /// Returns the image key.
    pub async fn upload_image_from_url(
        &self,
        token: &str,
        image_url: &str,
    ) -> Result<String, FeishuError> {
        debug!(%image_url, "downloading image");
        let bytes = self
            .client
            .get(image_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        self.upload_image(token, bytes.to_vec()).await
    }

    pub async fn upload_image(&self, token: &str, image: Vec<u8>) -> Result<String, FeishuError> {
        let form = Form::new().text("image_type", "message").part(
            "image",
            Part::bytes(image)
                .file_name("image.png")
                .mime_str("image/png")?,
        );

        let res: ApiResponse<ImageData> = self
            .client
            .post(self.endpoint("/open-apis/im/v1/images"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        check(res.code, res.msg)?;
        let key = res
            .data
            .and_then(|d| d.image_key)
            .ok_or(FeishuError::MissingField("data.image_key"))?;
        info!(image_key = %key, "uploaded image");
        Ok(key)
    }

    /// Sends an interactive card to a group chat.
    pub async fn send_card(
        &self,
        token: &str,
        chat_id: &str,
        card: &Value,
    ) -> Result<(), FeishuError> {
        let body = json!({
            "receive_id": chat_id,
            "msg_type": "interactive",
            "content": card.to_string(),
        });

        let res = self
            .client
            .post(self.endpoint("/open-apis/im/v1/messages"))
            .query(&[("receive_id_type", "chat_id")])
            .bearer_auth(token)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            )
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let reply: ApiResponse<Value> = res.json().await?;
        debug!(%status, code = reply.code, msg = %reply.msg, "message response");
        check(reply.code, reply.msg)?;
        if !status.is_success() {
            return Err(FeishuError::Api {
                code: i64::from(status.as_u16()),
                msg: format!("HTTP {status}"),
            });
        }

        info!(%chat_id, "card sent");
        Ok(())
    }
}
