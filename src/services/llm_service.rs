//! LLM 服务 - 业务能力层
//!
//! 只负责"给定提示词生成文本"，不关心是哪一个生成阶段
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 SiliconFlow, DeepSeek 等）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::LlmSettings;
use crate::error::LlmError;
use crate::models::Phase;

/// 一次生成请求
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub phase: Phase,
    pub system: Option<String>,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// 文本生成能力
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

/// 基于 OpenAI 兼容接口的生成器
///
/// 网络错误在客户端内部重试，重试用尽后才向上返回错误。
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(settings: &LlmSettings) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: settings.model_name.clone(),
            max_retries: settings.max_retries.max(1),
        }
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = &request.system {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg.as_str())
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user.as_str())
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        debug!(
            "调用 LLM API，模型: {}，阶段: {}，提示词长度: {} 字符",
            self.model_name,
            request.phase,
            request.user.chars().count()
        );

        let mut attempt = 1;
        loop {
            match self.send_once(request).await {
                Ok(content) => {
                    debug!("LLM API 调用成功");
                    return Ok(content);
                }
                Err(LlmError::ApiCallFailed { model, message }) if attempt < self.max_retries => {
                    let backoff = Duration::from_secs(2u64.pow(attempt).min(10));
                    warn!(
                        "LLM API 调用失败 (模型: {}，第 {}/{} 次): {}，{} 秒后重试",
                        model,
                        attempt,
                        self.max_retries,
                        message,
                        backoff.as_secs()
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("LLM API 调用失败: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
