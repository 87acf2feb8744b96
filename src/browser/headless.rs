use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::session::ChromeSession;
use super::{BrowserLauncher, BrowserSession};
use crate::config::{ArxivSettings, BrowserSettings, PapersCoolSettings};
use crate::error::FetchError;

/// 启动无头 Chromium 的会话工厂
pub struct ChromeLauncher {
    browser: BrowserSettings,
    arxiv: ArxivSettings,
    papers_cool: PapersCoolSettings,
    request_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(
        browser: BrowserSettings,
        arxiv: ArxivSettings,
        papers_cool: PapersCoolSettings,
        request_timeout: Duration,
    ) -> Self {
        Self {
            browser,
            arxiv,
            papers_cool,
            request_timeout,
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, FetchError> {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--no-first-run".to_string(),
            "--disable-extensions".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-sync".to_string(),
            "--mute-audio".to_string(),
            "--ignore-certificate-errors".to_string(),
            format!("--user-agent={}", self.browser.user_agent),
        ];
        if !self.browser.proxy.is_empty() {
            args.push(format!("--proxy-server={}", self.browser.proxy));
        }

        let mut builder = BrowserConfig::builder()
            .request_timeout(self.request_timeout)
            .args(args);
        builder = if self.browser.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(executable) = &self.browser.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(|e| {
            error!("配置无头浏览器失败: {}", e);
            FetchError::Browser(format!("配置无头浏览器失败: {}", e))
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        if !self.browser.enabled {
            return Err(FetchError::Browser("浏览器已在配置中禁用".to_string()));
        }

        info!("🚀 启动无头浏览器...");
        let config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动无头浏览器失败: {}", e);
            FetchError::Browser(format!("启动无头浏览器失败: {}", e))
        })?;
        debug!("无头浏览器启动成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        Ok(Box::new(ChromeSession::new(
            browser,
            handler_task,
            self.arxiv.clone(),
            self.papers_cool.clone(),
            Duration::from_millis(self.browser.kimi_wait_millis),
        )))
    }
}
