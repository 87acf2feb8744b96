//! 浏览器抓取（主来源）- 基础设施层
//!
//! 浏览器会话是稀缺且有状态的资源：每篇论文最多打开一次，
//! 在这篇论文的获取阶段结束时必须释放，不论成功还是失败。

pub mod headless;
pub mod session;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::models::{DataKind, PaperId, Payload};

pub use headless::ChromeLauncher;
pub use session::ChromeSession;

/// 一个已打开的浏览器会话
#[async_trait]
pub trait BrowserSession: Send {
    /// 抓取单个数据项
    async fn fetch(&mut self, paper_id: &PaperId, kind: DataKind) -> Result<Payload, FetchError>;

    /// 关闭会话，重复调用无副作用
    async fn close(&mut self) -> Result<(), FetchError>;
}

/// 负责打开浏览器会话
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

/// 单篇论文获取阶段内的浏览器租约
///
/// 第一次真正需要浏览器时才打开；`release` 关闭已打开的会话。
/// 启动失败会被记住，同一篇论文内不会反复尝试启动。
pub struct BrowserLease<'a> {
    launcher: &'a dyn BrowserLauncher,
    session: Option<Box<dyn BrowserSession>>,
    launch_error: Option<String>,
}

impl<'a> BrowserLease<'a> {
    pub fn new(launcher: &'a dyn BrowserLauncher) -> Self {
        Self {
            launcher,
            session: None,
            launch_error: None,
        }
    }

    /// 获取会话，必要时打开浏览器
    pub async fn session(&mut self) -> Result<&mut Box<dyn BrowserSession>, FetchError> {
        if let Some(message) = &self.launch_error {
            return Err(FetchError::Browser(message.clone()));
        }

        let session = match self.session.take() {
            Some(session) => session,
            None => {
                debug!("打开浏览器会话");
                match self.launcher.open().await {
                    Ok(session) => session,
                    Err(e) => {
                        self.launch_error = Some(e.to_string());
                        return Err(e);
                    }
                }
            }
        };

        Ok(self.session.insert(session))
    }

    /// 释放会话
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            debug!("关闭浏览器会话");
            if let Err(e) = session.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
        }
    }
}
