//! 数据项获取 - 流程层
//!
//! 决策顺序：
//! 1. 缓存命中 → 直接返回（`--force` 跳过这一步）
//! 2. 浏览器抓取（主来源）
//! 3. 主来源失败且灵活模式允许 → 回退 API
//!
//! `--no-download` 只走第 1 步，未命中即失败，不碰网络和浏览器。

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::FallbackApi;
use crate::browser::{BrowserLauncher, BrowserLease};
use crate::cache::CacheStore;
use crate::config::{FlexModePolicy, RunOptions};
use crate::models::{AcquisitionResult, DataKind, FailureReason, PaperId, Payload, SourceKind};

/// 主来源这次尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryOutcome {
    Succeeded,
    Failed,
}

/// 主来源尝试之后的下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStep {
    /// 接受主来源的结果
    Accept,
    /// 改用回退 API
    TryFallback,
    /// 直接失败
    HardFail,
}

/// 回退决策表
pub fn next_step(kind: DataKind, policy: &FlexModePolicy, outcome: PrimaryOutcome) -> ResolveStep {
    match outcome {
        PrimaryOutcome::Succeeded => ResolveStep::Accept,
        PrimaryOutcome::Failed if policy.allows_fallback(kind) => ResolveStep::TryFallback,
        PrimaryOutcome::Failed => ResolveStep::HardFail,
    }
}

/// 单篇论文的数据获取器
///
/// 持有这篇论文的浏览器租约，用完后必须调用 `release`。
pub struct SourceResolver<'a> {
    cache: &'a CacheStore,
    lease: BrowserLease<'a>,
    fallback: &'a dyn FallbackApi,
    policy: FlexModePolicy,
    options: RunOptions,
    timeout: Duration,
}

impl<'a> SourceResolver<'a> {
    pub fn new(
        cache: &'a CacheStore,
        launcher: &'a dyn BrowserLauncher,
        fallback: &'a dyn FallbackApi,
        policy: FlexModePolicy,
        options: RunOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            lease: BrowserLease::new(launcher),
            fallback,
            policy,
            options,
            timeout,
        }
    }

    /// 获取一个数据项
    pub async fn resolve(&mut self, paper_id: &PaperId, kind: DataKind) -> AcquisitionResult {
        if self.options.no_download {
            return match self.peek(paper_id, kind) {
                Some(hit) => hit,
                None => {
                    info!("[论文 {}] 缓存中没有 {}（--no-download）", paper_id, kind);
                    AcquisitionResult::Failure {
                        source: SourceKind::None,
                        reason: FailureReason::CacheMiss,
                    }
                }
            };
        }

        if !self.options.force {
            if let Some(hit) = self.peek(paper_id, kind) {
                return hit;
            }
        }

        let primary_reason = match self.try_primary(paper_id, kind).await {
            Ok(payload) => {
                info!("[论文 {}] ✓ 浏览器获取 {} 成功", paper_id, kind);
                return self.accept(paper_id, kind, SourceKind::BrowserScraper, payload);
            }
            Err(reason) => reason,
        };

        match next_step(kind, &self.policy, PrimaryOutcome::Failed) {
            ResolveStep::TryFallback => {
                warn!(
                    "[论文 {}] ⚠️ 浏览器获取 {} 失败: {}，改用回退 API",
                    paper_id, kind, primary_reason
                );
                self.try_fallback(paper_id, kind, primary_reason).await
            }
            ResolveStep::Accept | ResolveStep::HardFail => {
                warn!("[论文 {}] ✗ 浏览器获取 {} 失败: {}", paper_id, kind, primary_reason);
                AcquisitionResult::Failure {
                    source: SourceKind::BrowserScraper,
                    reason: primary_reason,
                }
            }
        }
    }

    /// 只查缓存，读错误按未命中处理
    pub fn peek(&self, paper_id: &PaperId, kind: DataKind) -> Option<AcquisitionResult> {
        match self.cache.get(paper_id, kind.stage(), None) {
            Ok(Some(entry)) => match entry.payload.check_for(kind) {
                Ok(()) => {
                    debug!("[论文 {}] 缓存命中: {} ({})", paper_id, kind, entry.source);
                    Some(AcquisitionResult::Success {
                        source: SourceKind::CacheDerived,
                        payload: entry.payload,
                        fetched_at: entry.fetched_at,
                    })
                }
                Err(reason) => {
                    warn!("[论文 {}] 忽略无效的缓存条目 {}: {}", paper_id, kind, reason);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("[论文 {}] 读取缓存失败，按未命中处理: {}", paper_id, e);
                None
            }
        }
    }

    /// 关闭这篇论文用过的浏览器
    pub async fn release(self) {
        self.lease.release().await;
    }

    async fn try_primary(
        &mut self,
        paper_id: &PaperId,
        kind: DataKind,
    ) -> Result<Payload, FailureReason> {
        let timeout = self.timeout;
        let session = self.lease.session().await?;
        let payload = tokio::time::timeout(timeout, session.fetch(paper_id, kind))
            .await
            .map_err(|_| FailureReason::Timeout)??;
        payload.check_for(kind)?;
        Ok(payload)
    }

    async fn try_fallback(
        &self,
        paper_id: &PaperId,
        kind: DataKind,
        primary_reason: FailureReason,
    ) -> AcquisitionResult {
        if !self.policy.allows_fallback(kind) {
            return AcquisitionResult::Failure {
                source: SourceKind::FallbackApi,
                reason: FailureReason::PolicyViolation,
            };
        }

        let fetch = self.fallback.fetch(paper_id, kind);
        let attempt = match tokio::time::timeout(self.timeout, fetch).await {
            Err(_) => Err(FailureReason::Timeout),
            Ok(Err(e)) => Err(FailureReason::from(e)),
            Ok(Ok(payload)) => payload.check_for(kind).map(|()| payload),
        };

        match attempt {
            Ok(payload) => {
                info!("[论文 {}] ✓ 回退 API 获取 {} 成功", paper_id, kind);
                self.accept(paper_id, kind, SourceKind::FallbackApi, payload)
            }
            Err(fallback_reason) => {
                warn!("[论文 {}] ✗ 回退 API 获取 {} 失败: {}", paper_id, kind, fallback_reason);
                AcquisitionResult::Failure {
                    source: SourceKind::FallbackApi,
                    reason: FailureReason::FallbackExhausted {
                        primary: Box::new(primary_reason),
                        fallback: Box::new(fallback_reason),
                    },
                }
            }
        }
    }

    /// 写缓存并返回成功结果；写失败只记录日志
    fn accept(
        &self,
        paper_id: &PaperId,
        kind: DataKind,
        source: SourceKind,
        payload: Payload,
    ) -> AcquisitionResult {
        match self.cache.put(paper_id, kind.stage(), source, payload.clone()) {
            Ok(entry) => AcquisitionResult::Success {
                source,
                payload: entry.payload,
                fetched_at: entry.fetched_at,
            },
            Err(e) => {
                warn!("[论文 {}] 写入缓存失败: {}", paper_id, e);
                AcquisitionResult::Success {
                    source,
                    payload,
                    fetched_at: Utc::now(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(enabled: bool, arxiv_api: bool, papers_cool_api: bool) -> FlexModePolicy {
        FlexModePolicy {
            enabled,
            arxiv_api,
            papers_cool_api,
        }
    }

    #[test]
    fn test_success_is_always_accepted() {
        for kind in [DataKind::Metadata, DataKind::KimiSummary] {
            assert_eq!(
                next_step(kind, &policy(false, false, false), PrimaryOutcome::Succeeded),
                ResolveStep::Accept
            );
        }
    }

    #[test]
    fn test_flex_disabled_never_falls_back() {
        let p = policy(false, true, true);
        for kind in [DataKind::Metadata, DataKind::KimiSummary] {
            assert_eq!(next_step(kind, &p, PrimaryOutcome::Failed), ResolveStep::HardFail);
        }
    }

    #[test]
    fn test_per_kind_flags() {
        let failed = PrimaryOutcome::Failed;

        let p = policy(true, true, false);
        assert_eq!(next_step(DataKind::Metadata, &p, failed), ResolveStep::TryFallback);
        assert_eq!(next_step(DataKind::KimiSummary, &p, failed), ResolveStep::HardFail);

        let p = policy(true, false, true);
        assert_eq!(next_step(DataKind::Metadata, &p, failed), ResolveStep::HardFail);
        assert_eq!(next_step(DataKind::KimiSummary, &p, failed), ResolveStep::TryFallback);
    }
}
