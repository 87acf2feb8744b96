//! 生成流水线 - 流程层
//!
//! 状态：pending → fetching → generating → done | failed
//!
//! 两阶段模式下 phase2 只能由成功的 phase1 进入；
//! phase1 失败时整条流水线失败，不会调用 phase2，也不会留下最终产物。

use tracing::{debug, info, warn};

use super::prompt::{self, PipelineInputs};
use crate::cache::CacheStore;
use crate::config::SummarySettings;
use crate::error::PipelineError;
use crate::models::{GenerationMode, PaperId, Payload, Phase, PipelineStatus, SourceKind, Stage};
use crate::services::{GenerationRequest, TextGenerator};

/// 单篇论文的一次流水线运行，不在论文之间共享
#[derive(Debug)]
pub struct PipelineRun {
    paper_id: PaperId,
    mode: GenerationMode,
    status: PipelineStatus,
    phase: Option<Phase>,
    inputs: PipelineInputs,
}

impl PipelineRun {
    pub fn new(paper_id: PaperId, mode: GenerationMode) -> Self {
        Self {
            paper_id,
            mode,
            status: PipelineStatus::Pending,
            phase: None,
            inputs: PipelineInputs::default(),
        }
    }

    pub fn paper_id(&self) -> &PaperId {
        &self.paper_id
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// 当前（或最后进入的）生成阶段
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn inputs(&self) -> &PipelineInputs {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut PipelineInputs {
        &mut self.inputs
    }

    pub fn advance(&mut self, next: PipelineStatus) -> Result<(), PipelineError> {
        if !self.status.can_advance_to(next) {
            return Err(PipelineError::InvalidTransition {
                phase: self.phase.unwrap_or(Phase::Single),
                from: self.status,
                to: next,
            });
        }
        debug!("[论文 {}] 流水线状态: {} -> {}", self.paper_id, self.status, next);
        self.status = next;
        Ok(())
    }

    /// 标记失败，已结束的运行保持不变
    pub fn fail(&mut self) {
        if !self.status.is_terminal() {
            self.status = PipelineStatus::Failed;
        }
    }
}

enum PhaseState {
    Single,
    Phase1,
    Phase2 { draft: String },
    Finished { text: String },
}

pub struct GenerationPipeline<'a> {
    generator: &'a dyn TextGenerator,
    cache: &'a CacheStore,
    settings: &'a SummarySettings,
    force: bool,
}

impl<'a> GenerationPipeline<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        cache: &'a CacheStore,
        settings: &'a SummarySettings,
        force: bool,
    ) -> Self {
        Self {
            generator,
            cache,
            settings,
            force,
        }
    }

    /// 运行生成阶段；调用前 `run` 必须处于 fetching 状态
    ///
    /// 成功时最终产物已写入缓存，状态为 done；失败时状态为 failed。
    pub async fn run(&self, run: &mut PipelineRun) -> Result<String, PipelineError> {
        run.advance(PipelineStatus::Generating)?;

        match self.drive(run).await {
            Ok(text) => {
                let stage = Stage::FinalSummary(run.mode);
                if let Err(source) = self.cache.put(
                    &run.paper_id,
                    stage,
                    SourceKind::LanguageModel,
                    Payload::Text(text.clone()),
                ) {
                    run.fail();
                    return Err(PipelineError::Storage {
                        phase: run.phase.unwrap_or(Phase::Single),
                        stage,
                        source,
                    });
                }
                run.advance(PipelineStatus::Done)?;
                Ok(text)
            }
            Err(e) => {
                run.fail();
                Err(e)
            }
        }
    }

    async fn drive(&self, run: &mut PipelineRun) -> Result<String, PipelineError> {
        let mut state = match run.mode {
            GenerationMode::TwoPhase => PhaseState::Phase1,
            GenerationMode::Full | GenerationMode::Lightweight => PhaseState::Single,
        };

        loop {
            state = match state {
                PhaseState::Single => {
                    run.phase = Some(Phase::Single);
                    let request = prompt::single_request(run.mode, &run.inputs, self.settings);
                    PhaseState::Finished {
                        text: self.call(&run.paper_id, &request).await?,
                    }
                }
                PhaseState::Phase1 => {
                    run.phase = Some(Phase::Phase1);
                    PhaseState::Phase2 {
                        draft: self.phase1(run).await?,
                    }
                }
                PhaseState::Phase2 { draft } => {
                    run.phase = Some(Phase::Phase2);
                    let request = prompt::phase2_request(&run.inputs, &draft, self.settings);
                    PhaseState::Finished {
                        text: self.call(&run.paper_id, &request).await?,
                    }
                }
                PhaseState::Finished { text } => return Ok(text),
            };
        }
    }

    /// 第一阶段，优先复用缓存中的草稿
    async fn phase1(&self, run: &PipelineRun) -> Result<String, PipelineError> {
        if !self.force {
            match self
                .cache
                .get(&run.paper_id, Stage::Phase1Output, Some(SourceKind::LanguageModel))
            {
                Ok(Some(entry)) => {
                    if let Some(draft) = entry.payload.as_text().filter(|t| !t.trim().is_empty()) {
                        info!("[论文 {}] 复用缓存的 phase1 草稿", run.paper_id);
                        return Ok(draft.to_string());
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("[论文 {}] 读取 phase1 缓存失败，重新生成: {}", run.paper_id, e),
            }
        }

        let request = prompt::phase1_request(&run.inputs, self.settings);
        let draft = self.call(&run.paper_id, &request).await?;

        if let Err(e) = self.cache.put(
            &run.paper_id,
            Stage::Phase1Output,
            SourceKind::LanguageModel,
            Payload::Text(draft.clone()),
        ) {
            warn!("[论文 {}] phase1 草稿写入缓存失败: {}", run.paper_id, e);
        }
        Ok(draft)
    }

    async fn call(
        &self,
        paper_id: &PaperId,
        request: &GenerationRequest,
    ) -> Result<String, PipelineError> {
        let phase = request.phase;
        info!("[论文 {}] 🤖 生成中 ({})...", paper_id, phase);

        let text = self
            .generator
            .generate(request)
            .await
            .map_err(|source| PipelineError::Generation { phase, source })?;

        if text.trim().is_empty() {
            return Err(PipelineError::EmptyOutput { phase });
        }
        debug!("[论文 {}] {} 输出 {} 字符", paper_id, phase, text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> PipelineRun {
        PipelineRun::new(PaperId::parse("2401.01234").unwrap(), GenerationMode::Full)
    }

    #[test]
    fn test_run_transitions() {
        let mut r = run();
        assert_eq!(r.status(), PipelineStatus::Pending);
        r.advance(PipelineStatus::Fetching).unwrap();
        r.advance(PipelineStatus::Generating).unwrap();
        r.advance(PipelineStatus::Done).unwrap();
        assert!(r.status().is_terminal());

        // done 之后不能再失败
        r.fail();
        assert_eq!(r.status(), PipelineStatus::Done);
    }

    #[test]
    fn test_generating_requires_fetching() {
        let mut r = run();
        let err = r.advance(PipelineStatus::Generating).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: PipelineStatus::Pending,
                to: PipelineStatus::Generating,
                ..
            }
        ));
        r.fail();
        assert_eq!(r.status(), PipelineStatus::Failed);
        assert!(r.advance(PipelineStatus::Fetching).is_err());
    }
}
