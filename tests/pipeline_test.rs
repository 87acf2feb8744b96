mod common;

use common::*;
use paper_summary::cache::CacheStore;
use paper_summary::config::SummarySettings;
use paper_summary::error::PipelineError;
use paper_summary::models::{GenerationMode, Phase, PipelineStatus, SourceKind, Stage};
use paper_summary::workflow::{GenerationPipeline, PipelineRun};

fn fetching_run(mode: GenerationMode) -> PipelineRun {
    let mut run = PipelineRun::new(pid("2401.01234"), mode);
    run.advance(PipelineStatus::Fetching).unwrap();
    run.inputs_mut().kimi_summary = Some("Kimi 解读".to_string());
    run
}

#[tokio::test]
async fn test_phase1_failure_marks_run_failed() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::new(dir.path());
    let settings = SummarySettings::default();
    let generator = ScriptedGenerator::failing(Phase::Phase1);
    let pipeline = GenerationPipeline::new(&generator, &cache, &settings, false);

    let mut run = fetching_run(GenerationMode::TwoPhase);
    let err = pipeline.run(&mut run).await.unwrap_err();

    assert!(matches!(err, PipelineError::Generation { phase: Phase::Phase1, .. }));
    assert_eq!(run.status(), PipelineStatus::Failed);
    assert_eq!(run.phase(), Some(Phase::Phase1));
    assert_eq!(generator.phases(), vec![Phase::Phase1]);
    assert!(cache
        .get(run.paper_id(), Stage::FinalSummary(GenerationMode::TwoPhase), None)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_done_only_after_final_summary_written() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::new(dir.path());
    let settings = SummarySettings::default();
    let generator = ScriptedGenerator::ok();
    let pipeline = GenerationPipeline::new(&generator, &cache, &settings, false);

    let mut run = fetching_run(GenerationMode::Lightweight);
    let text = pipeline.run(&mut run).await.unwrap();

    assert_eq!(run.status(), PipelineStatus::Done);
    let entry = cache
        .get(
            run.paper_id(),
            Stage::FinalSummary(GenerationMode::Lightweight),
            Some(SourceKind::LanguageModel),
        )
        .unwrap()
        .unwrap();
    assert_eq!(entry.payload.as_text(), Some(text.as_str()));
}

#[tokio::test]
async fn test_force_ignores_cached_phase1() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::new(dir.path());
    let settings = SummarySettings::default();

    let first = ScriptedGenerator::ok();
    let mut run = fetching_run(GenerationMode::TwoPhase);
    GenerationPipeline::new(&first, &cache, &settings, false)
        .run(&mut run)
        .await
        .unwrap();

    let second = ScriptedGenerator::ok();
    let mut run = fetching_run(GenerationMode::TwoPhase);
    GenerationPipeline::new(&second, &cache, &settings, true)
        .run(&mut run)
        .await
        .unwrap();

    assert_eq!(second.phases(), vec![Phase::Phase1, Phase::Phase2]);
}

#[tokio::test]
async fn test_run_must_be_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::new(dir.path());
    let settings = SummarySettings::default();
    let generator = ScriptedGenerator::ok();
    let pipeline = GenerationPipeline::new(&generator, &cache, &settings, false);

    let mut run = PipelineRun::new(pid("2401.01234"), GenerationMode::Full);
    let err = pipeline.run(&mut run).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidTransition { .. }));
    assert_eq!(generator.calls(), 0);
}
