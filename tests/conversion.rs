//! 端到端转换场景测试
//!
//! 用 fake 能力适配器跑完整链路：提交 -> 转换 -> Book -> 播放

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use vozbook::application::pipeline::{
    ConversionPipeline, ExtractionStage, RetryPolicy, SynthesisStage,
};
use vozbook::application::ports::{ExtractorPort, SynthesizerPort, TranslatorPort};
use vozbook::application::JobScheduler;
use vozbook::domain::{
    ContentSource, JobId, JobSnapshot, JobStage, RawFile, RawInput, SourceKind, SourcePayload,
    SourceUnit, UnitId, VoiceConfig,
};
use vozbook::infrastructure::adapters::{
    FakeExtractor, FakeMusicMixer, FakeSynthesizer, FakeTranslator,
};
use vozbook::infrastructure::events::EventPublisher;
use vozbook::infrastructure::memory::{InMemoryJobStore, NarrationCache};
use vozbook::infrastructure::worker::{ConvertWorker, ConvertWorkerConfig};
use vozbook::playback::PlaybackSessionManager;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(5),
        call_timeout: Duration::from_secs(2),
    }
}

/// 组装一套完整运行时（store + worker + scheduler）
fn start_runtime(
    extractor: Arc<dyn ExtractorPort>,
    synthesizer: Arc<dyn SynthesizerPort>,
    translator: Arc<dyn TranslatorPort>,
) -> JobScheduler {
    let store = InMemoryJobStore::new().arc();
    let events = EventPublisher::new().arc();
    let retry = fast_retry();

    let pipeline = Arc::new(ConversionPipeline::new(
        ExtractionStage::new(extractor, retry.clone()),
        SynthesisStage::new(
            synthesizer,
            translator,
            Arc::new(FakeMusicMixer::new()),
            NarrationCache::new().arc(),
            retry,
            4,
        ),
        store.clone(),
        events.clone(),
        4,
    ));

    let (queue_tx, queue_rx) = mpsc::channel(64);
    let worker = ConvertWorker::new(
        ConvertWorkerConfig { max_concurrent: 2 },
        queue_rx,
        store.clone(),
        pipeline,
    );
    tokio::spawn(worker.run());

    JobScheduler::new(store, events, queue_tx)
}

fn default_runtime() -> JobScheduler {
    start_runtime(
        Arc::new(FakeExtractor::new()),
        Arc::new(FakeSynthesizer::new()),
        Arc::new(FakeTranslator::new()),
    )
}

fn text_units(texts: &[&str]) -> Vec<SourceUnit> {
    let files = texts
        .iter()
        .enumerate()
        .map(|(i, text)| RawFile {
            name: format!("unit-{}.txt", i),
            bytes: text.as_bytes().to_vec(),
            mime_hint: None,
        })
        .collect();
    ContentSource::normalize(RawInput::Files(files)).units
}

/// 轮询直到终态（观察序列同时用于进度单调性断言）
async fn await_terminal(scheduler: &JobScheduler, job_id: JobId) -> Vec<JobSnapshot> {
    tokio::time::timeout(Duration::from_secs(10), async {
        let mut observations = Vec::new();
        loop {
            let snapshot = scheduler.progress_of(&job_id).expect("job disappeared");
            let terminal = snapshot.stage.is_terminal();
            observations.push(snapshot);
            if terminal {
                return observations;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state in time")
}

/// 500 词、默认语速 -> 单章 Book，时长落在 ~150 wpm 的朗读区间
#[tokio::test]
async fn converts_500_words_into_single_chapter_book() {
    let scheduler = default_runtime();

    // 10 个段落 x 50 词 = 500 词，无标题
    let text = (0..10)
        .map(|p| {
            (0..50)
                .map(|w| format!("p{}w{}", p, w))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let job_id = scheduler
        .submit(text_units(&[&text]), VoiceConfig::default())
        .unwrap();

    let observations = await_terminal(&scheduler, job_id).await;
    assert_eq!(observations.last().unwrap().stage, JobStage::Done);

    let book = scheduler.take_book(&job_id).unwrap().expect("book missing");
    assert_eq!(book.chapters.len(), 1);
    assert_eq!(book.segments.len(), 10);
    // 500 词 @ ~150 wpm ≈ 200s
    assert!(
        book.total_seconds >= 180.0 && book.total_seconds <= 220.0,
        "total_seconds {} outside narration band",
        book.total_seconds
    );
    assert!(book.duration_invariant_holds());
    assert!(book.ordering_invariant_holds());

    // 交付后 Job 从调度器内存清除
    assert!(scheduler.progress_of(&job_id).is_err());
}

/// 进度在到达终态前的观察序列单调不减
#[tokio::test]
async fn progress_is_monotonic_across_observations() {
    let scheduler = start_runtime(
        Arc::new(FakeExtractor::new().with_latency(Duration::from_millis(20))),
        Arc::new(FakeSynthesizer::new().with_latency(Duration::from_millis(10))),
        Arc::new(FakeTranslator::new()),
    );

    let job_id = scheduler
        .submit(
            text_units(&["one two\n\nthree four\n\nfive six", "seven eight\n\nnine ten"]),
            VoiceConfig::default(),
        )
        .unwrap();

    let observations = await_terminal(&scheduler, job_id).await;
    for window in observations.windows(2) {
        assert!(
            window[1].progress >= window[0].progress,
            "progress regressed: {} -> {}",
            window[0].progress,
            window[1].progress
        );
    }
    assert_eq!(observations.last().unwrap().progress, 100.0);
}

/// unit 2 的前两次合成失败后成功 -> 三个 unit 的段仍按提交顺序齐全
#[tokio::test]
async fn transient_synthesizer_outage_is_retried_invisibly() {
    let scheduler = start_runtime(
        Arc::new(FakeExtractor::new()),
        Arc::new(FakeSynthesizer::new().failing_on_marker("flaky", 2)),
        Arc::new(FakeTranslator::new()),
    );

    let job_id = scheduler
        .submit(
            text_units(&[
                "alpha paragraph text",
                "flaky paragraph text",
                "gamma paragraph text",
            ]),
            VoiceConfig::default(),
        )
        .unwrap();

    let observations = await_terminal(&scheduler, job_id).await;
    let last = observations.last().unwrap();
    assert_eq!(last.stage, JobStage::Done, "error: {:?}", last.error);

    let book = scheduler.take_book(&job_id).unwrap().expect("book missing");
    assert_eq!(book.segments.len(), 3);
    assert!(book.ordering_invariant_holds());
    assert!(book.duration_invariant_holds());
    assert_eq!(
        book.text_content,
        "alpha paragraph text\nflaky paragraph text\ngamma paragraph text"
    );
}

/// 重试耗尽 -> Job 失败并带稳定错误码
#[tokio::test]
async fn exhausted_retries_fail_the_job() {
    let scheduler = start_runtime(
        Arc::new(FakeExtractor::new()),
        Arc::new(FakeSynthesizer::new().with_outages(100)),
        Arc::new(FakeTranslator::new()),
    );

    let job_id = scheduler
        .submit(text_units(&["some text"]), VoiceConfig::default())
        .unwrap();

    let observations = await_terminal(&scheduler, job_id).await;
    let last = observations.last().unwrap();
    assert_eq!(last.stage, JobStage::Failed);
    let error = last.error.as_ref().expect("error missing on failed job");
    assert_eq!(error.code, "synthesizer_unavailable");
    assert!(scheduler.take_book(&job_id).unwrap().is_none());
}

/// 翻译始终失败 -> Job 完成但降级，旁白保持原语言
#[tokio::test]
async fn broken_translator_degrades_but_completes() {
    let cfg = VoiceConfig {
        translation_language: Some("en".to_string()),
        ..VoiceConfig::default()
    };
    let text = "uma frase em outra língua";

    let degraded_scheduler = start_runtime(
        Arc::new(FakeExtractor::new()),
        Arc::new(FakeSynthesizer::new()),
        Arc::new(FakeTranslator::broken()),
    );
    let job_id = degraded_scheduler.submit(text_units(&[text]), cfg).unwrap();

    let observations = await_terminal(&degraded_scheduler, job_id).await;
    let last = observations.last().unwrap();
    assert_eq!(last.stage, JobStage::Done);
    assert!(last.degraded, "job should be flagged degraded");

    let degraded_book = degraded_scheduler
        .take_book(&job_id)
        .unwrap()
        .expect("book missing");

    // 对照：不翻译的正常转换产生相同的音频引用 => 原语言旁白
    let plain_scheduler = default_runtime();
    let plain_id = plain_scheduler
        .submit(text_units(&[text]), VoiceConfig::default())
        .unwrap();
    await_terminal(&plain_scheduler, plain_id).await;
    let plain_book = plain_scheduler
        .take_book(&plain_id)
        .unwrap()
        .expect("book missing");

    assert_eq!(
        degraded_book.segments[0].audio_ref,
        plain_book.segments[0].audio_ref
    );
}

/// 合成中途取消 -> Cancelled、无 Book、无僵尸写入
#[tokio::test]
async fn cancel_mid_synthesis_leaves_no_book() {
    let scheduler = start_runtime(
        Arc::new(FakeExtractor::new()),
        Arc::new(FakeSynthesizer::new().with_latency(Duration::from_millis(40))),
        Arc::new(FakeTranslator::new()),
    );

    // 单 unit、多段落，让合成阶段足够长
    let text = (0..12)
        .map(|i| format!("paragraph number {} with several words", i))
        .collect::<Vec<_>>()
        .join("\n\n");
    let job_id = scheduler
        .submit(text_units(&[&text]), VoiceConfig::default())
        .unwrap();

    // 等到进入合成阶段再取消
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if scheduler.progress_of(&job_id).unwrap().stage == JobStage::Synthesizing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job never reached synthesizing");

    scheduler.cancel(&job_id).unwrap();

    let snapshot = scheduler.progress_of(&job_id).unwrap();
    assert_eq!(snapshot.stage, JobStage::Cancelled);
    let progress_at_cancel = snapshot.progress;

    // 在途调用返回后结果被丢弃：进度不再变化，Book 不产出
    tokio::time::sleep(Duration::from_millis(300)).await;
    let settled = scheduler.progress_of(&job_id).unwrap();
    assert_eq!(settled.stage, JobStage::Cancelled);
    assert_eq!(settled.progress, progress_at_cancel);
    assert!(settled.result_book_id.is_none());
    assert!(scheduler.take_book(&job_id).unwrap().is_none());
}

/// 不认识的 mime -> 致命失败，不重试
#[tokio::test]
async fn unsupported_format_fails_fast() {
    let scheduler = default_runtime();

    let unit = SourceUnit {
        id: UnitId::new(),
        kind: SourceKind::File,
        payload: SourcePayload::Bytes(b"PK\x03\x04".to_vec()),
        mime_hint: Some("application/zip".to_string()),
        label: "archive".to_string(),
    };
    let job_id = scheduler.submit(vec![unit], VoiceConfig::default()).unwrap();

    let observations = await_terminal(&scheduler, job_id).await;
    let last = observations.last().unwrap();
    assert_eq!(last.stage, JobStage::Failed);
    assert_eq!(last.error.as_ref().unwrap().code, "unsupported_format");
}

/// 不存在的音色 -> 致命失败，立即上报
#[tokio::test]
async fn unsupported_voice_fails_fast() {
    let scheduler = default_runtime();
    let cfg = VoiceConfig {
        voice_id: "robot-9000".to_string(),
        ..VoiceConfig::default()
    };

    let job_id = scheduler.submit(text_units(&["hello there"]), cfg).unwrap();

    let observations = await_terminal(&scheduler, job_id).await;
    let last = observations.last().unwrap();
    assert_eq!(last.stage, JobStage::Failed);
    assert_eq!(last.error.as_ref().unwrap().code, "unsupported_voice");
}

/// 标题段落驱动章节；完成的 Book 可直接进入播放会话
#[tokio::test]
async fn headings_become_chapters_and_book_is_playable() {
    let scheduler = default_runtime();

    let text = "# Chapter One\n\nfirst chapter body words here\n\n\
                # Chapter Two\n\nsecond chapter body words here";
    let job_id = scheduler
        .submit(text_units(&[text]), VoiceConfig::default())
        .unwrap();
    await_terminal(&scheduler, job_id).await;
    let book = scheduler.take_book(&job_id).unwrap().expect("book missing");

    assert_eq!(book.chapters.len(), 2);
    assert_eq!(book.chapters[0].title, "Chapter One");
    assert_eq!(book.title, "Chapter One");

    let sessions = PlaybackSessionManager::new();
    let session = sessions.create(Arc::new(book.clone()));
    session.play().await;

    // 跳到第二章开头：章索引与段索引同步更新
    session.seek(book.chapters[1].start_seconds).await;
    let state = session.state().await;
    assert!(state.is_playing);
    assert_eq!(state.active_chapter_index, 1);
    assert_eq!(
        book.segments[state.active_segment_index].start_offset_seconds,
        book.chapters[1].start_seconds
    );
}

/// 背景音乐配置 -> 每个段的音频引用经过闪避混音
#[tokio::test]
async fn background_music_is_ducked_into_segments() {
    let scheduler = default_runtime();
    let cfg = VoiceConfig {
        background_music: Some("piano".to_string()),
        music_volume: 40,
        ..VoiceConfig::default()
    };

    let job_id = scheduler
        .submit(text_units(&["calm words\n\nmore calm words"]), cfg)
        .unwrap();
    await_terminal(&scheduler, job_id).await;
    let book = scheduler.take_book(&job_id).unwrap().expect("book missing");

    assert_eq!(book.segments.len(), 2);
    for segment in &book.segments {
        assert!(segment.audio_ref.contains("duck(piano,40,-18dB)"));
    }
}
