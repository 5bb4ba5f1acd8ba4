//! VozBook - 文档转有声书演示
//!
//! 用 fake 能力适配器跑通完整链路：
//! 归一化 -> 提交 -> 转换（提取 / 合成） -> Book -> 播放会话

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use vozbook::application::pipeline::{ConversionPipeline, ExtractionStage, SynthesisStage};
use vozbook::application::JobScheduler;
use vozbook::config::{load_config, print_config};
use vozbook::domain::{ContentSource, JobError, JobStage, RawFile, RawInput, VoiceConfig};
use vozbook::infrastructure::adapters::{
    FakeExtractor, FakeMusicMixer, FakeSynthesizer, FakeTranslator,
};
use vozbook::infrastructure::events::{EventPublisher, JobEvent};
use vozbook::infrastructure::memory::{InMemoryJobStore, NarrationCache};
use vozbook::infrastructure::worker::{ConvertWorker, ConvertWorkerConfig};
use vozbook::playback::PlaybackSessionManager;

const SAMPLE_TEXT: &str = "\
# The Lighthouse Keeper

Every evening the keeper climbed the spiral stairs with a lamp in his hand, \
counting the one hundred and twelve steps he knew by heart.

The sea below was patient and dark, and the gulls had long gone quiet.

# A Light in the Storm

When the storm finally came, the light held steady, sweeping its slow \
circle over the breaking waves.

By morning the fishing boats returned, one by one, guided home.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},vozbook={}", config.log.level, config.log.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));
    if config.log.json {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    tracing::info!("VozBook - 文档转有声书核心（演示）");
    print_config(&config);

    // 组装基础设施
    let store = InMemoryJobStore::new().arc();
    let events = EventPublisher::new().arc();
    let cache = NarrationCache::new().arc();

    // fake 能力适配器（带一点模拟延迟，方便观察进度事件）
    let extractor = Arc::new(FakeExtractor::new().with_latency(Duration::from_millis(100)));
    let synthesizer = Arc::new(FakeSynthesizer::new().with_latency(Duration::from_millis(50)));
    let translator = Arc::new(FakeTranslator::new());
    let mixer = Arc::new(FakeMusicMixer::new());

    let retry = config.pipeline.retry_policy();
    let pipeline = Arc::new(ConversionPipeline::new(
        ExtractionStage::new(extractor, retry.clone()),
        SynthesisStage::new(
            synthesizer,
            translator,
            mixer,
            cache,
            retry,
            config.pipeline.fan_out,
        ),
        store.clone(),
        events.clone(),
        config.pipeline.fan_out,
    ));

    // 任务队列 + 后台 Worker
    let (queue_tx, queue_rx) = mpsc::channel(config.scheduler.queue_capacity);
    let worker = ConvertWorker::new(
        ConvertWorkerConfig {
            max_concurrent: config.scheduler.max_concurrent_jobs,
        },
        queue_rx,
        store.clone(),
        pipeline,
    );
    tokio::spawn(worker.run());

    let scheduler = JobScheduler::new(store, events, queue_tx);

    // 归一化输入并提交转换
    let outcome = ContentSource::normalize(RawInput::Files(vec![RawFile {
        name: "the-lighthouse-keeper.txt".to_string(),
        bytes: SAMPLE_TEXT.as_bytes().to_vec(),
        mime_hint: None,
    }]));
    for diagnostic in &outcome.diagnostics {
        tracing::warn!(input = %diagnostic.input, reason = %diagnostic.reason, "Input skipped");
    }

    let voice = VoiceConfig {
        background_music: Some("lofi".to_string()),
        ..VoiceConfig::default()
    };
    let job_id = scheduler.submit(outcome.units, voice)?;
    tracing::info!(job_id = %job_id, "Conversion submitted");

    // 事件只用于日志；完成判定靠快照轮询，不依赖订阅时机
    let mut events_rx = scheduler
        .subscribe(&job_id)
        .ok_or_else(|| anyhow::anyhow!("Job events unavailable"))?;
    tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            match event {
                JobEvent::Progress { progress, .. } => {
                    tracing::info!(progress = format!("{:.1}%", progress), "Converting");
                }
                JobEvent::StageChanged { stage, .. } => {
                    tracing::info!(stage = %stage, "Stage changed");
                }
                JobEvent::Degraded { reason, .. } => {
                    tracing::warn!(reason = %reason, "Degraded");
                }
                _ => break,
            }
        }
    });

    // 轮询直到终态
    let snapshot = loop {
        let snapshot = scheduler.progress_of(&job_id)?;
        if snapshot.stage.is_terminal() {
            break snapshot;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    };
    match snapshot.stage {
        JobStage::Done => {
            if snapshot.degraded {
                tracing::warn!("Completed with degraded translation");
            }
        }
        JobStage::Failed => {
            let error = snapshot.error.unwrap_or_else(|| JobError {
                code: "unknown".to_string(),
                message: "no error recorded".to_string(),
            });
            anyhow::bail!("Conversion failed [{}]: {}", error.code, error.message);
        }
        _ => anyhow::bail!("Conversion was cancelled"),
    }

    // 领取 Book（一次性交付）
    let book = scheduler
        .take_book(&job_id)?
        .ok_or_else(|| anyhow::anyhow!("Job finished without a book"))?;
    tracing::info!(
        book_id = %book.id,
        title = %book.title,
        chapters = book.chapters.len(),
        segments = book.segments.len(),
        total_seconds = format!("{:.1}", book.total_seconds),
        "Book ready"
    );

    // 播放会话演示：播放 -> tick -> 跳到第二章 -> 暂停
    let sessions = PlaybackSessionManager::new();
    let session = sessions.create(Arc::new(book.clone()));
    session.play().await;
    let state = session.tick(2.0).await;
    tracing::info!(
        position = format!("{:.1}s", state.position_seconds),
        segment = state.active_segment_index,
        chapter = state.active_chapter_index,
        "Playing"
    );

    if let Some(second_chapter) = book.chapters.get(1) {
        session.seek(second_chapter.start_seconds).await;
    }
    session.pause().await;
    let state = session.state().await;
    tracing::info!(
        position = format!("{:.1}s", state.position_seconds),
        chapter = state.active_chapter_index,
        progress = format!("{:.0}%", state.progress_percent),
        "Paused"
    );

    Ok(())
}
