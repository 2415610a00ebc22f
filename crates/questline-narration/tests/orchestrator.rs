//! Orchestrator behaviour against recording fakes.

use std::sync::Arc;
use std::time::Duration;

use questline_core::retry::RetryPolicy;
use questline_narration::{
    AudioClip, DeviceSpeechProvider, NarrationContent, NarrationError, NarrationOrchestrator,
    NarrationProvider, NarrationUnit, PrerenderedAssetProvider, SynthesisProvider, VoiceSettings,
};
use questline_test_support::{
    Performance, RecordingAudioOutput, ScriptedSynthesizer, StaticAssetSource,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        attempt_timeout: Duration::from_millis(200),
    }
}

fn chain(
    assets: StaticAssetSource,
    synthesizer: Arc<ScriptedSynthesizer>,
) -> Vec<Arc<dyn NarrationProvider>> {
    vec![
        Arc::new(PrerenderedAssetProvider::new(Arc::new(assets))),
        Arc::new(SynthesisProvider::new(synthesizer, VoiceSettings::default()).with_retry(fast_retry())),
        Arc::new(DeviceSpeechProvider),
    ]
}

fn clue(n: u32) -> NarrationContent {
    NarrationContent::plain(NarrationUnit::Clue(n), format!("Clue number {n}"))
}

async fn unlocked(
    output: Arc<RecordingAudioOutput>,
    providers: Vec<Arc<dyn NarrationProvider>>,
) -> Arc<NarrationOrchestrator> {
    let orchestrator = Arc::new(NarrationOrchestrator::new(output, providers));
    orchestrator.unlock().await;
    orchestrator
}

#[tokio::test]
async fn test_prerendered_asset_is_preferred() {
    // Arrange
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let assets = StaticAssetSource::new().with("clue-1.mp3", b"clip-one");
    let orchestrator = unlocked(output.clone(), chain(assets, synthesizer.clone())).await;

    // Act
    orchestrator.play(clue(1)).await;

    // Assert
    assert_eq!(output.performances(), vec![Performance::Clip(b"clip-one".to_vec())]);
    assert_eq!(synthesizer.calls(), 0);
    assert!(!orchestrator.is_playing());
}

#[tokio::test]
async fn test_missing_asset_falls_through_to_synthesis() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let orchestrator = unlocked(output.clone(), chain(StaticAssetSource::new(), synthesizer.clone())).await;

    orchestrator.play(clue(2)).await;

    assert_eq!(
        output.performances(),
        vec![Performance::Clip(b"Clue number 2".to_vec())]
    );
    assert_eq!(synthesizer.calls(), 1);
    assert!((synthesizer.requests()[0].voice.stability - 0.5).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_synthesis_retries_then_succeeds() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let synthesizer = Arc::new(ScriptedSynthesizer::new(vec![
        Err(NarrationError::Synthesis("503".into())),
        Ok(AudioClip::mpeg(b"second try".to_vec())),
    ]));
    let orchestrator = unlocked(output.clone(), chain(StaticAssetSource::failing(), synthesizer.clone())).await;

    orchestrator.play(clue(3)).await;

    assert_eq!(synthesizer.calls(), 2);
    assert_eq!(output.performances(), vec![Performance::Clip(b"second try".to_vec())]);
}

#[tokio::test]
async fn test_exhausted_synthesis_falls_back_to_device_speech() {
    // Arrange
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let synthesizer = Arc::new(ScriptedSynthesizer::new(vec![
        Err(NarrationError::Synthesis("down".into())),
        Err(NarrationError::Synthesis("down".into())),
        Err(NarrationError::Synthesis("down".into())),
    ]));
    let orchestrator = unlocked(output.clone(), chain(StaticAssetSource::new(), synthesizer.clone())).await;

    // Act
    orchestrator.play(clue(4)).await;

    // Assert
    assert_eq!(synthesizer.calls(), 3);
    assert_eq!(
        output.performances(),
        vec![Performance::Speech("Clue number 4".to_owned())]
    );
}

#[tokio::test]
async fn test_clip_playback_failure_falls_back_to_device_speech() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)).failing_clips());
    let assets = StaticAssetSource::new().with("intro.mp3", b"intro");
    let orchestrator = unlocked(output.clone(), chain(assets, Arc::new(ScriptedSynthesizer::default()))).await;

    orchestrator
        .play(NarrationContent::plain(NarrationUnit::Intro, "Welcome"))
        .await;

    assert_eq!(output.performances(), vec![Performance::Speech("Welcome".to_owned())]);
}

#[tokio::test]
async fn test_total_failure_is_silent() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let providers: Vec<Arc<dyn NarrationProvider>> =
        vec![Arc::new(PrerenderedAssetProvider::new(Arc::new(StaticAssetSource::failing())))];
    let orchestrator = unlocked(output.clone(), providers).await;

    orchestrator
        .play(NarrationContent::plain(NarrationUnit::Finale, "The end"))
        .await;

    assert!(output.performances().is_empty());
    assert!(!orchestrator.is_playing());
}

#[tokio::test]
async fn test_stop_then_play_never_overlaps() {
    // Arrange
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_secs(30)));
    let orchestrator = unlocked(output.clone(), vec![Arc::new(DeviceSpeechProvider)]).await;

    // Act
    let first = orchestrator.spawn_play(clue(1));
    tokio::time::sleep(Duration::from_millis(20)).await;
    orchestrator.stop();
    let second = orchestrator.spawn_play(clue(2));
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Assert
    first.await.unwrap();
    assert!(orchestrator.is_playing());
    assert_eq!(output.max_audible(), 1);
    assert_eq!(
        output.performances(),
        vec![
            Performance::Speech("Clue number 1".to_owned()),
            Performance::Speech("Clue number 2".to_owned()),
        ]
    );

    orchestrator.stop();
    second.await.unwrap();
    assert!(!orchestrator.is_playing());
    assert!(!output.is_audible());
}

#[tokio::test]
async fn test_play_replaces_current_playback_without_explicit_stop() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_secs(30)));
    let orchestrator = unlocked(output.clone(), vec![Arc::new(DeviceSpeechProvider)]).await;

    let handles: Vec<_> = (1..=5).map(|n| orchestrator.spawn_play(clue(n))).collect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.stop();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(output.max_audible(), 1);
}

#[tokio::test]
async fn test_stop_when_idle_is_safe() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let orchestrator = NarrationOrchestrator::new(output.clone(), vec![Arc::new(DeviceSpeechProvider)]);

    orchestrator.stop();
    orchestrator.stop();

    assert!(!orchestrator.is_playing());
    assert_eq!(output.halts(), 2);
}

#[tokio::test]
async fn test_unlock_is_idempotent() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let orchestrator = NarrationOrchestrator::new(output.clone(), vec![Arc::new(DeviceSpeechProvider)]);

    orchestrator.unlock().await;
    orchestrator.unlock().await;
    orchestrator.unlock().await;

    assert!(orchestrator.is_unlocked());
    assert_eq!(output.resumes(), 1);
}

#[tokio::test]
async fn test_failed_unlock_is_retried_on_next_gesture() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)).failing_resumes(1));
    let orchestrator = NarrationOrchestrator::new(output.clone(), vec![Arc::new(DeviceSpeechProvider)]);

    orchestrator.unlock().await;
    assert!(!orchestrator.is_unlocked());

    orchestrator.unlock().await;
    assert!(orchestrator.is_unlocked());
}

#[tokio::test]
async fn test_locked_audio_skips_playback() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(5)));
    let orchestrator = NarrationOrchestrator::new(output.clone(), vec![Arc::new(DeviceSpeechProvider)]);

    orchestrator.play(clue(1)).await;

    assert!(output.performances().is_empty());
}

#[tokio::test]
async fn test_synthesis_cache_avoids_second_call() {
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(1)));
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let orchestrator = unlocked(output.clone(), chain(StaticAssetSource::new(), synthesizer.clone())).await;

    orchestrator.play(clue(5)).await;
    orchestrator.play(clue(5)).await;

    assert_eq!(synthesizer.calls(), 1);
    assert_eq!(output.performances().len(), 2);
}

#[tokio::test]
async fn test_slow_stage_times_out_and_falls_through() {
    // Arrange
    let output = Arc::new(RecordingAudioOutput::new(Duration::from_millis(1)));
    let synthesizer = Arc::new(ScriptedSynthesizer::default());
    let slow = SynthesisProvider::new(synthesizer, VoiceSettings::default()).with_retry(RetryPolicy {
        attempt_timeout: Duration::from_secs(5),
        ..fast_retry()
    });
    let providers: Vec<Arc<dyn NarrationProvider>> = vec![
        Arc::new(SlowProvider(Arc::new(slow))),
        Arc::new(DeviceSpeechProvider),
    ];
    let orchestrator = Arc::new(
        NarrationOrchestrator::new(output.clone(), providers)
            .with_stage_timeout(Duration::from_millis(10)),
    );
    orchestrator.unlock().await;

    // Act
    orchestrator.play(clue(6)).await;

    // Assert
    assert_eq!(output.performances(), vec![Performance::Speech("Clue number 6".to_owned())]);
}

struct SlowProvider(Arc<dyn NarrationProvider>);

#[async_trait::async_trait]
impl NarrationProvider for SlowProvider {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn render(
        &self,
        content: &NarrationContent,
    ) -> Result<questline_narration::Rendition, NarrationError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.0.render(content).await
    }
}
