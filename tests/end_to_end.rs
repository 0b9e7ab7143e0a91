//! End-to-end scenarios over the public API: the streaming layer feeding
//! both detector pipelines, driven the way a capture loop drives them.

use wakestream::detector::{DetectionEvent, Detector, DetectorConfig, VAD_CHANNEL, WAKEWORD_CHANNEL};
use wakestream::engine::{InferenceEngine, MockEngine, TensorSpec, TensorValue};
use wakestream::vad::{VadConfig, VadPipeline};
use wakestream::wakeword::{probe_model_dims, WakewordConfig, WakewordModel, WakewordPipeline};
use wakestream::{Chunker, MultiChannelChunker, RingBuffer};

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| (i % 100) as f32 / 100.0).collect()
}

fn vad_engine(scores: Vec<f32>) -> Box<dyn InferenceEngine> {
    Box::new(
        MockEngine::new()
            .with_scores("output", &[1, 1], scores)
            .with_echo("stateN", "state"),
    )
}

fn three_stage_model(detector_scores: Vec<f32>) -> WakewordModel {
    let melspec = MockEngine::new().with_output(
        "melspectrogram",
        TensorValue::from_f32(&[1, 1, 5, 32], vec![0.0; 160]).unwrap(),
    );
    let embedding = MockEngine::new()
        .with_output(
            "embedding",
            TensorValue::from_f32(&[1, 96], vec![0.0; 96]).unwrap(),
        )
        .with_output_specs(vec![TensorSpec::new("embedding", vec![Some(1), Some(96)])]);
    let detector = MockEngine::new()
        .with_scores("scores", &[1, 1], detector_scores)
        .with_input_specs(vec![TensorSpec::new(
            "embeddings",
            vec![Some(1), Some(16), Some(96)],
        )]);
    WakewordModel::ThreeStage {
        melspec: Box::new(melspec),
        embedding: Box::new(embedding),
        detector: Box::new(detector),
    }
}

#[test]
fn ten_thousand_samples_through_ring_and_chunker() {
    let mut ring = RingBuffer::new(16000);
    let mut chunker = Chunker::new(512, 0).unwrap();

    // Feed in capture-sized batches, draining the ring after each write
    let stream = ramp(10_000);
    let mut chunks = Vec::new();
    for batch in stream.chunks(1600) {
        ring.write(batch);
        let drained = ring.read(ring.available()).unwrap();
        chunks.extend(chunker.process(&drained));
    }

    assert_eq!(chunks.len(), 10_000 / 512); // 19 full windows
    assert_eq!(chunker.remainder_len(), 10_000 - 19 * 512); // 272 carried
    assert!(chunks.iter().all(|c| c.len() == 512));

    // Losslessness: the emitted windows concatenate back to the prefix of
    // the stream the chunker consumed
    let emitted: Vec<f32> = chunks.concat();
    assert_eq!(emitted[..], stream[..19 * 512]);
}

#[test]
fn chunker_equivalence_under_adversarial_batching() {
    let stream = ramp(5000);

    let mut reference = Chunker::new(512, 0).unwrap();
    let expected = reference.process(&stream);

    // Deterministic pseudo-random batch sizes
    let mut chunker = Chunker::new(512, 0).unwrap();
    let mut emitted = Vec::new();
    let mut offset = 0usize;
    let mut seed = 0x2545f491u32;
    while offset < stream.len() {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        let batch = 1 + (seed >> 16) as usize % 700;
        let end = (offset + batch).min(stream.len());
        emitted.extend(chunker.process(&stream[offset..end]));
        offset = end;
    }

    assert_eq!(emitted, expected);
    assert_eq!(chunker.remainder_len(), reference.remainder_len());
}

#[test]
fn multi_channel_consumers_stay_aligned() {
    let mut fan = MultiChannelChunker::new();
    fan.register_channel(VAD_CHANNEL, 512, 0).unwrap();
    fan.register_channel(WAKEWORD_CHANNEL, 1280, 0).unwrap();

    let stream = ramp(12_800);
    let mut vad_windows = 0;
    let mut wakeword_windows = 0;
    for batch in stream.chunks(999) {
        let out = fan.process(batch);
        vad_windows += out[VAD_CHANNEL].len();
        wakeword_windows += out[WAKEWORD_CHANNEL].len();
    }

    assert_eq!(vad_windows, 12_800 / 512);
    assert_eq!(wakeword_windows, 12_800 / 1280);
}

#[test]
fn vad_hysteresis_timing_over_public_api() {
    let mut scores = vec![0.9];
    scores.extend(std::iter::repeat(0.1).take(20));
    let mut pipeline = VadPipeline::new(
        MockEngine::new()
            .with_scores("output", &[1, 1], scores)
            .with_echo("stateN", "state"),
        VadConfig {
            hangover_frames: 12,
            ..VadConfig::default()
        },
    );

    let mut state = pipeline.initial_state();
    let window = vec![0.0f32; 512];

    let (_, next) = pipeline.process(&state, &window).unwrap();
    state = next;

    let mut active_low_calls = 0;
    loop {
        let (decision, next) = pipeline.process(&state, &window).unwrap();
        state = next;
        if !decision.speech_active {
            break;
        }
        active_low_calls += 1;
    }
    assert_eq!(active_low_calls, 12);
}

#[test]
fn wakeword_warm_up_blocks_early_triggers() {
    let mut pipeline =
        WakewordPipeline::new(three_stage_model(vec![0.99]), WakewordConfig::default()).unwrap();

    let mut state = pipeline.initial_state();
    let window = vec![0.0f32; 1280];
    let mut first_trigger_call = None;
    for call in 1..=20 {
        let (decision, next) = pipeline.process(&state, &window).unwrap();
        state = next;
        if decision.triggered {
            first_trigger_call = Some(call);
            break;
        }
    }

    // ceil(76 / 5) = 16 is the first call with a full mel window
    assert_eq!(first_trigger_call, Some(16));
}

#[test]
fn dimension_probe_is_deterministic() {
    let embedding = MockEngine::new()
        .with_output_specs(vec![TensorSpec::new("embedding", vec![Some(1), Some(96)])]);
    let mut detector = MockEngine::new()
        .with_expected_shape("input", &[1, 28, 96])
        .with_output("scores", TensorValue::zeros_f32(&[1, 1]));

    let first = probe_model_dims(&embedding, &mut detector, None).unwrap();
    let second = probe_model_dims(&embedding, &mut detector, None).unwrap();
    let third = probe_model_dims(&embedding, &mut detector, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(first.embedding_buffer_size, 28);
    assert_eq!(first.embedding_dimension, 96);
}

#[test]
fn detector_emits_full_event_sequence() {
    // Speech rises, holds, falls; the wake word fires once warm-up is over
    let mut vad_scores = vec![0.9; 10];
    vad_scores.extend(vec![0.1; 40]);
    let config = DetectorConfig {
        vad: VadConfig {
            hangover_frames: 3,
            ..VadConfig::default()
        },
        ..DetectorConfig::default()
    };
    let mut detector =
        Detector::new(vad_engine(vad_scores), three_stage_model(vec![0.9]), config).unwrap();

    let mut events = Vec::new();
    // 25,600 samples = 50 VAD windows = 20 wake-word windows
    for _ in 0..16 {
        events.extend(detector.push_samples(&vec![0.0f32; 1600]).unwrap());
    }

    let speech_starts = events
        .iter()
        .filter(|e| matches!(e, DetectionEvent::SpeechStart))
        .count();
    let speech_ends = events
        .iter()
        .filter(|e| matches!(e, DetectionEvent::SpeechEnd))
        .count();
    let triggers = events
        .iter()
        .filter(|e| matches!(e, DetectionEvent::WakewordTriggered { .. }))
        .count();

    assert_eq!(speech_starts, 1);
    assert_eq!(speech_ends, 1);
    assert_eq!(triggers, 1);

    // Ordering: start before end
    let start_idx = events
        .iter()
        .position(|e| matches!(e, DetectionEvent::SpeechStart))
        .unwrap();
    let end_idx = events
        .iter()
        .position(|e| matches!(e, DetectionEvent::SpeechEnd))
        .unwrap();
    assert!(start_idx < end_idx);
}
