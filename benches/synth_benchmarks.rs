use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use drumloop::audio::buffer::HitBuffer;
use drumloop::audio::engine::output_channel;
use drumloop::audio::parameters::AtomicF32;
use drumloop::connection::status::{AtomicDeviceStatus, DeviceStatus};
use drumloop::synth::{InstrumentKind, NoiseSource};
use drumloop::{AudioSink, CaptureSink, KitConfig};
use std::sync::Arc;

/// One complete hit per instrument (runs on the tick thread, once per hit)
fn bench_hit_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_render");
    let sample_rate = 48000.0;

    for kind in InstrumentKind::all() {
        let mut instrument = kind.build(NoiseSource::seeded(1));
        let frames = instrument.max_hit_samples(sample_rate);
        let mut buffer = vec![0.0f32; frames];

        group.bench_with_input(BenchmarkId::from_parameter(kind), &frames, |b, &frames| {
            b.iter(|| {
                buffer.fill(0.0);
                instrument.render(&mut buffer, 0, sample_rate, frames, 1.0);
                black_box(&buffer);
            });
        });
    }
    group.finish();
}

/// Whole tick of the default kit, including rendering and sink handoff
fn bench_engine_tick(c: &mut Criterion) {
    let sink = Arc::new(CaptureSink::new(48000.0));
    let engine = KitConfig::default()
        .build_engine(Arc::clone(&sink) as Arc<dyn AudioSink>, Some(1))
        .unwrap();
    engine.prime();

    c.bench_function("engine_bar_16_ticks", |b| {
        b.iter(|| {
            for _ in 0..16 {
                engine.step();
            }
            black_box(sink.take_hits());
        });
    });
}

/// Output callback mixing a few overlapping hits into a 512-frame stereo buffer
fn bench_output_mix(c: &mut Criterion) {
    let status = AtomicDeviceStatus::new(DeviceStatus::Connected);
    let (sink, mut mixer) = output_channel(48000.0, AtomicF32::new(0.8), status);
    let mut output = vec![0.0f32; 1024];

    c.bench_function("output_mix_512_frames", |b| {
        b.iter(|| {
            for tick in 0..4 {
                let _ = sink.schedule(HitBuffer::from_mono(tick, vec![0.1; 2048]));
            }
            mixer.fill(&mut output, 2);
            black_box(&output);
        });
    });
}

criterion_group!(benches, bench_hit_render, bench_engine_tick, bench_output_mix);
criterion_main!(benches);
