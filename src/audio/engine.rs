// Audio output - cpal stream fed with rendered hit buffers
//
// # Format Support
//
// The stream is built for whatever sample format the device prefers:
// - **F32**: native, no conversion
// - **I16**: common on Windows/WASAPI
// - **U16**: less common
//
// Mixing always happens in f32; conversion to the device format happens while
// writing into the output buffer, through `write_mono_to_interleaved_frame()`.
//
// # Threading
//
// The tick thread pushes finished `HitBuffer`s into a lock-free ring; the cpal
// callback pops them and mixes every active hit sample by sample. Buffers that
// finished playing travel back through a second ring so they are freed on the
// tick thread, never inside the callback.
//
// Every queued hit carries the silence generation it was scheduled in.
// `silence()` bumps the generation; the callback drops hits from earlier
// generations only, so hits scheduled right after a restart survive even when
// no callback ran in between.
//
// On macOS (CoreAudio) the Stream is not Send/Sync: `AudioEngine` stays on the
// thread that created it, only the `StreamSink` handle is shared.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info, warn};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio::buffer::HitBuffer;
use crate::audio::device::AudioDeviceManager;
use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero, soft_clip};
use crate::audio::format_conversion::write_mono_to_interleaved_frame;
use crate::audio::parameters::AtomicF32;
use crate::audio::sink::{AudioSink, SinkError};
use crate::connection::status::{AtomicDeviceStatus, DeviceStatus};
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationCategory};

/// Hits waiting between the tick thread and the callback
pub const HIT_QUEUE_CAPACITY: usize = 256;

/// Hits mixed simultaneously; the oldest is dropped beyond this
pub const MAX_ACTIVE_HITS: usize = 64;

pub const DEFAULT_VOLUME: f32 = 0.8;

/// Hit in flight between the sink and the mixer
struct QueuedHit {
    generation: u64,
    buffer: HitBuffer,
}

/// Sink half of the output: lives on the tick thread
pub struct StreamSink {
    sample_rate: f32,
    incoming: Mutex<HeapProd<QueuedHit>>,
    recycle: Mutex<HeapCons<HitBuffer>>,
    generation: Arc<AtomicU64>,
    status: AtomicDeviceStatus,
}

impl StreamSink {
    pub fn status(&self) -> DeviceStatus {
        self.status.get()
    }

    /// Free buffers the callback has finished with
    fn collect_finished(&self) {
        if let Some(mut recycle) = self.recycle.try_lock() {
            while recycle.try_pop().is_some() {}
        }
    }
}

impl AudioSink for StreamSink {
    fn output_sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn schedule(&self, buffer: HitBuffer) -> Result<(), SinkError> {
        let status = self.status.get();
        if !status.is_usable() {
            return Err(SinkError::Unavailable(format!("output device {}", status)));
        }

        self.collect_finished();
        let generation = self.generation.load(Ordering::Acquire);
        self.incoming
            .lock()
            .try_push(QueuedHit { generation, buffer })
            .map_err(|_| SinkError::Full)
    }

    fn check_ready(&self) -> Result<(), SinkError> {
        let status = self.status.get();
        if status.is_usable() {
            Ok(())
        } else {
            Err(SinkError::Unavailable(format!("output device {}", status)))
        }
    }

    fn silence(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

struct ActiveHit {
    generation: u64,
    buffer: HitBuffer,
    position: usize,
}

/// Callback half of the output: mixes active hits into device frames
///
/// No allocation after construction: `active` is pre-sized and finished
/// buffers are handed back instead of dropped.
pub struct StreamMixer {
    incoming: HeapCons<QueuedHit>,
    recycle: HeapProd<HitBuffer>,
    active: Vec<ActiveHit>,
    generation: Arc<AtomicU64>,
    /// Generation of the last flush
    flushed: u64,
    volume: AtomicF32,
    volume_smoother: OnePoleSmoother,
}

impl StreamMixer {
    /// Pull newly scheduled hits into the active set
    fn admit_incoming(&mut self) {
        let generation = self.generation.load(Ordering::Acquire);
        if generation != self.flushed {
            self.flushed = generation;
            let mut index = 0;
            while index < self.active.len() {
                if self.active[index].generation < generation {
                    let stale = self.active.swap_remove(index);
                    self.retire(stale.buffer);
                } else {
                    index += 1;
                }
            }
        }

        while let Some(queued) = self.incoming.try_pop() {
            if queued.generation < generation {
                self.retire(queued.buffer);
                continue;
            }
            if self.active.len() >= MAX_ACTIVE_HITS {
                let oldest = self.active.remove(0);
                self.retire(oldest.buffer);
            }
            self.active.push(ActiveHit {
                generation: queued.generation,
                buffer: queued.buffer,
                position: 0,
            });
        }
    }

    fn retire(&mut self, buffer: HitBuffer) {
        // Ring full: the buffer is freed here, which only happens if the
        // tick thread stopped collecting
        let _ = self.recycle.try_push(buffer);
    }

    /// Sum of every active hit at its current position, then advance
    fn next_sample(&mut self) -> f32 {
        let mut sum = 0.0;
        let mut index = 0;
        while index < self.active.len() {
            let hit = &mut self.active[index];
            if hit.position < hit.buffer.frames() {
                sum += hit.buffer.sample_at(hit.position, 0);
                hit.position += 1;
                index += 1;
            } else {
                let finished = self.active.swap_remove(index);
                self.retire(finished.buffer);
            }
        }
        sum
    }

    /// Fill an interleaved device buffer
    pub fn fill<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: Sample + FromSample<f32>,
    {
        self.admit_incoming();

        for frame in data.chunks_mut(channels.max(1)) {
            let volume = self.volume_smoother.process(self.volume.get());
            let mut sample = flush_denormals_to_zero(self.next_sample());
            sample *= volume;
            sample = soft_clip(sample);
            write_mono_to_interleaved_frame(sample, frame);
        }
    }

    pub fn active_hits(&self) -> usize {
        self.active.len()
    }
}

/// Create a connected sink/mixer pair
///
/// The pair works without any device; `AudioEngine` moves the mixer into
/// the cpal callback.
pub fn output_channel(
    sample_rate: f32,
    volume: AtomicF32,
    status: AtomicDeviceStatus,
) -> (StreamSink, StreamMixer) {
    let (incoming_tx, incoming_rx) = HeapRb::<QueuedHit>::new(HIT_QUEUE_CAPACITY).split();
    // Every queued and every active hit may need to travel back at once
    let (recycle_tx, recycle_rx) =
        HeapRb::<HitBuffer>::new(HIT_QUEUE_CAPACITY + MAX_ACTIVE_HITS).split();
    let generation = Arc::new(AtomicU64::new(0));

    let sink = StreamSink {
        sample_rate,
        incoming: Mutex::new(incoming_tx),
        recycle: Mutex::new(recycle_rx),
        generation: Arc::clone(&generation),
        status,
    };

    let initial_volume = volume.get();
    let mixer = StreamMixer {
        incoming: incoming_rx,
        recycle: recycle_tx,
        active: Vec::with_capacity(MAX_ACTIVE_HITS),
        generation,
        flushed: 0,
        volume,
        // 10ms time constant to avoid zipper noise on volume changes
        volume_smoother: OnePoleSmoother::new(initial_volume, 10.0, sample_rate),
    };

    (sink, mixer)
}

pub struct AudioEngine {
    _device: Device,
    _stream: Stream,
    sample_rate: f32,
    channels: usize,
    device_name: String,
    pub volume: AtomicF32,
    pub status: AtomicDeviceStatus,
    sink: Arc<StreamSink>,
}

impl AudioEngine {
    /// Open an output device (the default one when `device_name` is None)
    /// and start streaming silence until hits arrive.
    pub fn new(
        device_name: Option<&str>,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Self, SinkError> {
        let manager = AudioDeviceManager::new();
        let device = match device_name {
            Some(name) => manager
                .get_output_device_by_name(name)
                .ok_or_else(|| SinkError::Device(format!("No output device named '{}'", name)))?,
            None => manager
                .get_default_output_device()
                .ok_or_else(|| SinkError::Device("No audio device found".to_string()))?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Audio device: {}", device_name);

        let supported_config = device
            .default_output_config()
            .map_err(|e| SinkError::Device(format!("Configuration error: {}", e)))?;

        let sample_format = supported_config.sample_format();
        info!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let volume = AtomicF32::new(DEFAULT_VOLUME);
        let status = AtomicDeviceStatus::new(DeviceStatus::Connecting);
        let (sink, mixer) = output_channel(sample_rate, volume.clone(), status.clone());

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                mixer,
                status.clone(),
                Arc::clone(&notification_tx),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                mixer,
                status.clone(),
                Arc::clone(&notification_tx),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                mixer,
                status.clone(),
                Arc::clone(&notification_tx),
            ),
            _ => {
                return Err(SinkError::Device(format!(
                    "Unsupported sample format: {:?}. Supported formats: F32, I16, U16",
                    sample_format
                )));
            }
        }?;

        stream
            .play()
            .map_err(|e| SinkError::Device(format!("Cannot start stream: {}", e)))?;

        status.set(DeviceStatus::Connected);
        info!("Audio output started: {} Hz, {} channels", sample_rate, channels);

        if let Some(mut tx) = notification_tx.try_lock() {
            let notif = Notification::info(
                NotificationCategory::Audio,
                format!("Audio connected: {} ({} Hz)", device_name, sample_rate),
            );
            let _ = tx.try_push(notif);
        }

        Ok(Self {
            _device: device,
            _stream: stream,
            sample_rate,
            channels,
            device_name,
            volume,
            status,
            sink: Arc::new(sink),
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Shared handle the pattern engine schedules hits on
    pub fn sink(&self) -> Arc<StreamSink> {
        Arc::clone(&self.sink)
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.set(volume.clamp(0.0, 1.0));
    }

    /// Build an output stream for one sample type (f32, i16, u16)
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut mixer: StreamMixer,
        status: AtomicDeviceStatus,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Stream, SinkError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // No allocations, no I/O, no blocking locks
                    mixer.fill(data, channels);
                },
                move |err| {
                    // Runs outside the audio callback, I/O is fine here
                    error!("Audio stream error: {}", err);
                    status.set(DeviceStatus::Error);

                    if let Some(mut tx) = notification_tx.try_lock() {
                        let notif = Notification::error(
                            NotificationCategory::Audio,
                            format!("Audio stream error: {}", err),
                        );
                        if tx.try_push(notif).is_err() {
                            warn!("Notification queue full");
                        }
                    }
                },
                None,
            )
            .map_err(|e| SinkError::Device(format!("Error in stream creation: {}", e)))
    }
}
