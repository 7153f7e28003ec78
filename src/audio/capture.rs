use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

use super::ring_buffer::SampleProducer;
use crate::error::DeviceError;

/// Name shown for a device whose description cannot be read
const UNKNOWN_DEVICE: &str = "Unknown";

/// Pair each device with its display name
/// Every enumerated device keeps its slot, so list positions and open
/// indices agree; the default device is appended when enumeration missed it
fn name_devices<D>(
    devices: impl IntoIterator<Item = D>,
    default: Option<D>,
    name: impl Fn(&D) -> Option<String>,
) -> Vec<(String, D)> {
    let mut named: Vec<(String, D)> = devices
        .into_iter()
        .map(|device| {
            let label = name(&device).unwrap_or_else(|| UNKNOWN_DEVICE.to_string());
            (label, device)
        })
        .collect();

    if let Some(default) = default {
        if let Some(default_name) = name(&default) {
            if !named.iter().any(|(label, _)| *label == default_name) {
                named.push((default_name, default));
            }
        }
    }

    named
}

fn describe(device: &cpal::Device) -> Option<String> {
    device.description().ok().map(|desc| desc.name().to_string())
}

/// Input devices in the order shown by `list_input_devices`
fn input_devices(host: &cpal::Host) -> Result<Vec<(String, cpal::Device)>> {
    Ok(name_devices(
        host.input_devices()?,
        host.default_input_device(),
        describe,
    ))
}

/// List available audio input devices
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    Ok(input_devices(&host)?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

/// Running microphone capture
/// Capture stops when this value is dropped
pub struct AudioCapture {
    _stream: cpal::Stream,
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: usize,
}

impl AudioCapture {
    /// Open the input device at `device_index` (in `list_input_devices` order,
    /// None for the host default) and start queueing mono samples into `producer`
    /// Stream errors and queue overruns are reported through `error_tx`
    pub fn start(
        device_index: Option<usize>,
        sample_rate: u32,
        producer: SampleProducer,
        error_tx: Sender<String>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let (device_name, device) = match device_index {
            Some(index) => {
                let mut devices = input_devices(&host)?;
                if index >= devices.len() {
                    return Err(DeviceError::IndexOutOfRange {
                        kind: "Audio input",
                        index,
                        count: devices.len(),
                    }
                    .into());
                }
                devices.swap_remove(index)
            }
            None => {
                let device = host
                    .default_input_device()
                    .ok_or(DeviceError::NoDevices("audio input"))?;
                let name = describe(&device).unwrap_or_else(|| UNKNOWN_DEVICE.to_string());
                (name, device)
            }
        };

        let supported = device.default_input_config()?;
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();

        let mut stream_config: cpal::StreamConfig = supported.into();
        stream_config.sample_rate = sample_rate;

        log::info!(
            "Opening audio input '{}' ({} ch, {} Hz, {:?})",
            device_name,
            channels,
            sample_rate,
            sample_format
        );

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_input_stream::<f32>(&device, &stream_config, channels, producer, error_tx)?
            }
            cpal::SampleFormat::I16 => {
                build_input_stream::<i16>(&device, &stream_config, channels, producer, error_tx)?
            }
            cpal::SampleFormat::U16 => {
                build_input_stream::<u16>(&device, &stream_config, channels, producer, error_tx)?
            }
            other => {
                return Err(DeviceError::UnsupportedSampleFormat(format!("{:?}", other)).into());
            }
        };

        stream.play()?;

        Ok(Self {
            _stream: stream,
            device_name,
            sample_rate,
            channels,
        })
    }
}

/// Build an input stream that downmixes interleaved frames to mono
fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut producer: SampleProducer,
    error_tx: Sender<String>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let overrun_tx = error_tx.clone();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let dropped = producer.push_samples(
                data.chunks_exact(channels)
                    .map(|frame| downmix(frame.iter().map(|&s| s.to_sample::<f32>()))),
            );
            if dropped > 0 {
                let _ = overrun_tx.try_send(format!(
                    "Input overrun: {} samples dropped ({} total)",
                    dropped,
                    producer.dropped()
                ));
            }
        },
        move |err| {
            // Never block the audio thread on a full channel
            let _ = error_tx.try_send(format!("Audio stream error: {}", err));
        },
        None,
    )?;

    Ok(stream)
}

/// Average one interleaved frame to a single mono sample
fn downmix(frame: impl ExactSizeIterator<Item = f32>) -> f32 {
    let channels = frame.len();
    if channels == 0 {
        return 0.0;
    }
    frame.sum::<f32>() / channels as f32
}
