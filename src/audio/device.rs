// Output device discovery (cpal)

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use std::fmt;

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
    /// Default sample rate, if the device reports a config
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl fmt::Display for AudioDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let (Some(rate), Some(channels)) = (self.sample_rate, self.channels) {
            write!(f, " ({} Hz, {} ch)", rate, channels)?;
        }
        if self.is_default {
            write!(f, " [default]")?;
        }
        Ok(())
    }
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Every output device the host can see
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let Ok(output_devices) = self.host.output_devices() else {
            return Vec::new();
        };

        output_devices
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = device.default_output_config().ok();
                Some(AudioDeviceInfo {
                    is_default: name == default_name,
                    sample_rate: config.as_ref().map(|c| c.sample_rate().0),
                    channels: config.as_ref().map(|c| c.channels()),
                    name,
                })
            })
            .collect()
    }

    pub fn get_default_output_device(&self) -> Option<Device> {
        self.host.default_output_device()
    }

    pub fn get_output_device_by_name(&self, device_name: &str) -> Option<Device> {
        self.host
            .output_devices()
            .ok()?
            .find(|device| device.name().is_ok_and(|name| name == device_name))
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
