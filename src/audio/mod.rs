// Audio module - Hit buffers, sinks, cpal output and offline export

pub mod buffer;
pub mod device;
pub mod dsp_utils;
pub mod engine;
pub mod export;
pub mod format_conversion;
pub mod parameters;
pub mod sink;
