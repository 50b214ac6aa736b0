// Connection module - Output device status tracking

pub mod status;

pub use status::{AtomicDeviceStatus, DeviceStatus};
