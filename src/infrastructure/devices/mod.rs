//! Capture device adapters

mod linux;

pub use linux::LinuxMediaDevices;
