//! Permission query adapters

mod device_nodes;

pub use device_nodes::DeviceNodePermissions;
