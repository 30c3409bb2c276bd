//! Camcorder - webcam and microphone recording with validated output
//!
//! A recording session acquires the camera and microphone, optionally draws
//! the camera through a compositor surface, records the stream into a WebM or
//! MP4 container, and validates the finished file before exposing it.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, the session lifecycle, and errors
//! - **Application**: The recording session actor, capture pipeline, and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (FFmpeg, V4L2, cpal, filesystem)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
