//! linewave: animated sine-wave lines whose amplitude follows a live volume signal.
//!
//! The `wave` module holds the line model, point generator and gradient mapping;
//! `render` drives a frame-paced worker thread against a host display surface.
//! The remaining modules make up the terminal application around them.

pub mod app;
pub mod audio;
pub mod commands;
pub mod config;
pub mod logging;
pub mod render;
pub mod setup;
pub mod wave;
