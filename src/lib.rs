//! Scenecast: a render service for generated animation scripts.
//!
//! Requests carry script text and a scene name. Each job runs the external renderer in
//! its own workspace, publishes the finished movie under a public URL and removes every
//! intermediate file before responding.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
