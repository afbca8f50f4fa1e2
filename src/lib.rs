//! # Dogbot Teleop Library
//!
//! Drive a quadruped robot from a Linux machine with a gamepad and keyboard.
//!
//! The robot runs a small HTTP server. This library polls its IMU, battery and
//! servo endpoints, tracks whether it is reachable, and forwards keyboard and
//! gamepad input to its command endpoints.

pub mod config;
pub mod controller;
pub mod dashboard;
pub mod error;
pub mod orientation;
pub mod robot;
pub mod state;
pub mod telemetry;
pub mod view;
