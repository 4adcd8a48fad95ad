//! # Cursor Usage
//!
//! Usage statistics for the Cursor editor, rendered as a status line with a
//! markdown tooltip, a side-panel message and threshold notifications.
//!
//! ## Overview
//!
//! Each refresh cycle reads the session token from Cursor's state database,
//! fetches premium request usage and the monthly invoice from the dashboard
//! API, and derives:
//! - Premium request usage against the monthly quota
//! - Usage-based spending against the configured hard limit
//! - A color tier for the status line
//! - Notifications when usage crosses a configured threshold
//!
//! ## Features
//!
//! - `colors` (default): Enables terminal color output via owo-colors

/// Aggregation of a snapshot into the rendered view
pub mod aggregate;

/// Single-slot snapshot cache
pub mod cache;

/// Command-line argument parsing
pub mod cli;

/// Settings file and flag layering
pub mod config;

/// Session token from Cursor's state database
pub mod credentials;

/// Status line, tooltip and panel rendering
pub mod display;

pub mod error;

/// Pure formatting helpers
pub mod format;

/// Host surface and events
pub mod host;

/// Set-limit and toggle flows
pub mod limit;

pub mod logging;

/// Data models for snapshots and derived views
pub mod models;

/// Threshold notifications
pub mod notify;

/// The refresh loop
pub mod refresh;

/// Cursor dashboard API client
pub mod usage_api;

/// Utility functions for paths and env parsing
pub mod utils;
