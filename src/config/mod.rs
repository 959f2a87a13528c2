// ABOUTME: Configuration management for the calorie tuner
// ABOUTME: Loads settings from the environment and derives component settings from them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

/// Environment configuration
pub mod environment;

pub use environment::{
    CompletionConfig, OptimizerConfig, RetryConfig, TunerConfig, DEFAULT_DETAIL_CACHE_URL,
    DEMO_API_KEY,
};
