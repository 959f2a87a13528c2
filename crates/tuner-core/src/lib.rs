// ABOUTME: Core types and constants for the calorie tuner workspace
// ABOUTME: Foundation crate with error handling, food data models, and tuning constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

#![deny(unsafe_code)]

//! # Tuner Core
//!
//! Foundation crate providing shared types and constants for the calorie
//! tuner. It changes rarely, so the main crate rebuilds without touching it.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Nutrition, unit, retry, and optimizer constants
//! - **models**: Food records, ingredient lines, calorie results

/// Unified error handling system with stable error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models
pub mod models;
