// ABOUTME: Domain models for foods, recipes, and calorie results
// ABOUTME: Re-exported from tuner-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

pub use tuner_core::models::*;
