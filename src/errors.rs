// ABOUTME: Error types for the calorie tuner, re-exported from tuner-core
// ABOUTME: AppError carries a stable ErrorCode plus structured details
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

pub use tuner_core::errors::*;
