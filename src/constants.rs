// ABOUTME: Constants for nutrition lookups, unit conversion, retries, and the optimizer
// ABOUTME: Re-exported from tuner-core so defaults live in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

pub use tuner_core::constants::*;
