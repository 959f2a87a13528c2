// ABOUTME: Parsing of JSON replies from the completion service
// ABOUTME: Tolerates code fences around the JSON; any shape mismatch is MalformedOutput
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use serde::de::DeserializeOwned;

use crate::errors::{AppError, AppResult};

/// Strip a surrounding markdown code fence, if any
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_suffix("```").unwrap_or(rest);
    // drop the info string ("json") on the opening fence line
    body.split_once('\n').map_or(body, |(_, inner)| inner).trim()
}

/// Parse a completion reply as `T`
///
/// # Errors
///
/// Returns `MalformedOutput` when the reply is not JSON of the expected shape
pub fn parse_json_reply<T: DeserializeOwned>(content: &str) -> AppResult<T> {
    serde_json::from_str(strip_code_fence(content)).map_err(|e| {
        AppError::malformed_output(format!("Completion reply does not match the expected shape: {e}"))
    })
}
