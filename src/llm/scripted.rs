// ABOUTME: Scripted completion provider returning queued replies, for tests and offline runs
// ABOUTME: Records every request so callers can assert on prompts and output shapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, LlmProvider};
use crate::errors::{AppError, AppResult};

/// Completion provider that replays queued replies in order
///
/// Running out of replies is an `InternalError`.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<AppResult<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    /// Create a provider with no replies queued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    #[must_use]
    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.push_reply(content);
        self
    }

    /// Queue a failure
    #[must_use]
    pub fn with_failure(self, error: AppError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queue a successful reply on a shared provider
    pub fn push_reply(&self, content: impl Into<String>) {
        self.push(Ok(content.into()));
    }

    fn push(&self, reply: AppResult<String>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Requests received so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replies not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| AppError::internal("Scripted provider has no replies left"))?;

        reply.map(|content| ChatResponse {
            content,
            model: "scripted".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }
}
