use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::types::TokenUsage;

/// Process-wide token and call counters. Diagnostic only.
#[derive(Debug, Default)]
pub struct UsageCounters {
    embed_input: AtomicU64,
    embed_calls: AtomicU64,
    chat_input: AtomicU64,
    chat_output: AtomicU64,
    chat_total: AtomicU64,
    chat_calls: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub embed_input: u64,
    pub embed_calls: u64,
    pub chat_input: u64,
    pub chat_output: u64,
    pub chat_total: u64,
    pub chat_calls: u64,
}

impl UsageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_embedding(&self, input_tokens: u64) {
        self.embed_input.fetch_add(input_tokens, Ordering::Relaxed);
        self.embed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chat(&self, tokens: &TokenUsage) {
        self.chat_input.fetch_add(tokens.input, Ordering::Relaxed);
        self.chat_output.fetch_add(tokens.output, Ordering::Relaxed);
        self.chat_total.fetch_add(tokens.total, Ordering::Relaxed);
        self.chat_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            embed_input: self.embed_input.load(Ordering::Relaxed),
            embed_calls: self.embed_calls.load(Ordering::Relaxed),
            chat_input: self.chat_input.load(Ordering::Relaxed),
            chat_output: self.chat_output.load(Ordering::Relaxed),
            chat_total: self.chat_total.load(Ordering::Relaxed),
            chat_calls: self.chat_calls.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self, tag: &str) {
        let s = self.snapshot();
        tracing::info!(
            "[tokens {}] embed in={} (calls={}) | chat in={} out={} total={} (calls={})",
            tag,
            s.embed_input,
            s.embed_calls,
            s.chat_input,
            s.chat_output,
            s.chat_total,
            s.chat_calls
        );
    }
}
