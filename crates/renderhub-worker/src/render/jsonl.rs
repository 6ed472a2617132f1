//! JSON Lines renderer: one output line per payload record.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use renderhub_core::error::AppError;
use renderhub_core::result::AppResult;
use renderhub_core::traits::{ProgressSink, RenderOutput, Renderer};

/// Records between progress reports.
const PROGRESS_STEP: u64 = 100;

/// Output name used when the payload does not carry one.
const DEFAULT_FILE_NAME: &str = "report.jsonl";

/// Renders `payload.records` (or a bare array payload) as JSON Lines.
///
/// The output name comes from `payload.fileName` when present. The render
/// stops at the next record once the host asks it to cancel.
#[derive(Debug, Clone)]
pub struct JsonLinesRenderer {
    mode: String,
}

impl JsonLinesRenderer {
    /// Create a renderer serving `mode`.
    pub fn new(mode: impl Into<String>) -> Self {
        Self { mode: mode.into() }
    }
}

#[async_trait]
impl Renderer for JsonLinesRenderer {
    fn mode(&self) -> &str {
        &self.mode
    }

    async fn render(
        &self,
        payload: &Value,
        mode: &str,
        progress: &dyn ProgressSink,
    ) -> AppResult<RenderOutput> {
        let records = records_of(payload)?;
        let total = records.len() as u64;
        progress.report(0, total, mode);

        let mut out = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            if progress.is_cancelled() {
                return Err(AppError::render("Render cancelled: service is shutting down"));
            }
            serde_json::to_writer(&mut out, record)?;
            out.push(b'\n');

            let done = idx as u64 + 1;
            if done % PROGRESS_STEP == 0 || done == total {
                progress.report(done, total, mode);
                tokio::task::yield_now().await;
            }
        }

        Ok(RenderOutput {
            bytes: Bytes::from(out),
            file_name: file_name_of(payload),
            content_type: "application/x-ndjson".to_string(),
        })
    }
}

fn records_of(payload: &Value) -> AppResult<&Vec<Value>> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(map) => match map.get("records") {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(AppError::render("payload.records must be an array")),
            None => Err(AppError::render("payload has no records array")),
        },
        _ => Err(AppError::render("payload must be an object or an array")),
    }
}

fn file_name_of(payload: &Value) -> String {
    payload
        .get("fileName")
        .and_then(Value::as_str)
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}
