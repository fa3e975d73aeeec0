//! Execution engine
//!
//! The engine runs exactly one tool invocation per call and brackets it with
//! the lifecycle pair: EXECUTING before the tool is polled, COMPLETED once it
//! settles. The pair is emitted on every path, including tool errors and
//! panics. If the caller drops the invocation future mid-flight, a guard
//! reports a cancelled COMPLETED on the current runtime. Dropping the future
//! while a notification is in flight never yields an orphaned EXECUTING or a
//! second COMPLETED.
//!
//! Two entry points expose the same run with different failure contracts:
//! - [`ExecutionEngine::execute`] returns the original [`ToolError`] as `Err`
//! - [`ExecutionEngine::execute_converting`] never fails and folds the error
//!   into a [`ToolResponse`]

use crate::config::DispatchConfig;
use crate::context::IdentityContext;
use crate::notify::{CompletionOutcome, SharedChannel};
use crate::tools::{
    Metadata, Parameters, Tool, ToolError, ToolResponse, ToolResult, panic_message,
};
use chrono::Utc;
use futures::FutureExt;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Runs tools and reports their lifecycle to a notification channel
pub struct ExecutionEngine {
    channel: SharedChannel,
    summary_max_chars: usize,
    slow_call_threshold: Duration,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("summary_max_chars", &self.summary_max_chars)
            .field("slow_call_threshold", &self.slow_call_threshold)
            .finish()
    }
}

impl ExecutionEngine {
    /// Create an engine with default settings
    pub fn new(channel: SharedChannel) -> Self {
        Self::with_config(channel, &DispatchConfig::default())
    }

    /// Create an engine using the summary and logging settings of `config`
    pub fn with_config(channel: SharedChannel, config: &DispatchConfig) -> Self {
        Self {
            channel,
            summary_max_chars: config.summary_max_chars.max(1),
            slow_call_threshold: config.slow_call_threshold,
        }
    }

    /// The channel events are sent to
    pub fn channel(&self) -> &SharedChannel {
        &self.channel
    }

    /// Raising entry point
    ///
    /// Returns the result on success. On failure the COMPLETED/error event is
    /// emitted first, then the tool's own error is returned.
    pub async fn execute(
        &self,
        tool: &dyn Tool,
        tool_name: &str,
        parameters: Parameters,
        identity: &Arc<IdentityContext>,
    ) -> Result<ToolResult, ToolError> {
        let (result, error) = self.run(tool, tool_name, parameters, identity).await;
        match error {
            Some(error) => Err(error),
            None => Ok(result),
        }
    }

    /// Converting entry point
    ///
    /// Never fails; errors come back as `success: false` with the message.
    pub async fn execute_converting(
        &self,
        tool: &dyn Tool,
        tool_name: &str,
        parameters: Parameters,
        identity: &Arc<IdentityContext>,
    ) -> ToolResponse {
        let (result, error) = self.run(tool, tool_name, parameters, identity).await;
        ToolResponse::from_result(result, error.map(|e| e.kind))
    }

    async fn run(
        &self,
        tool: &dyn Tool,
        tool_name: &str,
        parameters: Parameters,
        identity: &Arc<IdentityContext>,
    ) -> (ToolResult, Option<ToolError>) {
        let invocation_id = Uuid::new_v4();
        let args_hash = hash_parameters(&parameters);
        let started_at = Utc::now();

        tracing::debug!(
            tool = %tool_name,
            invocation_id = %invocation_id,
            subject_id = %identity.subject_id(),
            run_id = %identity.run_id(),
            "Invoking tool"
        );

        let mut guard =
            CompletionGuard::arm(Arc::clone(&self.channel), Arc::clone(identity), tool_name);
        guard.announce().await;

        let started = Instant::now();
        let outcome = match AssertUnwindSafe(tool.invoke(parameters)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(ToolError::panicked(panic_message(&*payload))),
        };
        let elapsed = started.elapsed();

        let mut metadata = Metadata::new();
        metadata.insert("invocation_id".to_string(), json!(invocation_id.to_string()));
        metadata.insert("tool_name".to_string(), json!(tool_name));
        metadata.insert("args_hash".to_string(), json!(args_hash));
        metadata.insert("started_at".to_string(), json!(started_at.to_rfc3339()));

        let (result, error, notification) = match outcome {
            Ok(value) => {
                let summary = summarize(&value, self.summary_max_chars);
                (
                    ToolResult::success(value, elapsed),
                    None,
                    CompletionOutcome::success(summary),
                )
            }
            Err(error) => {
                let notification = CompletionOutcome::error(error.message.clone());
                (
                    ToolResult::failure(error.message.clone(), elapsed),
                    Some(error),
                    notification,
                )
            }
        };

        let elapsed_ms = elapsed.as_millis() as u64;
        match &error {
            None => tracing::info!(tool = %tool_name, elapsed_ms, "Tool succeeded"),
            Some(e) => tracing::info!(
                tool = %tool_name,
                elapsed_ms,
                kind = ?e.kind,
                error = %e.message,
                "Tool failed"
            ),
        }
        if elapsed >= self.slow_call_threshold {
            tracing::warn!(
                tool = %tool_name,
                elapsed_ms,
                threshold_ms = self.slow_call_threshold.as_millis() as u64,
                "Slow tool invocation"
            );
        }

        guard.complete(notification).await;

        (result.with_metadata(metadata), error)
    }
}

/// Owns the lifecycle pair of one invocation
///
/// Both notifications run on spawned tasks, so dropping the invocation
/// future never interrupts a notification halfway. If the guard is dropped
/// while still armed it reports a cancelled COMPLETED, ordered after the
/// EXECUTING notification it may have interrupted.
struct CompletionGuard {
    state: GuardState,
}

enum GuardState {
    Armed {
        channel: SharedChannel,
        identity: Arc<IdentityContext>,
        tool_name: String,
        executing: Option<JoinHandle<()>>,
    },
    Settled,
}

impl CompletionGuard {
    fn arm(channel: SharedChannel, identity: Arc<IdentityContext>, tool_name: &str) -> Self {
        Self {
            state: GuardState::Armed {
                channel,
                identity,
                tool_name: tool_name.to_string(),
                executing: None,
            },
        }
    }

    /// Emit EXECUTING and wait for the channel to accept it
    async fn announce(&mut self) {
        let GuardState::Armed {
            channel,
            identity,
            tool_name,
            executing,
        } = &mut self.state
        else {
            return;
        };

        let notify = emit_executing(Arc::clone(channel), Arc::clone(identity), tool_name.clone());
        match Handle::try_current() {
            Ok(handle) => {
                let task = executing.insert(handle.spawn(notify));
                if let Err(e) = task.await {
                    tracing::warn!(
                        tool = %tool_name,
                        error = %e,
                        "Executing notification task failed"
                    );
                }
                *executing = None;
            }
            Err(_) => notify.await,
        }
    }

    /// Emit the terminal COMPLETED; the guard is settled before the first await
    async fn complete(mut self, outcome: CompletionOutcome) {
        let GuardState::Armed {
            channel,
            identity,
            tool_name,
            executing,
        } = std::mem::replace(&mut self.state, GuardState::Settled)
        else {
            return;
        };

        let notify = emit_completed(channel, identity, tool_name.clone(), outcome, executing);
        match Handle::try_current() {
            Ok(handle) => {
                if let Err(e) = handle.spawn(notify).await {
                    tracing::warn!(
                        tool = %tool_name,
                        error = %e,
                        "Completed notification task failed"
                    );
                }
            }
            Err(_) => notify.await,
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let GuardState::Armed {
            channel,
            identity,
            tool_name,
            executing,
        } = std::mem::replace(&mut self.state, GuardState::Settled)
        else {
            return;
        };

        tracing::warn!(
            tool = %tool_name,
            run_id = %identity.run_id(),
            "Invocation dropped before completion"
        );

        match Handle::try_current() {
            Ok(handle) => {
                let outcome = CompletionOutcome::error(ToolError::cancelled().message);
                handle.spawn(emit_completed(channel, identity, tool_name, outcome, executing));
            }
            Err(_) => {
                tracing::warn!(tool = %tool_name, "No runtime to report cancelled invocation");
            }
        }
    }
}

async fn emit_executing(channel: SharedChannel, identity: Arc<IdentityContext>, tool_name: String) {
    if let Err(e) = channel.notify_executing(&identity, &tool_name).await {
        tracing::warn!(tool = %tool_name, error = %e, "Failed to emit executing notification");
    }
}

async fn emit_completed(
    channel: SharedChannel,
    identity: Arc<IdentityContext>,
    tool_name: String,
    outcome: CompletionOutcome,
    executing: Option<JoinHandle<()>>,
) {
    // an interrupted EXECUTING must land before its COMPLETED
    if let Some(executing) = executing {
        let _ = executing.await;
    }
    if let Err(e) = channel.notify_completed(&identity, &tool_name, &outcome).await {
        tracing::warn!(tool = %tool_name, error = %e, "Failed to emit completed notification");
    }
}

/// Bound a value for inclusion in a notification payload
///
/// Values whose JSON rendering fits in `max_chars` are passed through;
/// larger ones become a truncated string ending in `...`.
pub fn summarize(value: &Value, max_chars: usize) -> Value {
    let rendered = value.to_string();
    if rendered.chars().count() <= max_chars {
        return value.clone();
    }
    let mut truncated: String = rendered.chars().take(max_chars).collect();
    truncated.push_str("...");
    Value::String(truncated)
}

/// Short SHA-256 digest of the parameters for provenance
fn hash_parameters(parameters: &Parameters) -> String {
    let args_json = serde_json::to_string(parameters).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(args_json.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
