//! Built-in tools for trying the dispatcher from the command line

use conduit_core::tools::{BlockingTool, BoxedTool, FnTool, Parameters, ToolError, ToolMetadata};
use serde_json::{Value, json};

/// Every demo tool, in listing order
pub fn tools() -> Vec<BoxedTool> {
    vec![echo(), word_count(), fail()]
}

fn echo() -> BoxedTool {
    FnTool::boxed(
        ToolMetadata::new("echo", "Returns its parameters unchanged").with_tag("debug"),
        |parameters: Parameters| async move { Ok::<_, ToolError>(Value::Object(parameters)) },
    )
}

fn word_count() -> BoxedTool {
    BlockingTool::boxed(
        ToolMetadata::new("word_count", "Counts words in the `text` parameter")
            .with_tag("text")
            .with_version("1.0.0"),
        |parameters: Parameters| {
            let text = parameters
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::execution("missing string parameter 'text'"))?;
            Ok(json!({
                "words": text.split_whitespace().count(),
                "chars": text.chars().count(),
            }))
        },
    )
}

fn fail() -> BoxedTool {
    FnTool::boxed(
        ToolMetadata::new("fail", "Always fails with the `message` parameter").with_tag("debug"),
        |parameters: Parameters| async move {
            let message = parameters
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("requested failure")
                .to_string();
            Err::<Value, _>(ToolError::execution(message))
        },
    )
}
