//! Report rendering.

use crate::config::{OutputFormat, OutputSettings};
use crate::error::HarnessError;
use crate::runner::RunReport;
use serde_json::Value;
use std::fmt::Write;

/// Renders a report according to the output settings.
pub fn render(report: &RunReport, settings: &OutputSettings) -> Result<String, HarnessError> {
    match settings.format {
        OutputFormat::Text => Ok(render_text(report, settings.show_context)),
        OutputFormat::Json => render_json(report, settings.show_context),
    }
}

/// Plain text: the initial state value, then for each event its type
/// followed by the resulting state value.
pub fn render_text(report: &RunReport, show_context: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", format_value(&report.initial_value));
    for step in &report.steps {
        let _ = writeln!(out, "{}", step.event);
        match &step.error {
            Some(error) => {
                let _ = writeln!(
                    out,
                    "{} (error {}: {})",
                    format_value(&step.value),
                    step.error_code.unwrap_or("UNKNOWN"),
                    error
                );
            }
            None if !step.handled => {
                let _ = writeln!(out, "{} (ignored)", format_value(&step.value));
            }
            None => {
                let _ = writeln!(out, "{}", format_value(&step.value));
            }
        }
    }
    if show_context {
        let _ = writeln!(out, "context: {}", report.context);
    }
    out
}

/// Pretty-printed JSON report. The `context` field is only kept when
/// `show_context` is set.
pub fn render_json(report: &RunReport, show_context: bool) -> Result<String, HarnessError> {
    let mut value = serde_json::to_value(report)?;
    if !show_context {
        if let Value::Object(map) = &mut value {
            map.remove("context");
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Formats a state value: bare strings unquoted, objects as compact JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;
    use crate::runner::ScriptRunner;
    use crate::script::EventScript;

    fn report(events: &[&str]) -> RunReport {
        ScriptRunner::new(presets::subscription().unwrap())
            .run(&EventScript::new(events.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&report(&["START", "RENEW", "EXPIRE"]), false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "free",
                "START",
                r#"{"subscribed":"autoRenewing"}"#,
                "RENEW",
                r#"{"subscribed":"autoRenewing"}"#,
                "EXPIRE",
                r#"{"subscribed":"autoRenewing"} (ignored)"#,
            ]
        );
    }

    #[test]
    fn test_render_text_with_context() {
        let text = render_text(&report(&[]), true);
        assert!(text.ends_with("context: {\"provider\":null,\"plan\":null}\n"));
    }

    #[test]
    fn test_render_json() {
        let settings = OutputSettings {
            format: OutputFormat::Json,
            show_context: false,
        };
        let json = render(&report(&["START"]), &settings).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["machine"], "subscription");
        assert_eq!(value["initial"], "subscription.free");
        assert_eq!(value["steps"][0]["event"]["type"], "START");
        assert_eq!(value["steps"][0]["state"], "subscription.subscribed.autoRenewing");
        assert_eq!(value["status"], "stopped");
        assert!(value["steps"][0].get("error").is_none());
        assert!(value.get("context").is_none());
    }

    #[test]
    fn test_render_json_with_context() {
        let settings = OutputSettings {
            format: OutputFormat::Json,
            show_context: true,
        };
        let json = render(&report(&[]), &settings).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["context"], serde_json::json!({"provider": null, "plan": null}));
    }

    #[test]
    fn test_render_failed_step() {
        let report = ScriptRunner::new(presets::subscription().unwrap())
            .stop_on_error(false)
            .run_with(&EventScript::new(["START"]), |snapshot, event| {
                if event.is_some() && snapshot.matches("subscribed") {
                    return Err("sink closed".into());
                }
                Ok(())
            })
            .unwrap();

        let text = render_text(&report, false);
        assert!(text.contains(
            "{\"subscribed\":\"autoRenewing\"} (error OBSERVER_FAILED: transition observer failed: sink closed)"
        ));

        let json: Value = serde_json::from_str(&render_json(&report, false).unwrap()).unwrap();
        assert_eq!(json["steps"][0]["error_code"], "OBSERVER_FAILED");
    }
}
