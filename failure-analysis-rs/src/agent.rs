// failure-analysis-rs/src/agent.rs
//
// Analysis agent: turns a failure report into a prompt, asks the provider for
// a JSON diagnosis and coerces the reply into FailureAnalysis.
//
// Replies that fail to parse are sent back to the model with the parse error
// attached, up to `output_retries` extra times.

use async_trait::async_trait;
use config_rs::AnalysisConfig;

use crate::error::AgentError;
use crate::llm_client::{ChatMessage, LLMClient, LLMError};
use crate::types::{FailureAnalysis, FailureReport};

const BASE_PROMPT: &str = "You are 'Explain My Failure', a brutally honest analyst. \
Return concise, specific critiques. Avoid generic coaching. \
Use the user's context to surface patterns and actionable fixes.";

const OUTPUT_CONTRACT: &str = r#"Respond with a single JSON object and nothing else. It must have exactly these fields:
{
  "primary_root_cause": string,
  "secondary_causes": [string],
  "repeated_behavior_pattern": string,
  "false_beliefs_or_assumptions": [string],
  "harsh_truth": string,
  "corrective_actions": [string],
  "seven_day_recovery_plan": {"Day 1": string, "Day 2": string, "Day 3": string, "Day 4": string, "Day 5": string, "Day 6": string, "Day 7": string},
  "long_term_warning": string
}"#;

/// System prompt sent with every analysis
pub fn build_system_prompt() -> String {
    format!("{}\n\n{}", BASE_PROMPT, OUTPUT_CONTRACT)
}

fn render_optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "None".to_string())
}

/// Render the user prompt for a report. Absent signals print as `None`.
pub fn format_prompt(report: &FailureReport) -> String {
    format!(
        "\nFailure description:\n{}\n\nEffort level: {}\nPreparation hours: {}\nConfidence before: {}\n\nProvide a concise, structured diagnosis.\n",
        report.description,
        render_optional(report.effort_level),
        render_optional(report.preparation_hours),
        render_optional(report.confidence_before),
    )
}

// Drop a surrounding Markdown code fence, and any prose around the object
fn extract_json(reply: &str) -> &str {
    let trimmed = reply.trim();
    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) => {
            // skip the info string ("json") on the opening fence line
            let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
            body.trim_end().strip_suffix("```").unwrap_or(body).trim()
        }
        None => trimmed,
    };

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Parse a model reply into the analysis shape.
pub fn parse_structured_output(reply: &str) -> Result<FailureAnalysis, String> {
    let analysis: FailureAnalysis = serde_json::from_str(extract_json(reply))
        .map_err(|e| format!("Invalid analysis JSON: {}", e))?;
    analysis.check_recovery_plan()?;
    Ok(analysis)
}

/// Something that can diagnose a failure prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FailureAnalyzer: Send + Sync {
    async fn analyze(&self, prompt: &str) -> Result<FailureAnalysis, AgentError>;
}

/// Provider-backed analyzer
#[derive(Debug)]
pub struct AnalysisAgent {
    client: LLMClient,
    system_prompt: String,
    output_retries: u32,
}

impl AnalysisAgent {
    pub fn new(config: &AnalysisConfig) -> Result<Self, LLMError> {
        let client = LLMClient::new(config)?;
        tracing::info!(
            provider = client.provider(),
            model = client.model(),
            output_retries = config.output_retries,
            "Analysis agent initialized"
        );
        Ok(Self {
            client,
            system_prompt: build_system_prompt(),
            output_retries: config.output_retries,
        })
    }
}

#[async_trait]
impl FailureAnalyzer for AnalysisAgent {
    async fn analyze(&self, prompt: &str) -> Result<FailureAnalysis, AgentError> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];
        let mut retries = 0;

        loop {
            let reply = self.client.chat(&messages).await?;

            match parse_structured_output(&reply) {
                Ok(analysis) => return Ok(analysis),
                Err(detail) if retries < self.output_retries => {
                    retries += 1;
                    tracing::warn!(retry = retries, error = %detail, "Model output failed validation, retrying");
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!(
                        "Validation feedback:\n{}\n\nFix the errors and try again.",
                        detail
                    )));
                }
                Err(detail) => {
                    return Err(AgentError::Validation(format!(
                        "Exceeded maximum retries ({}) for output validation: {}",
                        self.output_retries, detail
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::generate_demo_response;

    fn sample_json() -> String {
        serde_json::to_string(&generate_demo_response("failed an exam", 5, 0, 5)).unwrap()
    }

    #[test]
    fn test_format_prompt_renders_missing_signals_as_none() {
        let report = FailureReport {
            description: "I failed my final exam after months of study".to_string(),
            effort_level: Some(8),
            preparation_hours: None,
            confidence_before: Some(0),
        };
        let prompt = format_prompt(&report);
        assert!(prompt.contains("Failure description:\nI failed my final exam after months of study"));
        assert!(prompt.contains("Effort level: 8"));
        assert!(prompt.contains("Preparation hours: None"));
        assert!(prompt.contains("Confidence before: 0"));
        assert!(prompt.trim_end().ends_with("Provide a concise, structured diagnosis."));
    }

    #[test]
    fn test_system_prompt_describes_contract() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("brutally honest"));
        assert!(prompt.contains("seven_day_recovery_plan"));
    }

    #[test]
    fn test_parse_plain_and_fenced_output() {
        let json = sample_json();
        assert!(parse_structured_output(&json).is_ok());

        let fenced = format!("```json\n{}\n```", json);
        assert!(parse_structured_output(&fenced).is_ok());

        let chatty = format!("Here is your diagnosis:\n{}\nGood luck.", json);
        assert!(parse_structured_output(&chatty).is_ok());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(parse_structured_output("not json at all").is_err());
        assert!(parse_structured_output(r#"{"primary_root_cause": "x"}"#).is_err());

        let mut value: serde_json::Value = serde_json::from_str(&sample_json()).unwrap();
        value["seven_day_recovery_plan"]
            .as_object_mut()
            .unwrap()
            .remove("Day 7");
        let err = parse_structured_output(&value.to_string()).unwrap_err();
        assert!(err.contains("seven_day_recovery_plan"));
    }
}
