//! Prompt Renderer - Render the classification template using Handlebars

use handlebars::Handlebars;
use serde::Serialize;

use crate::domain::Issue;
use crate::error::{Result, TriageError};

const CLASSIFY_TEMPLATE_NAME: &str = "classify";

/// Default issue classification prompt
pub const DEFAULT_CLASSIFY_TEMPLATE: &str = r#"Classify the following GitHub issue.

Decide whether it is urgent (needs attention right away: outages, data loss,
security problems, blocked users) and whether it is important (significant
impact on the project or its users, regardless of timing).

Respond with a single JSON object and nothing else:
{"urgency": "urgent" or null, "importance": "important" or null}

Issue #{{number}}: {{title}}

{{body}}
"#;

#[derive(Serialize)]
struct IssueContext<'a> {
    number: u64,
    title: &'a str,
    body: &'a str,
}

/// Renders the classification prompt for an issue
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl PromptRenderer {
    /// Create a renderer with the default template
    pub fn new() -> Self {
        // The built-in template is known to parse
        Self::with_template(DEFAULT_CLASSIFY_TEMPLATE).unwrap_or_else(|_| Self {
            handlebars: Handlebars::new(),
        })
    }

    /// Create a renderer with a custom template
    pub fn with_template(template: &str) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Issue text goes to a model, not a browser
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(CLASSIFY_TEMPLATE_NAME, template)
            .map_err(|e| TriageError::Config(format!("Invalid prompt template: {}", e)))?;
        Ok(Self { handlebars })
    }

    /// Render the prompt for one issue
    pub fn render_issue(&self, issue: &Issue) -> Result<String> {
        let context = IssueContext {
            number: issue.number,
            title: &issue.title,
            body: &issue.body,
        };
        self.handlebars
            .render(CLASSIFY_TEMPLATE_NAME, &context)
            .map_err(|e| TriageError::Validation(format!("Failed to render prompt: {}", e)))
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_includes_issue() {
        let renderer = PromptRenderer::new();
        let issue = Issue::new(42, "Login broken").with_body("Users get a 500");

        let prompt = renderer.render_issue(&issue).unwrap();

        assert!(prompt.contains("Issue #42: Login broken"));
        assert!(prompt.contains("Users get a 500"));
        assert!(prompt.contains("\"urgency\""));
    }

    #[test]
    fn test_custom_template() {
        let renderer = PromptRenderer::with_template("{{title}} / {{body}}").unwrap();
        let issue = Issue::new(1, "T").with_body("B");
        assert_eq!(renderer.render_issue(&issue).unwrap(), "T / B");
    }

    #[test]
    fn test_no_html_escaping() {
        let renderer = PromptRenderer::with_template("{{body}}").unwrap();
        let issue = Issue::new(1, "T").with_body("<b>a & b</b>");
        assert_eq!(renderer.render_issue(&issue).unwrap(), "<b>a & b</b>");
    }

    #[test]
    fn test_invalid_template_rejected() {
        let result = PromptRenderer::with_template("{{#if}}");
        assert!(matches!(result, Err(TriageError::Config(_))));
    }
}
