use handlebars::Handlebars;
use serde_json::{Map, Value, json};

use crate::answers::Answers;
use crate::error::Result;

/// Answer piping for labels and help text, e.g. `Thanks {{answers.name}}!`.
///
/// Output is not HTML-escaped; renderers own escaping. Unknown references
/// render as empty strings.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(false);
        Self { handlebars }
    }

    pub fn render(&self, template: &str, answers: &Answers) -> Result<String> {
        Ok(self
            .handlebars
            .render_template(template, &template_context(answers))?)
    }

    /// Renders `template`, returning it unchanged when it has no placeholders
    /// or fails to render.
    pub fn render_or_raw(&self, template: &str, answers: &Answers) -> String {
        if !template.contains("{{") {
            return template.to_string();
        }
        match self.render(template, answers) {
            Ok(rendered) => rendered,
            Err(err) => {
                log::debug!("leaving template unrendered: {}", err);
                template.to_string()
            }
        }
    }
}

/// `{"answers": {...}}` with scalar answers flattened to display text.
fn template_context(answers: &Answers) -> Value {
    let values: Map<String, Value> = answers
        .iter()
        .map(|(id, answer)| {
            let value = answer
                .scalar_text()
                .map(Value::String)
                .unwrap_or_else(|| answer.to_json());
            (id.clone(), value)
        })
        .collect();
    json!({ "answers": values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::AnswerValue;

    #[test]
    fn pipes_answers_without_escaping() {
        let mut answers = Answers::new();
        answers.insert("name".into(), AnswerValue::Text("Ada & Co".into()));
        answers.insert(
            "toppings".into(),
            AnswerValue::Choices(vec!["olives".into(), "basil".into()]),
        );
        let engine = TemplateEngine::new();
        assert_eq!(
            engine
                .render("Hi {{answers.name}}, {{answers.toppings}}", &answers)
                .expect("render"),
            "Hi Ada & Co, olives, basil"
        );
    }

    #[test]
    fn missing_answers_render_empty_and_broken_templates_stay_raw() {
        let engine = TemplateEngine::new();
        let answers = Answers::new();
        assert_eq!(engine.render_or_raw("Hi {{answers.name}}!", &answers), "Hi !");
        assert_eq!(engine.render_or_raw("Hi {{#if}}", &answers), "Hi {{#if}}");
        assert_eq!(engine.render_or_raw("Plain", &answers), "Plain");
    }
}
