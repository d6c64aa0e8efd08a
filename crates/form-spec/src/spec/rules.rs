use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Conditional visibility attached to a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<VisibilityRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RuleAction {
    Show,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LogicOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRule {
    pub id: String,
    pub action: RuleAction,
    #[serde(default)]
    pub operator: LogicOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// Literal compared against another block's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Operand {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Operand {
    pub fn as_text(&self) -> String {
        match self {
            Operand::Bool(flag) => flag.to_string(),
            Operand::Number(number) => format_number(*number),
            Operand::Text(text) => text.trim().to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(number) => Some(*number),
            Operand::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Operand::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Operand::Bool(flag) => Some(*flag),
            Operand::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            Operand::Number(_) => None,
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Text(value.to_string())
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Number(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub block_id: String,
    pub operator: ConditionOperator,
    pub value: Operand,
}

impl Condition {
    pub fn new(
        id: impl Into<String>,
        block_id: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<Operand>,
    ) -> Self {
        Self {
            id: id.into(),
            block_id: block_id.into(),
            operator,
            value: value.into(),
        }
    }
}

impl VisibilityRule {
    pub fn new(id: impl Into<String>, action: RuleAction, operator: LogicOperator) -> Self {
        Self {
            id: id.into(),
            action,
            operator,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

impl Visibility {
    pub fn rules(rules: Vec<VisibilityRule>) -> Self {
        Self {
            enabled: true,
            rules,
        }
    }
}

/// Integral values print without a fractional part so `3` matches `"3"`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
