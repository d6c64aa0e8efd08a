use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::spec::block::BlockKind;
use crate::spec::form::FormSpec;

/// Structural problem found in a form document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    pub message: String,
}

impl SpecIssue {
    fn block(block_id: &str, message: impl Into<String>) -> Self {
        Self {
            block_id: Some(block_id.to_string()),
            message: message.into(),
        }
    }
}

/// Checks the invariants the runtime relies on.
///
/// The runtime tolerates every issue reported here (broken conditions simply
/// never fire), so this is meant for authoring tools and CI.
pub fn check_form(spec: &FormSpec) -> Result<(), Vec<SpecIssue>> {
    let mut issues = Vec::new();

    if spec.id.trim().is_empty() {
        issues.push(SpecIssue {
            block_id: None,
            message: "form id cannot be empty".into(),
        });
    }

    let mut seen = HashSet::new();
    for block in &spec.blocks {
        if block.id.trim().is_empty() {
            issues.push(SpecIssue {
                block_id: None,
                message: "block id cannot be empty".into(),
            });
        }
        if !seen.insert(block.id.as_str()) {
            issues.push(SpecIssue::block(
                &block.id,
                format!("duplicate block id '{}'", block.id),
            ));
        }
    }

    for block in &spec.blocks {
        check_kind(block.id.as_str(), &block.kind, &mut issues);

        let Some(visibility) = &block.visibility else {
            continue;
        };
        for rule in &visibility.rules {
            for condition in &rule.conditions {
                if condition.block_id == block.id {
                    issues.push(SpecIssue::block(
                        &block.id,
                        format!("condition '{}' references its own block", condition.id),
                    ));
                    continue;
                }
                match spec.block(&condition.block_id) {
                    None => issues.push(SpecIssue::block(
                        &block.id,
                        format!(
                            "condition '{}' references unknown block '{}'",
                            condition.id, condition.block_id
                        ),
                    )),
                    Some(target) if !target.block_type().is_condition_target() => {
                        issues.push(SpecIssue::block(
                            &block.id,
                            format!(
                                "condition '{}' targets '{}' of type {}, which holds no comparable answer",
                                condition.id,
                                target.id,
                                target.block_type().as_str()
                            ),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn check_kind(id: &str, kind: &BlockKind, issues: &mut Vec<SpecIssue>) {
    match kind {
        BlockKind::SingleChoice(_) | BlockKind::Dropdown(_) | BlockKind::MultipleChoice(_)
            if kind.options().is_empty() =>
        {
            issues.push(SpecIssue::block(
                id,
                format!("{} block must declare options", kind.block_type().as_str()),
            ));
        }
        BlockKind::MultipleChoice(props) => {
            if let (Some(min), Some(max)) = (props.min_selections, props.max_selections)
                && min > max
            {
                issues.push(SpecIssue::block(
                    id,
                    "minSelections cannot exceed maxSelections",
                ));
            }
        }
        BlockKind::Number(range) | BlockKind::Slider(range) => {
            if let (Some(min), Some(max)) = (range.min, range.max)
                && min > max
            {
                issues.push(SpecIssue::block(
                    id,
                    format!("min '{}' cannot exceed max '{}'", min, max),
                ));
            }
        }
        BlockKind::Text(props) | BlockKind::Textarea(props) => {
            if let (Some(min), Some(max)) = (props.min_length, props.max_length)
                && min > max
            {
                issues.push(SpecIssue::block(id, "minLength cannot exceed maxLength"));
            }
        }
        BlockKind::Date(props) => {
            let parse = |raw: &Option<String>| {
                raw.as_deref()
                    .map(|value| value.parse::<jiff::civil::Date>())
            };
            match (parse(&props.min_date), parse(&props.max_date)) {
                (Some(Err(_)), _) | (_, Some(Err(_))) => {
                    issues.push(SpecIssue::block(id, "date bounds must be YYYY-MM-DD"))
                }
                (Some(Ok(min)), Some(Ok(max))) if min > max => {
                    issues.push(SpecIssue::block(id, "minDate cannot be after maxDate"))
                }
                _ => {}
            }
        }
        BlockKind::Phone(props) => {
            if let Some(default_prefix) = &props.default_prefix
                && !props.prefixes.is_empty()
                && props.prefix(default_prefix).is_none()
            {
                issues.push(SpecIssue::block(
                    id,
                    format!("default prefix '{}' is not declared", default_prefix),
                ));
            }
        }
        BlockKind::Rating(props) if props.max == 0 => {
            issues.push(SpecIssue::block(id, "rating max must be at least 1"));
        }
        _ => {}
    }
}
