//! Conditional visibility.
//!
//! Precedence when a block carries several rules:
//!
//! | hide rule fired | show rules (with conditions) | any show fired | visible |
//! |-----------------|------------------------------|----------------|---------|
//! | yes             | any                          | any            | no      |
//! | no              | none                         | n/a            | yes     |
//! | no              | some                         | yes            | yes     |
//! | no              | some                         | no             | no      |
//!
//! Rules without conditions never fire and do not count as show rules.

use std::collections::BTreeMap;

use crate::answers::{AnswerValue, Answers};
use crate::spec::block::Block;
use crate::spec::form::FormSpec;
use crate::spec::rules::{
    Condition, ConditionOperator, LogicOperator, Operand, RuleAction, VisibilityRule,
};

pub type VisibilityMap = BTreeMap<String, bool>;

/// Decides whether `block` currently exists for the respondent.
pub fn is_visible(block: &Block, answers: &Answers, blocks: &[Block]) -> bool {
    let Some(visibility) = &block.visibility else {
        return true;
    };
    if !visibility.enabled || visibility.rules.is_empty() {
        return true;
    }

    let mut has_show_rule = false;
    let mut show_fired = false;
    for rule in visibility.rules.iter().filter(|rule| !rule.conditions.is_empty()) {
        let fired = rule_fires(rule, block, answers, blocks);
        match rule.action {
            RuleAction::Hide if fired => return false,
            RuleAction::Hide => {}
            RuleAction::Show => {
                has_show_rule = true;
                show_fired |= fired;
            }
        }
    }

    !has_show_rule || show_fired
}

/// Truth value of a rule: AND / OR over its conditions, false when empty.
pub fn rule_fires(rule: &VisibilityRule, owner: &Block, answers: &Answers, blocks: &[Block]) -> bool {
    if rule.conditions.is_empty() {
        return false;
    }
    let mut results = rule
        .conditions
        .iter()
        .map(|condition| condition_holds(condition, owner, answers, blocks));
    match rule.operator {
        LogicOperator::And => results.all(|holds| holds),
        LogicOperator::Or => results.any(|holds| holds),
    }
}

/// Evaluates one condition. Malformed conditions are simply not satisfied.
pub fn condition_holds(
    condition: &Condition,
    owner: &Block,
    answers: &Answers,
    blocks: &[Block],
) -> bool {
    if condition.block_id == owner.id {
        return false;
    }
    let Some(target) = blocks.iter().find(|block| block.id == condition.block_id) else {
        return false;
    };
    if !target.block_type().is_condition_target() {
        return false;
    }

    let Some(answer) = answers.get(&condition.block_id) else {
        // An unanswered target differs from every literal.
        return condition.operator == ConditionOperator::NotEquals;
    };

    match condition.operator {
        ConditionOperator::Equals => equals(answer, &condition.value),
        ConditionOperator::NotEquals => !equals(answer, &condition.value),
        ConditionOperator::Contains => contains(answer, &condition.value),
        ConditionOperator::GreaterThan => compare(answer, &condition.value, |a, b| a > b),
        ConditionOperator::LessThan => compare(answer, &condition.value, |a, b| a < b),
    }
}

fn equals(answer: &AnswerValue, operand: &Operand) -> bool {
    match answer {
        AnswerValue::Choices(items) => {
            let wanted = operand.as_text();
            items.iter().any(|item| item.trim() == wanted)
        }
        AnswerValue::Bool(flag) => operand.as_bool() == Some(*flag),
        AnswerValue::Number(number) => operand.as_number() == Some(*number),
        other => other
            .scalar_text()
            .is_some_and(|text| text == operand.as_text()),
    }
}

fn contains(answer: &AnswerValue, operand: &Operand) -> bool {
    let needle = operand.as_text();
    answer
        .scalar_text()
        .is_some_and(|haystack| haystack.contains(&needle))
}

fn compare(answer: &AnswerValue, operand: &Operand, op: impl Fn(f64, f64) -> bool) -> bool {
    match (answer.as_number(), operand.as_number()) {
        (Some(left), Some(right)) => op(left, right),
        _ => false,
    }
}

/// Visibility of every block in the form.
pub fn resolve_visibility(spec: &FormSpec, answers: &Answers) -> VisibilityMap {
    spec.blocks
        .iter()
        .map(|block| {
            (
                block.id.clone(),
                is_visible(block, answers, &spec.blocks),
            )
        })
        .collect()
}

/// Answers that belong to currently visible blocks; hidden answers stay in
/// the store but are never submitted.
pub fn visible_answers(spec: &FormSpec, answers: &Answers) -> Answers {
    let visible = resolve_visibility(spec, answers);
    answers
        .iter()
        .filter(|(id, _)| visible.get(id.as_str()).copied().unwrap_or(false))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect()
}

/// Visible blocks in form order.
pub fn visible_blocks<'a>(spec: &'a FormSpec, answers: &Answers) -> Vec<&'a Block> {
    spec.blocks
        .iter()
        .filter(|block| is_visible(block, answers, &spec.blocks))
        .collect()
}
