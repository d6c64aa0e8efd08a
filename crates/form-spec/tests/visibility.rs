use form_spec::{
    AnswerValue, Answers, Block, BlockKind, Condition, ConditionOperator, FormSpec,
    LogicOperator, RuleAction, Visibility, VisibilityRule, is_visible, resolve_visibility,
    spec::{ChoiceProps, MultiChoiceProps, RangeProps, TextProps},
    visible_answers, visible_blocks,
};

fn rule(action: RuleAction, operator: LogicOperator, conditions: Vec<Condition>) -> VisibilityRule {
    let mut rule = VisibilityRule::new(format!("{:?}", action), action, operator);
    rule.conditions = conditions;
    rule
}

fn equals(block_id: &str, value: &str) -> Condition {
    Condition::new(format!("eq-{}", block_id), block_id, ConditionOperator::Equals, value)
}

fn base_blocks() -> Vec<Block> {
    vec![
        Block::new(
            "color",
            BlockKind::SingleChoice(ChoiceProps {
                options: vec!["red".into(), "blue".into()],
                allow_other: false,
            }),
        ),
        Block::new("size", BlockKind::Number(RangeProps::default())),
        Block::new(
            "extras",
            BlockKind::MultipleChoice(MultiChoiceProps {
                options: vec!["cheese".into(), "olives".into()],
                ..Default::default()
            }),
        ),
        Block::new("note", BlockKind::Text(TextProps::default())),
        Block::new("intro", BlockKind::Heading),
    ]
}

fn target(visibility: Visibility) -> Block {
    Block::new("target", BlockKind::Text(TextProps::default())).with_visibility(visibility)
}

fn answers(entries: &[(&str, AnswerValue)]) -> Answers {
    entries
        .iter()
        .map(|(id, value)| (id.to_string(), value.clone()))
        .collect()
}

fn visible(block: &Block, answers: &Answers) -> bool {
    let mut blocks = base_blocks();
    blocks.push(block.clone());
    is_visible(block, answers, &blocks)
}

#[test]
fn blocks_without_rules_are_visible() {
    let block = Block::new("free", BlockKind::Email);
    assert!(visible(&block, &Answers::new()));

    let disabled = target(Visibility {
        enabled: false,
        rules: vec![rule(
            RuleAction::Show,
            LogicOperator::And,
            vec![equals("color", "red")],
        )],
    });
    assert!(visible(&disabled, &Answers::new()));
}

#[test]
fn rule_without_conditions_never_fires() {
    let block = target(Visibility::rules(vec![
        rule(RuleAction::Hide, LogicOperator::And, vec![]),
        rule(RuleAction::Show, LogicOperator::Or, vec![]),
    ]));
    assert!(visible(&block, &Answers::new()));
}

#[test]
fn precedence_between_show_and_hide_rules() {
    let block = target(Visibility::rules(vec![
        rule(
            RuleAction::Show,
            LogicOperator::And,
            vec![equals("color", "red")],
        ),
        rule(
            RuleAction::Hide,
            LogicOperator::And,
            vec![Condition::new(
                "big",
                "size",
                ConditionOperator::GreaterThan,
                10.0,
            )],
        ),
    ]));

    let red_small = answers(&[
        ("color", AnswerValue::Choice("red".into())),
        ("size", AnswerValue::Number(3.0)),
    ]);
    let red_big = answers(&[
        ("color", AnswerValue::Choice("red".into())),
        ("size", AnswerValue::Number(30.0)),
    ]);
    let blue_small = answers(&[
        ("color", AnswerValue::Choice("blue".into())),
        ("size", AnswerValue::Number(3.0)),
    ]);

    // show fired, hide silent
    assert!(visible(&block, &red_small));
    // hide wins over a fired show
    assert!(!visible(&block, &red_big));
    // a show rule exists but nothing fired
    assert!(!visible(&block, &blue_small));
}

#[test]
fn any_show_rule_is_enough() {
    let block = target(Visibility::rules(vec![
        rule(
            RuleAction::Show,
            LogicOperator::And,
            vec![equals("color", "red")],
        ),
        rule(
            RuleAction::Show,
            LogicOperator::And,
            vec![equals("note", "vip")],
        ),
    ]));
    assert!(visible(
        &block,
        &answers(&[("note", AnswerValue::Text(" vip ".into()))])
    ));
}

#[test]
fn and_or_combine_conditions() {
    let conditions = vec![
        equals("color", "red"),
        Condition::new("small", "size", ConditionOperator::LessThan, 5.0),
    ];
    let all = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        conditions.clone(),
    )]));
    let any = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::Or,
        conditions,
    )]));
    let red_big = answers(&[
        ("color", AnswerValue::Choice("red".into())),
        ("size", AnswerValue::Number(8.0)),
    ]);
    assert!(!visible(&all, &red_big));
    assert!(visible(&any, &red_big));
}

#[test]
fn unanswered_targets_only_satisfy_not_equals() {
    let not_red = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        vec![Condition::new(
            "not-red",
            "color",
            ConditionOperator::NotEquals,
            "red",
        )],
    )]));
    let red = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        vec![equals("color", "red")],
    )]));
    assert!(visible(&not_red, &Answers::new()));
    assert!(!visible(&red, &Answers::new()));
}

#[test]
fn multiple_choice_uses_membership_and_contains() {
    let with_olives = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        vec![equals("extras", "olives")],
    )]));
    let mentions_che = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        vec![Condition::new(
            "che",
            "extras",
            ConditionOperator::Contains,
            "che",
        )],
    )]));
    let picked = answers(&[(
        "extras",
        AnswerValue::Choices(vec!["cheese".into(), "olives".into()]),
    )]);
    assert!(visible(&with_olives, &picked));
    assert!(visible(&mentions_che, &picked));

    let just_olives = answers(&[("extras", AnswerValue::Choices(vec!["olives".into()]))]);
    assert!(!visible(&mentions_che, &just_olives));
}

#[test]
fn numeric_comparisons_parse_operands() {
    let block = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        vec![Condition::new(
            "gt",
            "size",
            ConditionOperator::GreaterThan,
            "2.5",
        )],
    )]));
    assert!(visible(&block, &answers(&[("size", AnswerValue::Number(3.0))])));
    assert!(!visible(&block, &answers(&[("size", AnswerValue::Number(2.0))])));

    let on_text = target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        vec![Condition::new(
            "gt",
            "note",
            ConditionOperator::GreaterThan,
            1.0,
        )],
    )]));
    assert!(!visible(
        &on_text,
        &answers(&[("note", AnswerValue::Text("many".into()))])
    ));
}

#[test]
fn invalid_targets_never_hold() {
    let self_reference = target(Visibility::rules(vec![rule(
        RuleAction::Hide,
        LogicOperator::And,
        vec![Condition::new(
            "self",
            "target",
            ConditionOperator::NotEquals,
            "x",
        )],
    )]));
    assert!(visible(&self_reference, &Answers::new()));

    let dangling = target(Visibility::rules(vec![rule(
        RuleAction::Hide,
        LogicOperator::And,
        vec![Condition::new(
            "gone",
            "deleted-block",
            ConditionOperator::NotEquals,
            "x",
        )],
    )]));
    assert!(visible(&dangling, &Answers::new()));

    let heading = target(Visibility::rules(vec![rule(
        RuleAction::Hide,
        LogicOperator::And,
        vec![Condition::new(
            "heading",
            "intro",
            ConditionOperator::NotEquals,
            "x",
        )],
    )]));
    assert!(visible(&heading, &Answers::new()));
}

#[test]
fn evaluation_is_pure() {
    let mut blocks = base_blocks();
    blocks.push(target(Visibility::rules(vec![rule(
        RuleAction::Show,
        LogicOperator::And,
        vec![equals("color", "blue")],
    )])));
    let spec = FormSpec::new("pure", "Pure", blocks);
    let answers = answers(&[
        ("color", AnswerValue::Choice("blue".into())),
        ("target", AnswerValue::Text("kept".into())),
    ]);

    let first = resolve_visibility(&spec, &answers);
    let second = resolve_visibility(&spec, &answers);
    assert_eq!(first, second);
    assert_eq!(first.get("target"), Some(&true));
    assert_eq!(visible_blocks(&spec, &answers).len(), spec.blocks.len());

    let red = {
        let mut changed = answers.clone();
        changed.insert("color".into(), AnswerValue::Choice("red".into()));
        changed
    };
    assert!(!visible_answers(&spec, &red).contains_key("target"));
    assert!(visible_answers(&spec, &answers).contains_key("target"));
}
