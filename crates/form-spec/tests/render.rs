use form_spec::{
    AnswerValue, Answers, FormSpec, ManualClock, RuntimeBuilder, check_form, form_spec_schema,
    parse_form,
    render::{
        RenderStatus, build_page_payload, build_render_payload, build_step_payload,
        render_json_ui, render_text,
    },
};

fn fixture(name: &str) -> &'static str {
    match name {
        "contact_form" => include_str!("../tests/fixtures/contact_form.json"),
        "coffee_survey" => include_str!("../tests/fixtures/coffee_survey.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn survey() -> FormSpec {
    parse_form(fixture("coffee_survey")).expect("deserialize")
}

#[test]
fn render_text_includes_current_block() {
    let spec = survey();
    let payload = build_render_payload(&spec, &Answers::new());

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.current_block_id.as_deref(), Some("name"));

    let text = render_text(&payload);
    assert!(text.contains("Current block: name"));
    assert!(text.contains("Visible blocks:"));
    assert!(text.contains("Help: Two minutes about your coffee habits."));
}

#[test]
fn labels_pipe_previous_answers() {
    let spec = survey();
    let mut answers = Answers::new();
    answers.insert("name".into(), AnswerValue::Text("Ada".into()));
    let payload = build_render_payload(&spec, &answers);

    let drinks = payload
        .blocks
        .iter()
        .find(|block| block.id == "drinks-coffee")
        .expect("block");
    assert_eq!(drinks.label, "Do you drink coffee, Ada?");
    let email = payload
        .blocks
        .iter()
        .find(|block| block.id == "email")
        .expect("block");
    assert_eq!(
        email.help_text.as_deref(),
        Some("We will only send the results, Ada.")
    );
}

#[test]
fn render_json_ui_exposes_structure() {
    let spec = survey();
    let mut answers = Answers::new();
    answers.insert("name".into(), AnswerValue::Text("Ada".into()));
    answers.insert("drinks-coffee".into(), AnswerValue::Bool(true));
    answers.insert(
        "favorites".into(),
        AnswerValue::Choices(vec!["Latte".into()]),
    );
    let payload = build_render_payload(&spec, &answers);
    assert_eq!(payload.status, RenderStatus::Complete);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["form_id"], "coffee-survey");
    assert_eq!(ui["mode"], "one-by-one");
    assert_eq!(ui["progress"]["answered"], 3);
    assert_eq!(ui["progress"]["total"], 7);
    let blocks = ui["blocks"].as_array().expect("blocks array");
    let favorites = blocks
        .iter()
        .find(|block| block["id"] == "favorites")
        .expect("favorites");
    assert_eq!(favorites["visible"], true);
    assert_eq!(favorites["current_value"][0], "Latte");
    assert_eq!(favorites["options"].as_array().map(Vec::len), Some(3));
}

#[test]
fn step_payload_follows_the_navigator() {
    let spec: FormSpec = parse_form(fixture("contact_form")).expect("deserialize");
    let mut nav = RuntimeBuilder::new(spec)
        .with_clock(ManualClock::new())
        .build_navigator();
    nav.advance(None);
    nav.advance(None);

    let payload = build_step_payload(&nav);
    assert_eq!(payload.current_block_id.as_deref(), Some("choice"));
    let choice = payload
        .blocks
        .iter()
        .find(|block| block.id == "choice")
        .expect("block");
    assert_eq!(
        choice.error.as_ref().map(|error| error.code()),
        Some("missing_required")
    );
    let text = render_text(&payload);
    assert!(text.contains("  1. A"));
    assert!(text.contains("! Please select an option"));
}

#[test]
fn page_payload_carries_errors_and_scroll_target() {
    let spec: FormSpec = parse_form(fixture("contact_form")).expect("deserialize");
    let mut page = RuntimeBuilder::new(spec)
        .with_clock(ManualClock::new())
        .build_page();
    page.record_answer("email", Some(AnswerValue::Text("x@y.com".into())));
    page.submit();

    let payload = build_page_payload(&page);
    let ui = render_json_ui(&payload);
    assert_eq!(ui["mode"], "all-in-one");
    assert_eq!(ui["scroll_target"], "choice");
    let choice = ui["blocks"]
        .as_array()
        .and_then(|blocks| blocks.iter().find(|block| block["id"] == "choice"))
        .expect("choice");
    assert_eq!(choice["error"]["code"], "missing_required");
}

#[test]
fn fixtures_pass_the_form_lint() {
    assert!(check_form(&survey()).is_ok());
    let contact = parse_form(fixture("contact_form")).expect("deserialize");
    assert!(check_form(&contact).is_ok());
}

#[test]
fn form_schema_describes_blocks() {
    let schema = form_spec_schema();
    assert!(schema.is_object());
    assert!(schema.to_string().contains("blocks"));
}
