use serde_json::{Map, Value, json};

use crate::spec::block::{Block, BlockKind};
use crate::spec::form::FormSpec;
use crate::visibility::VisibilityMap;

/// JSON Schema describing the submission payload for the visible blocks.
pub fn generate(spec: &FormSpec, visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for block in spec
        .blocks
        .iter()
        .filter(|block| block.block_type().is_interactive())
        .filter(|block| visibility.get(&block.id).copied().unwrap_or(true))
    {
        properties.insert(block.id.clone(), block_schema(block));
        if block.is_required() {
            required.push(Value::String(block.id.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": spec.title,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn block_schema(block: &Block) -> Value {
    let mut schema = match &block.kind {
        BlockKind::SingleChoice(props) | BlockKind::Dropdown(props) => {
            if props.allow_other {
                json!({ "type": "string" })
            } else {
                json!({ "type": "string", "enum": props.options })
            }
        }
        BlockKind::MultipleChoice(props) => {
            let mut schema = json!({
                "type": "array",
                "items": { "type": "string" },
                "uniqueItems": true,
            });
            if let Some(min) = props.min_selections {
                schema["minItems"] = json!(min);
            }
            if let Some(max) = props.max_selections {
                schema["maxItems"] = json!(max);
            }
            schema
        }
        BlockKind::Text(props) | BlockKind::Textarea(props) => {
            let mut schema = json!({ "type": "string" });
            if let Some(min) = props.min_length {
                schema["minLength"] = json!(min);
            }
            if let Some(max) = props.max_length {
                schema["maxLength"] = json!(max);
            }
            schema
        }
        BlockKind::Email => json!({ "type": "string", "format": "email" }),
        BlockKind::Website => json!({ "type": "string", "format": "uri" }),
        BlockKind::Date(_) => json!({ "type": "string", "format": "date" }),
        BlockKind::Captcha(_) => json!({ "type": "string" }),
        BlockKind::Number(props) | BlockKind::Slider(props) => {
            let mut schema = json!({ "type": "number" });
            if let Some(min) = props.min {
                schema["minimum"] = json!(min);
            }
            if let Some(max) = props.max {
                schema["maximum"] = json!(max);
            }
            schema
        }
        BlockKind::Rating(props) => json!({ "type": "integer", "minimum": 1, "maximum": props.max }),
        BlockKind::YesNo | BlockKind::Consent => json!({ "type": "boolean" }),
        BlockKind::Phone(_) => json!({
            "type": "object",
            "properties": {
                "prefix": { "type": "string" },
                "number": { "type": "string" },
            },
            "required": ["number"],
        }),
        BlockKind::File(_) => json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "size": { "type": "integer", "minimum": 0 },
                    "mimeType": { "type": "string" },
                    "url": { "type": "string" },
                },
                "required": ["name", "size"],
            },
        }),
        BlockKind::Address(_) => json!({
            "type": "object",
            "properties": {
                "street": { "type": "string" },
                "city": { "type": "string" },
                "zip": { "type": "string" },
                "country": { "type": "string" },
            },
            "required": ["street", "city", "zip", "country"],
        }),
        BlockKind::Welcome(_)
        | BlockKind::Heading
        | BlockKind::Paragraph
        | BlockKind::Youtube(_)
        | BlockKind::MenuRestaurant(_)
        | BlockKind::Image(_) => json!({}),
    };

    if let Some(label) = &block.label {
        schema["title"] = json!(label);
    }
    if let Some(help) = &block.help_text {
        schema["description"] = json!(help);
    }
    schema
}
