use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::rules::Visibility;

/// Fieldless discriminant of [`BlockKind`], handy for matching and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Welcome,
    Heading,
    Paragraph,
    SingleChoice,
    MultipleChoice,
    Text,
    Textarea,
    Email,
    Phone,
    Number,
    Slider,
    Date,
    YesNo,
    Consent,
    Captcha,
    File,
    Youtube,
    MenuRestaurant,
    Image,
    Dropdown,
    Rating,
    Address,
    Website,
}

impl BlockType {
    /// Blocks that never collect an answer and never block navigation.
    pub fn is_interactive(self) -> bool {
        !matches!(
            self,
            BlockType::Welcome
                | BlockType::Heading
                | BlockType::Paragraph
                | BlockType::Image
                | BlockType::Youtube
                | BlockType::MenuRestaurant
        )
    }

    /// Whether a visibility condition may reference a block of this type.
    ///
    /// Only blocks holding a comparable scalar (or a list of choices) qualify.
    pub fn is_condition_target(self) -> bool {
        matches!(
            self,
            BlockType::SingleChoice
                | BlockType::MultipleChoice
                | BlockType::Dropdown
                | BlockType::Text
                | BlockType::Textarea
                | BlockType::Email
                | BlockType::Phone
                | BlockType::Number
                | BlockType::Slider
                | BlockType::Date
                | BlockType::YesNo
                | BlockType::Consent
                | BlockType::Rating
                | BlockType::Website
        )
    }

    /// Choice inputs whose change events may pass through an empty state.
    pub fn is_confirming_choice(self) -> bool {
        matches!(self, BlockType::SingleChoice | BlockType::YesNo)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Welcome => "welcome",
            BlockType::Heading => "heading",
            BlockType::Paragraph => "paragraph",
            BlockType::SingleChoice => "single-choice",
            BlockType::MultipleChoice => "multiple-choice",
            BlockType::Text => "text",
            BlockType::Textarea => "textarea",
            BlockType::Email => "email",
            BlockType::Phone => "phone",
            BlockType::Number => "number",
            BlockType::Slider => "slider",
            BlockType::Date => "date",
            BlockType::YesNo => "yes-no",
            BlockType::Consent => "consent",
            BlockType::Captcha => "captcha",
            BlockType::File => "file",
            BlockType::Youtube => "youtube",
            BlockType::MenuRestaurant => "menu-restaurant",
            BlockType::Image => "image",
            BlockType::Dropdown => "dropdown",
            BlockType::Rating => "rating",
            BlockType::Address => "address",
            BlockType::Website => "website",
        }
    }
}

/// Options shared by single-choice and dropdown blocks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ChoiceProps {
    pub options: Vec<String>,
    /// Accept free text through the "other" sentinel.
    pub allow_other: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MultiChoiceProps {
    pub options: Vec<String>,
    pub allow_other: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_selections: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_selections: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TextProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Bounds for number and slider blocks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RangeProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

/// ISO-8601 calendar bounds (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DateProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
}

/// A dialling prefix and the number of national digits it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhonePrefix {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub digits: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PhoneProps {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<PhonePrefix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_prefix: Option<String>,
}

impl PhoneProps {
    pub fn prefix(&self, code: &str) -> Option<&PhonePrefix> {
        self.prefixes.iter().find(|prefix| prefix.code == code)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct FileProps {
    /// Per-file limit in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    /// MIME globs (`image/*`) or extensions (`.pdf`, `*.pdf`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_types: Vec<String>,
    pub multiple: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptchaProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_key: Option<String>,
}

/// Source for image and video blocks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MenuProps {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingProps {
    pub max: u32,
}

impl Default for RatingProps {
    fn default() -> Self {
        Self { max: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WelcomeProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
}

/// Type tag plus the property bag owned by that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockKind {
    Welcome(WelcomeProps),
    Heading,
    Paragraph,
    SingleChoice(ChoiceProps),
    MultipleChoice(MultiChoiceProps),
    Text(TextProps),
    Textarea(TextProps),
    Email,
    Phone(PhoneProps),
    Number(RangeProps),
    Slider(RangeProps),
    Date(DateProps),
    YesNo,
    Consent,
    Captcha(CaptchaProps),
    File(FileProps),
    Youtube(MediaProps),
    MenuRestaurant(MenuProps),
    Image(MediaProps),
    Dropdown(ChoiceProps),
    Rating(RatingProps),
    Address(AddressProps),
    Website,
}

impl BlockKind {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockKind::Welcome(_) => BlockType::Welcome,
            BlockKind::Heading => BlockType::Heading,
            BlockKind::Paragraph => BlockType::Paragraph,
            BlockKind::SingleChoice(_) => BlockType::SingleChoice,
            BlockKind::MultipleChoice(_) => BlockType::MultipleChoice,
            BlockKind::Text(_) => BlockType::Text,
            BlockKind::Textarea(_) => BlockType::Textarea,
            BlockKind::Email => BlockType::Email,
            BlockKind::Phone(_) => BlockType::Phone,
            BlockKind::Number(_) => BlockType::Number,
            BlockKind::Slider(_) => BlockType::Slider,
            BlockKind::Date(_) => BlockType::Date,
            BlockKind::YesNo => BlockType::YesNo,
            BlockKind::Consent => BlockType::Consent,
            BlockKind::Captcha(_) => BlockType::Captcha,
            BlockKind::File(_) => BlockType::File,
            BlockKind::Youtube(_) => BlockType::Youtube,
            BlockKind::MenuRestaurant(_) => BlockType::MenuRestaurant,
            BlockKind::Image(_) => BlockType::Image,
            BlockKind::Dropdown(_) => BlockType::Dropdown,
            BlockKind::Rating(_) => BlockType::Rating,
            BlockKind::Address(_) => BlockType::Address,
            BlockKind::Website => BlockType::Website,
        }
    }

    /// Declared options for choice-like blocks, empty otherwise.
    pub fn options(&self) -> &[String] {
        match self {
            BlockKind::SingleChoice(props) | BlockKind::Dropdown(props) => &props.options,
            BlockKind::MultipleChoice(props) => &props.options,
            _ => &[],
        }
    }
}

/// One form field or content unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Raw JSON default, converted with [`crate::AnswerValue::from_json`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: None,
            required: false,
            help_text: None,
            placeholder: None,
            default_value: None,
            visibility: None,
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    /// `required` only means something for blocks that collect answers.
    pub fn is_required(&self) -> bool {
        self.required && self.block_type().is_interactive()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}
