use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::block::{Block, BlockType};

/// Presentation hints for a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormPresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub mode: PresentationMode,
}

/// Whether respondents see one block at a time or the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationMode {
    #[default]
    OneByOne,
    AllInOne,
}

/// Timing and pairing knobs for the one-by-one flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPolicy {
    #[serde(default = "default_auto_advance_ms")]
    pub auto_advance_ms: u64,
    #[serde(default = "default_choice_advance_ms")]
    pub choice_advance_ms: u64,
    #[serde(default = "default_pair_headings")]
    pub pair_headings: bool,
}

fn default_auto_advance_ms() -> u64 {
    2_000
}

fn default_choice_advance_ms() -> u64 {
    400
}

fn default_pair_headings() -> bool {
    true
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            auto_advance_ms: default_auto_advance_ms(),
            choice_advance_ms: default_choice_advance_ms(),
            pair_headings: default_pair_headings(),
        }
    }
}

/// Top-level form document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<FormPresentation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<NavigationPolicy>,
    pub blocks: Vec<Block>,
}

fn default_version() -> String {
    "1".into()
}

impl FormSpec {
    pub fn new(id: impl Into<String>, title: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            version: default_version(),
            description: None,
            presentation: None,
            settings: None,
            blocks,
        }
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    pub fn policy(&self) -> NavigationPolicy {
        self.settings.unwrap_or_default()
    }

    pub fn mode(&self) -> PresentationMode {
        self.presentation
            .as_ref()
            .map(|presentation| presentation.mode)
            .unwrap_or_default()
    }

    pub fn help(&self) -> Option<&str> {
        self.presentation
            .as_ref()
            .and_then(|presentation| presentation.intro.as_deref())
            .or(self.description.as_deref())
    }

    /// Key that orders welcome blocks ahead of every other block.
    pub(crate) fn sequence_key(&self, id: &str) -> Option<(bool, usize)> {
        let position = self.position(id)?;
        let is_form = self.blocks[position].block_type() != BlockType::Welcome;
        Some((is_form, position))
    }
}
