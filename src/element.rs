//! Form element schema
//!
//! A form is an ordered list of typed elements. Each element carries a common
//! envelope (label, required flag, validation/layout/display settings) plus a
//! type-specific payload modeled as a closed enum, so that per-type fields
//! (choice options, currency code, date format) only exist on the variants
//! that actually use them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single `{label, value}` choice for `radio`/`select` elements.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

/// Raw wire shape of a choice option.
///
/// Early form definitions stored options as bare strings; later ones use
/// structured `{label, value}` pairs. Both shapes are accepted on input and
/// canonicalized to [`ChoiceOption`] before anything else sees them.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Structured { label: String, value: String },
    Legacy(String),
}

/// Canonical, non-empty option list for choice elements.
///
/// Choice elements (`radio`, `select`) must declare at least one option;
/// constructing or deserializing an empty list fails.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Vec<RawOption>")]
pub struct ChoiceOptions(Vec<ChoiceOption>);

impl ChoiceOptions {
    pub fn new(options: Vec<ChoiceOption>) -> Result<Self, String> {
        if options.is_empty() {
            return Err("choice elements must declare at least one option".to_string());
        }
        Ok(Self(options))
    }

    /// Whether any declared option carries this submitted value.
    pub fn contains_value(&self, value: &str) -> bool {
        self.0.iter().any(|option| option.value == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChoiceOption> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<RawOption>> for ChoiceOptions {
    type Error = String;

    fn try_from(raw: Vec<RawOption>) -> Result<Self, Self::Error> {
        let options = raw
            .into_iter()
            .map(|option| match option {
                RawOption::Structured { label, value } => ChoiceOption { label, value },
                // Legacy string options double as both label and value
                RawOption::Legacy(text) => ChoiceOption {
                    label: text.clone(),
                    value: text,
                },
            })
            .collect();
        Self::new(options)
    }
}

/// Where a choice element sources its options from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum OptionSource {
    /// Options are the literal values declared on the element.
    Values,
    /// Options are fetched from a remote URL at render time.
    Url { url: String },
    /// Options come from a named server-side resource.
    Resource { resource: String },
}

/// Type-specific settings for `date` elements.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Type-specific settings for `currency` elements.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CurrencyData {
    /// ISO 4217 currency code, e.g. "USD".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// The element type tag plus its type-specific payload.
///
/// Serialized with an adjacent `type` field so the wire shape stays flat:
/// `{"type": "radio", "options": [...], ...}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Number,
    Email,
    Select {
        options: ChoiceOptions,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<OptionSource>,
    },
    Textarea,
    Checkbox,
    Radio { options: ChoiceOptions },
    Password,
    Url,
    Phone,
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<DateData>,
    },
    Currency {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<CurrencyData>,
    },
    Html,
    Columns,
    Fieldset,
    Panel,
    Table,
    Tabs,
    Datasource {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<OptionSource>,
    },
    File,
    Signature,
}

impl ElementKind {
    /// Declared options for choice elements, `None` for everything else.
    pub fn options(&self) -> Option<&ChoiceOptions> {
        match self {
            Self::Radio { options } | Self::Select { options, .. } => Some(options),
            _ => None,
        }
    }

    /// Layout-only elements never receive submitted values and are skipped
    /// by the submission validator.
    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            Self::Html | Self::Columns | Self::Fieldset | Self::Panel | Self::Table | Self::Tabs
        )
    }
}

/// Declarative validation constraints on an element.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    /// Regex the full submitted string must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Inclusive numeric lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive numeric upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Inclusive minimum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Inclusive maximum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Overrides the default error message for any failed rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
}

/// Relative width of an element within the form grid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum ElementWidth {
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "1/3")]
    Third,
    #[serde(rename = "1/4")]
    Quarter,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LayoutSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<ElementWidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LabelPosition {
    Top,
    Left,
    Right,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LabelAlignment {
    Left,
    Center,
    Right,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ElementSize {
    Small,
    Medium,
    Large,
}

/// Presentation settings for an element's label and input affordances.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<LabelPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_alignment: Option<LabelAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ElementSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autofocus: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<String>,
}

/// One entry in a form's ordered element list.
///
/// The `id` is unique within its form and keys submitted values; elements
/// have no identity outside their form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormElement {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplaySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(flatten)]
    pub kind: ElementKind,
}
