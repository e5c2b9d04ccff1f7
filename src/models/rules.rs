// src/models/rules.rs

//! Declarative per-site extraction rules.
//!
//! Each canonical field gets an ordered fallback chain; the extraction engine
//! keeps the first non-empty result. The four pharmacy adapters differ only
//! in these tables, not in code.

use serde::{Deserialize, Serialize};

/// One way to read a value out of a rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RuleSource {
    /// JSON pointer into the page's `<script type="application/ld+json">` blob
    JsonLd { pointer: String },

    /// JSON pointer into a hidden JSON payload carried in an element attribute
    EmbeddedJson {
        carrier: String,
        attr: String,
        pointer: String,
    },

    /// schema.org microdata lookup by `itemprop` name
    Microdata { itemprop: String },

    /// CSS selector, optionally reading an attribute instead of text,
    /// optionally post-filtered by a capture regex (group 1 wins, else group 0)
    Css {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attr: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
}

impl RuleSource {
    /// Shorthand for a plain text selector rule.
    pub fn css(selector: impl Into<String>) -> Self {
        RuleSource::Css {
            selector: selector.into(),
            attr: None,
            pattern: None,
        }
    }

    /// Shorthand for an attribute selector rule.
    pub fn css_attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        RuleSource::Css {
            selector: selector.into(),
            attr: Some(attr.into()),
            pattern: None,
        }
    }

    /// Shorthand for a text selector rule with a capture regex.
    pub fn css_pattern(selector: impl Into<String>, pattern: impl Into<String>) -> Self {
        RuleSource::Css {
            selector: selector.into(),
            attr: None,
            pattern: Some(pattern.into()),
        }
    }
}

/// Fallback chains for the scalar product fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRules {
    #[serde(default)]
    pub product_name: Vec<RuleSource>,
    #[serde(default)]
    pub site_code: Vec<RuleSource>,
    #[serde(default)]
    pub barcode: Vec<RuleSource>,
    #[serde(default)]
    pub brand: Vec<RuleSource>,
    #[serde(default)]
    pub product_description: Vec<RuleSource>,
    #[serde(default)]
    pub current_price: Vec<RuleSource>,
    #[serde(default)]
    pub original_price: Vec<RuleSource>,
    /// Explicit discount badge; wins over the two-price derivation
    #[serde(default)]
    pub discount_percentage: Vec<RuleSource>,
    #[serde(default)]
    pub image_url: Vec<RuleSource>,
}

/// How the category path is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRules {
    /// Multi-element selector; each matched element's text is one crumb
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb_selector: Option<String>,

    /// Fallback: a single delimited string (e.g. "Medicamentos > Vitaminas")
    #[serde(default)]
    pub path_chain: Vec<RuleSource>,

    /// Delimiter for `path_chain` values
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Site tokens meaning "home"; filtered out of the path
    #[serde(default)]
    pub home_tokens: Vec<String>,
}

// The derived Default would leave `separator` empty; the serde default only
// applies when deserializing.
impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            breadcrumb_selector: None,
            path_chain: Vec::new(),
            separator: default_separator(),
            home_tokens: Vec::new(),
        }
    }
}

fn default_separator() -> String {
    ">".to_string()
}

/// Prescription-requirement detection, per observed site patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PrescriptionRule {
    /// A badge states the sale condition; the product requires a prescription
    /// unless the badge text contains `free_token` (e.g. "Venta libre").
    /// The badge text becomes `prescription_type`.
    BadgeFreeToken { selector: String, free_token: String },

    /// An alert box mentions `keyword` (e.g. "receta") when a prescription is
    /// required; `label` becomes `prescription_type`.
    AlertKeyword {
        selector: String,
        keyword: String,
        label: String,
    },
}

/// Bank/financing promotional block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankOfferRules {
    /// Element carrying the bank name
    pub name_selector: String,
    /// Attribute to read the name from; text content when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_attr: Option<String>,
    /// Capture regex over the name value (group 1 = bank name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_pattern: Option<String>,
    /// Elements scanned for a Guaraní amount; first parseable match wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_selector: Option<String>,
    /// Elements scanned for a percentage; first match wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_selector: Option<String>,
}

/// Combined `site_code`-`barcode` text split rule (Farmacia Center's `.cod`).
/// The hyphenated form is authoritative; a single token only fills
/// `site_code` when the chains left it empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSplitRule {
    pub selector: String,
    #[serde(default = "default_code_separator")]
    pub separator: String,
}

fn default_code_separator() -> String {
    "-".to_string()
}

/// Full extraction rule table for one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteRules {
    #[serde(default)]
    pub fields: FieldRules,
    #[serde(default)]
    pub category: CategoryRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<PrescriptionRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_offer: Option<BankOfferRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_split: Option<CodeSplitRule>,
}
