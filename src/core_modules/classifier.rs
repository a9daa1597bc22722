// THEORY:
// The `classifier` module maps a sampled background color to a movement
// label. It is the decision layer of the pipeline, and it is deliberately a
// pure function over data: the entire mapping lives in a `ClassifierPolicy`
// value that can be loaded from JSON, so retuning a sheet never means
// recompiling the tool.
//
// Key architectural principles:
// 1.  **Two Tiers**: Exact-range rules run first. Each category owns an
//     inclusive RGB box, checked in declared order, first hit wins. Only
//     when no box contains the color do the dominance rules run, also in
//     declared order. Tier one encodes "this sheet uses these exact keys";
//     tier two encodes "reddish probably means walking" for sheets whose
//     export drifted the key colors.
// 2.  **Misses Are Data**: A color matching no rule is not an error. It maps
//     to the reserved `unknown` label, flows through grouping like any other
//     label, and surfaces in the report counts. The pipeline never aborts
//     because an artist picked an unexpected backdrop.
// 3.  **Order Is Meaning**: Boxes may overlap; rule order resolves the
//     overlap. The default table lists `attack` before `get_hit` because the
//     yellow box sits entirely inside the orange one.

use crate::core_modules::color::{Channel, Color};
use crate::error::{SpriteError, SpriteResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Label reserved for colors no rule claims. Policies may not define it.
pub const UNKNOWN_LABEL: &str = "unknown";

/// An inclusive axis-aligned box in RGB space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub min: Color,
    pub max: Color,
}

impl ColorRange {
    pub const fn new(min: Color, max: Color) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, color: Color) -> bool {
        self.min.red <= color.red
            && color.red <= self.max.red
            && self.min.green <= color.green
            && color.green <= self.max.green
            && self.min.blue <= color.blue
            && color.blue <= self.max.blue
    }

    fn is_well_formed(&self) -> bool {
        self.min.red <= self.max.red
            && self.min.green <= self.max.green
            && self.min.blue <= self.max.blue
    }
}

/// A first-tier rule: a category claiming an exact color box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// The movement category this rule assigns, e.g. `walking`.
    pub label: String,
    /// The inclusive RGB box of background colors that mean this category.
    pub range: ColorRange,
}

/// One channel's constraint inside a dominance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPattern {
    /// No constraint on this channel.
    Any,
    /// Strictly greater than both other channels.
    Dominant,
    /// Strictly above the given threshold.
    Above(Channel),
    /// Strictly below the given threshold.
    Below(Channel),
}

impl ChannelPattern {
    fn matches(&self, value: Channel, other_a: Channel, other_b: Channel) -> bool {
        match self {
            Self::Any => true,
            Self::Dominant => value > other_a && value > other_b,
            Self::Above(threshold) => value > *threshold,
            Self::Below(threshold) => value < *threshold,
        }
    }
}

/// A second-tier rule: three channel constraints that must all hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominanceRule {
    /// The movement category this rule assigns when it matches.
    pub label: String,
    pub red: ChannelPattern,
    pub green: ChannelPattern,
    pub blue: ChannelPattern,
}

impl DominanceRule {
    pub fn matches(&self, color: Color) -> bool {
        self.red.matches(color.red, color.green, color.blue)
            && self.green.matches(color.green, color.red, color.blue)
            && self.blue.matches(color.blue, color.red, color.green)
    }
}

/// The label a classified cell ends up with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MovementLabel {
    /// A category named by the policy.
    Category(String),
    /// No rule claimed the sampled color.
    Unknown,
}

impl MovementLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Category(name) => name,
            Self::Unknown => UNKNOWN_LABEL,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for MovementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete data-driven mapping from background colors to labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierPolicy {
    /// First tier, checked in order; the first containing box wins.
    pub categories: Vec<CategoryRule>,
    /// Second tier, checked in order when no box matched.
    pub fallbacks: Vec<DominanceRule>,
}

impl ClassifierPolicy {
    /// A policy with no rules. Every cell classifies as `unknown`.
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// Checks the policy is usable: labels are non-empty, nothing claims the
    /// reserved `unknown` label, and every box has `min <= max` per channel.
    pub fn validate(&self) -> SpriteResult<()> {
        for rule in &self.categories {
            validate_label(&rule.label)?;
            if !rule.range.is_well_formed() {
                return Err(SpriteError::policy(format!(
                    "category '{}' has an inverted range: min {} exceeds max {}",
                    rule.label, rule.range.min, rule.range.max
                )));
            }
        }
        for rule in &self.fallbacks {
            validate_label(&rule.label)?;
        }
        Ok(())
    }

    /// Every label the policy can assign, in first-mention order.
    pub fn labels(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .map(|rule| rule.label.as_str())
            .chain(self.fallbacks.iter().map(|rule| rule.label.as_str()))
            .filter(|label| seen.insert(*label))
            .collect()
    }

    pub fn from_json_file(path: &Path) -> SpriteResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json_pretty(&self) -> SpriteResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn validate_label(label: &str) -> SpriteResult<()> {
    if label.is_empty() {
        return Err(SpriteError::policy("rule with an empty label"));
    }
    if label == UNKNOWN_LABEL {
        return Err(SpriteError::policy(format!(
            "'{UNKNOWN_LABEL}' is reserved for unclassified cells and cannot be a rule label"
        )));
    }
    Ok(())
}

impl Default for ClassifierPolicy {
    /// The six-category table for primary-color keyed sheets: blue idle,
    /// red walking, purple jump, orange get_hit, green die, yellow attack.
    fn default() -> Self {
        let range = |label: &str, min: [u8; 3], max: [u8; 3]| CategoryRule {
            label: label.to_string(),
            range: ColorRange::new(min.into(), max.into()),
        };
        let rule = |label: &str, red, green, blue| DominanceRule {
            label: label.to_string(),
            red,
            green,
            blue,
        };
        use ChannelPattern::{Above, Any, Below, Dominant};

        Self {
            categories: vec![
                range("idle", [0, 0, 100], [100, 100, 255]),
                range("walking", [100, 0, 0], [255, 100, 100]),
                range("jump", [100, 0, 100], [255, 100, 255]),
                range("die", [0, 100, 0], [100, 255, 100]),
                // attack's yellow box sits inside get_hit's orange box, so
                // it must be listed first.
                range("attack", [200, 200, 0], [255, 255, 100]),
                range("get_hit", [100, 100, 0], [255, 255, 100]),
            ],
            fallbacks: vec![
                rule("idle", Any, Any, Dominant),
                rule("walking", Dominant, Any, Any),
                rule("jump", Above(150), Below(100), Above(150)),
                rule("attack", Above(150), Above(150), Below(100)),
                rule("get_hit", Above(150), Above(100), Below(150)),
                rule("die", Any, Dominant, Any),
            ],
        }
    }
}

/// Applies a validated policy to sampled colors.
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    policy: ClassifierPolicy,
}

impl MovementClassifier {
    pub fn new(policy: ClassifierPolicy) -> SpriteResult<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ClassifierPolicy {
        &self.policy
    }

    /// Maps one color to a label. Total and pure: every color yields a
    /// label, and the same color always yields the same label.
    pub fn classify(&self, color: Color) -> MovementLabel {
        for rule in &self.policy.categories {
            if rule.range.contains(color) {
                return MovementLabel::Category(rule.label.clone());
            }
        }
        for rule in &self.policy.fallbacks {
            if rule.matches(color) {
                return MovementLabel::Category(rule.label.clone());
            }
        }
        MovementLabel::Unknown
    }
}
