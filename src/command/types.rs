use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declarative aggregation spec as written by the caller, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpec {
    /// `funnel` or `retention`; inferred from `action` when omitted
    pub report: Option<String>,
    /// Record filter handed to the store scan
    pub query: Option<Value>,
    #[serde(default)]
    pub group: Vec<RawDimension>,
    #[serde(default)]
    pub calc: Vec<RawMetric>,
    /// Milestone event tracked by retention reports
    pub action: Option<String>,
    /// Minimum number of retention intervals reported per cohort
    pub periods: Option<u32>,
    /// Partition events by a shared attribute (event pivot)
    pub focus: Option<RawFocus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDimension {
    /// `user` (entity attribute) or `action` (anchor event attribute)
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Attribute the dimension reads
    pub meta: Option<String>,
    /// `value`, `monthly`, `weekly` or `ab`
    pub format: Option<String>,
    /// Anchor event name(s) for `action` dimensions
    pub attr: Option<OneOrMany>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetric {
    /// `total`, `avg` or `pct`
    pub calc: Option<String>,
    /// `action` (events) or `user` (entity attribute)
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Event name(s), or the attribute name for `user` metrics
    pub attr: Option<OneOrMany>,
    /// Event attribute to sum or match
    pub meta: Option<String>,
    /// Literal the attribute must equal
    pub value: Option<Value>,
    pub name: Option<String>,
    pub calc_name: Option<String>,
    pub by: Option<String>,
    pub cond: Option<RawCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCondition {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFocus {
    /// Event attribute linking the events of one unit
    pub meta: Option<String>,
    /// Extra event names that belong to a unit without feeding any metric
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}
