//! Usage statistics joined onto nodes for the heatmap view.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::edge::{clamp_unit, deserialize_unit};
use super::NodeId;

/// Per-node usage statistics over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatData {
    pub node_id: NodeId,
    /// Normalized usage intensity in `[0, 1]`.
    #[serde(deserialize_with = "deserialize_unit")]
    pub heat_score: f64,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub unique_sessions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_hit_at: Option<DateTime<Utc>>,
}

impl HeatData {
    pub fn new(node_id: NodeId, heat_score: f64, total_hits: u64, unique_sessions: u64) -> Self {
        Self {
            node_id,
            heat_score: clamp_unit(heat_score),
            total_hits,
            unique_sessions,
            last_hit_at: None,
        }
    }
}

/// Time window the heat statistics cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HeatPeriod {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "all")]
    All,
}

impl HeatPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatPeriod::Week => "7d",
            HeatPeriod::Month => "30d",
            HeatPeriod::Quarter => "90d",
            HeatPeriod::All => "all",
        }
    }
}

impl fmt::Display for HeatPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeatPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(HeatPeriod::Week),
            "30d" => Ok(HeatPeriod::Month),
            "90d" => Ok(HeatPeriod::Quarter),
            "all" => Ok(HeatPeriod::All),
            _ => Err(format!("unknown heat period '{}'", s)),
        }
    }
}
