//! Sample-size labels attached to gem classifications.

use serde::{Deserialize, Serialize};

/// How much data backs a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Strong,
    Moderate,
    /// Too few samples to lean on
    #[default]
    Limited,
}

impl DataQuality {
    /// Label a sample size against a category's strong/moderate thresholds.
    pub fn from_sample(samples: u32, strong_at: u32, moderate_at: u32) -> Self {
        if samples >= strong_at {
            DataQuality::Strong
        } else if samples >= moderate_at {
            DataQuality::Moderate
        } else {
            DataQuality::Limited
        }
    }
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQuality::Strong => write!(f, "strong"),
            DataQuality::Moderate => write!(f, "moderate"),
            DataQuality::Limited => write!(f, "limited"),
        }
    }
}
