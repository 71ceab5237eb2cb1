//! Feature addressing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Address of a feature on a (possibly remote) SPINE device
///
/// Every part is optional on the wire. The textual form used in logs and on
/// the command line is `device:entity.entity:feature`, with `-` standing in
/// for a missing device or feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAddress {
    /// Device identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Entity path inside the device
    #[serde(default)]
    pub entity: Vec<u32>,
    /// Feature index inside the entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<u32>,
}

impl FeatureAddress {
    /// Create a fully qualified feature address
    pub fn new(device: impl Into<String>, entity: impl Into<Vec<u32>>, feature: u32) -> Self {
        Self {
            device: Some(device.into()),
            entity: entity.into(),
            feature: Some(feature),
        }
    }
}

impl fmt::Display for FeatureAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entity = self
            .entity
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");

        write!(f, "{}:{}:", self.device.as_deref().unwrap_or("-"), entity)?;
        match self.feature {
            Some(feature) => write!(f, "{}", feature),
            None => write!(f, "-"),
        }
    }
}

impl FromStr for FeatureAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Validation(format!("invalid feature address: {}", s));

        // Device ids may contain ':', so split the entity and feature off the right.
        let mut parts = s.rsplitn(3, ':');
        let feature = parts.next().ok_or_else(invalid)?;
        let entity = parts.next().ok_or_else(invalid)?;
        let device = parts.next().ok_or_else(invalid)?;

        let device = match device {
            "" | "-" => None,
            d => Some(d.to_string()),
        };
        let entity = if entity.is_empty() {
            Vec::new()
        } else {
            entity
                .split('.')
                .map(|e| e.parse::<u32>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>, _>>()?
        };
        let feature = match feature {
            "" | "-" => None,
            f => Some(f.parse::<u32>().map_err(|_| invalid())?),
        };

        Ok(Self {
            device,
            entity,
            feature,
        })
    }
}
