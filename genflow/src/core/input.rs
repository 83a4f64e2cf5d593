//! Pipeline input shared by every pipeline.

use crate::errors::GenflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device presets the rewrite collaborator can emulate.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewriteDevice {
    #[serde(rename = "iPhone 17 Pro Max")]
    IPhone17ProMax,
    #[serde(rename = "iPhone 17 Pro")]
    IPhone17Pro,
    #[serde(rename = "iPhone 17 Plus")]
    IPhone17Plus,
    #[serde(rename = "iPhone 17")]
    IPhone17,
    #[serde(rename = "iPhone 16 Pro Max")]
    IPhone16ProMax,
    #[serde(rename = "iPhone 16 Pro")]
    IPhone16Pro,
    #[serde(rename = "iPhone 16 Plus")]
    IPhone16Plus,
    #[serde(rename = "iPhone 16")]
    IPhone16,
    #[serde(rename = "iPhone 15 Pro Max")]
    IPhone15ProMax,
    #[serde(rename = "iPhone 15 Pro")]
    IPhone15Pro,
    #[serde(rename = "iPhone 15 Plus")]
    IPhone15Plus,
    #[serde(rename = "iPhone 15")]
    IPhone15,
    #[serde(rename = "iPhone 14 Pro Max")]
    IPhone14ProMax,
    #[serde(rename = "iPhone 14 Pro")]
    IPhone14Pro,
    #[serde(rename = "iPhone 14 Plus")]
    IPhone14Plus,
    #[serde(rename = "iPhone 14")]
    IPhone14,
    #[serde(rename = "iPhone 13 Pro Max")]
    IPhone13ProMax,
    #[serde(rename = "iPhone 13 Pro")]
    IPhone13Pro,
    #[serde(rename = "iPhone 13")]
    IPhone13,
    #[serde(rename = "iPhone 13 mini")]
    IPhone13Mini,
    #[serde(rename = "Ray-Ban Meta Smart Glasses")]
    RayBanMetaSmartGlasses,
}

impl RewriteDevice {
    /// Every preset, newest first.
    pub const ALL: [Self; 21] = [
        Self::IPhone17ProMax,
        Self::IPhone17Pro,
        Self::IPhone17Plus,
        Self::IPhone17,
        Self::IPhone16ProMax,
        Self::IPhone16Pro,
        Self::IPhone16Plus,
        Self::IPhone16,
        Self::IPhone15ProMax,
        Self::IPhone15Pro,
        Self::IPhone15Plus,
        Self::IPhone15,
        Self::IPhone14ProMax,
        Self::IPhone14Pro,
        Self::IPhone14Plus,
        Self::IPhone14,
        Self::IPhone13ProMax,
        Self::IPhone13Pro,
        Self::IPhone13,
        Self::IPhone13Mini,
        Self::RayBanMetaSmartGlasses,
    ];

    /// Returns the display name used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IPhone17ProMax => "iPhone 17 Pro Max",
            Self::IPhone17Pro => "iPhone 17 Pro",
            Self::IPhone17Plus => "iPhone 17 Plus",
            Self::IPhone17 => "iPhone 17",
            Self::IPhone16ProMax => "iPhone 16 Pro Max",
            Self::IPhone16Pro => "iPhone 16 Pro",
            Self::IPhone16Plus => "iPhone 16 Plus",
            Self::IPhone16 => "iPhone 16",
            Self::IPhone15ProMax => "iPhone 15 Pro Max",
            Self::IPhone15Pro => "iPhone 15 Pro",
            Self::IPhone15Plus => "iPhone 15 Plus",
            Self::IPhone15 => "iPhone 15",
            Self::IPhone14ProMax => "iPhone 14 Pro Max",
            Self::IPhone14Pro => "iPhone 14 Pro",
            Self::IPhone14Plus => "iPhone 14 Plus",
            Self::IPhone14 => "iPhone 14",
            Self::IPhone13ProMax => "iPhone 13 Pro Max",
            Self::IPhone13Pro => "iPhone 13 Pro",
            Self::IPhone13 => "iPhone 13",
            Self::IPhone13Mini => "iPhone 13 mini",
            Self::RayBanMetaSmartGlasses => "Ray-Ban Meta Smart Glasses",
        }
    }
}

impl fmt::Display for RewriteDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewriteDevice {
    type Err = GenflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| GenflowError::validation(format!("Unknown rewrite device: {s}")))
    }
}

/// Common input carried by every pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    /// Shared secret presented by the caller.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Whether generated media is passed through the rewrite collaborator.
    #[serde(default)]
    pub rewrite_enabled: bool,
    /// Device to emulate; the collaborator picks one when absent.
    #[serde(default)]
    pub rewrite_device: Option<RewriteDevice>,
}

impl PipelineInput {
    /// Creates an input without credentials or rewriting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the secret key.
    #[must_use]
    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = Some(key.into());
        self
    }

    /// Enables rewriting, optionally pinned to a device.
    #[must_use]
    pub fn with_rewrite(mut self, device: Option<RewriteDevice>) -> Self {
        self.rewrite_enabled = true;
        self.rewrite_device = device;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_serializes_display_name() {
        let json = serde_json::to_string(&RewriteDevice::IPhone15Pro).unwrap();
        assert_eq!(json, r#""iPhone 15 Pro""#);

        let back: RewriteDevice = serde_json::from_str(r#""iPhone 13 mini""#).unwrap();
        assert_eq!(back, RewriteDevice::IPhone13Mini);
    }

    #[test]
    fn test_device_names_round_trip_through_from_str() {
        for device in RewriteDevice::ALL {
            assert_eq!(device.as_str().parse::<RewriteDevice>().unwrap(), device);
        }
        assert!("Pixel 9".parse::<RewriteDevice>().is_err());
    }

    #[test]
    fn test_pipeline_input_deserialize_defaults() {
        let input: PipelineInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input, PipelineInput::default());

        let input: PipelineInput = serde_json::from_str(
            r#"{"secret_key": "s3cret", "rewrite_enabled": true, "rewrite_device": "Ray-Ban Meta Smart Glasses"}"#,
        )
        .unwrap();
        assert_eq!(input.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(input.rewrite_device, Some(RewriteDevice::RayBanMetaSmartGlasses));
    }

    #[test]
    fn test_pipeline_input_builders() {
        let input = PipelineInput::new()
            .with_secret_key("k")
            .with_rewrite(Some(RewriteDevice::IPhone16));
        assert!(input.rewrite_enabled);
        assert_eq!(input.rewrite_device, Some(RewriteDevice::IPhone16));
    }
}
