//! Stage identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three fixed transformation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// HDL source to JSON netlist.
    Synthesis,
    /// Netlist to placed and routed netlist.
    PlaceRoute,
    /// Placed netlist to device bitstream.
    Pack,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [Self; 3] = [Self::Synthesis, Self::PlaceRoute, Self::Pack];

    /// Returns the wire name of the stage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Synthesis => "synthesis",
            Self::PlaceRoute => "place-route",
            Self::Pack => "pack",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Synthesis.to_string(), "synthesis");
        assert_eq!(StageKind::PlaceRoute.to_string(), "place-route");
        assert_eq!(StageKind::Pack.to_string(), "pack");
    }

    #[test]
    fn test_stage_kind_serialize() {
        let json = serde_json::to_string(&StageKind::PlaceRoute).unwrap();
        assert_eq!(json, r#""place-route""#);

        let back: StageKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StageKind::PlaceRoute);
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(
            StageKind::ALL,
            [StageKind::Synthesis, StageKind::PlaceRoute, StageKind::Pack]
        );
    }
}
