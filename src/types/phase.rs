//! Liquid phase selection and the keyword set it implies.

use serde::Deserialize;

use super::FaceDirection;

/// Liquid phase whose fluxes and density the coupling reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidPhase {
    /// Water-CO2 systems (`FLOWAT*`, `WAT_DEN`).
    #[default]
    Water,
    /// Oil-CO2 black-oil setups (`FLOOIL*`, `OIL_DEN`).
    Oil,
}

impl LiquidPhase {
    /// Resolve the keyword set once.
    pub fn keywords(self) -> PhaseKeywords {
        let tag = match self {
            LiquidPhase::Water => "WAT",
            LiquidPhase::Oil => "OIL",
        };
        PhaseKeywords {
            flux: FaceDirection::ALL.map(|d| format!("FLO{}{}", tag, d.flux_suffix())),
            density: format!("{}_DEN", tag),
            component: match self {
                LiquidPhase::Water => "WATER",
                LiquidPhase::Oil => "OIL",
            },
        }
    }
}

/// Archive keywords and deck component name for one liquid phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseKeywords {
    flux: [String; 4],
    density: String,
    component: &'static str,
}

impl PhaseKeywords {
    /// Directional flux keyword, e.g. `FLOWATI+`.
    pub fn flux(&self, direction: FaceDirection) -> &str {
        let idx = FaceDirection::ALL
            .iter()
            .position(|d| *d == direction)
            .unwrap_or(0);
        &self.flux[idx]
    }

    /// Density keyword, e.g. `WAT_DEN`.
    pub fn density(&self) -> &str {
        &self.density
    }

    /// Component name in `BCPROP` rows.
    pub fn component(&self) -> &'static str {
        self.component
    }
}
