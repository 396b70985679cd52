#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation observers that turn simulation notifications into visual state.
//!
//! Nothing in this crate mutates the simulation except [`PanelInput`], which
//! forwards queued player commands to the tower manager. The observers only
//! ever see value snapshots and [`VisualState`] is plain data handed to a
//! [`Renderer`].

mod map_ui;
mod panel;
mod tower_ui;

use anyhow::Result as AnyResult;
use critter_defence_core::{Amount, CellCoord, CellKind, CritterId, CritterKind, TowerId, TowerKind};
use glam::Vec2;

pub use map_ui::MapUI;
pub use panel::{PanelCommand, PanelEvent, PanelInput, PanelOutcome};
pub use tower_ui::{TowerUI, TowerUIManager};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Fill color of a terrain cell.
    #[must_use]
    pub const fn for_cell(kind: CellKind) -> Self {
        match kind {
            CellKind::Scenery => Self::from_rgb_u8(46, 92, 52),
            CellKind::Path => Self::from_rgb_u8(168, 142, 98),
            CellKind::Entry => Self::from_rgb_u8(70, 120, 200),
            CellKind::Exit => Self::from_rgb_u8(200, 64, 64),
        }
    }

    /// Body color of a tower kind.
    #[must_use]
    pub const fn for_tower(kind: TowerKind) -> Self {
        match kind {
            TowerKind::Basic => Self::from_rgb_u8(120, 120, 130),
            TowerKind::Slow => Self::from_rgb_u8(80, 170, 220),
            TowerKind::Splash => Self::from_rgb_u8(230, 140, 40),
        }
    }

    /// Body color of a critter kind.
    #[must_use]
    pub const fn for_critter(kind: CritterKind) -> Self {
        match kind {
            CritterKind::Speedy => Self::from_rgb_u8(240, 220, 60),
            CritterKind::Tanky => Self::from_rgb_u8(90, 60, 40),
            CritterKind::Strong => Self::from_rgb_u8(170, 30, 60),
            CritterKind::Balanced => Self::from_rgb_u8(150, 90, 190),
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Maps grid cells to screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    cell_size: f32,
}

impl Layout {
    /// Creates a layout drawing every cell as a `cell_size` pixel square.
    #[must_use]
    pub const fn new(cell_size: f32) -> Self {
        Self { cell_size }
    }

    /// Side length of one cell in pixels.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Top-left corner of `cell`.
    #[must_use]
    pub fn cell_origin(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(cell.column() as f32, cell.row() as f32) * self.cell_size
    }

    /// Center of `cell`.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        self.cell_origin(cell) + Vec2::splat(self.cell_size * 0.5)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(32.0)
    }
}

/// One terrain square.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellVisual {
    /// Cell being drawn.
    pub cell: CellCoord,
    /// Top-left corner in pixels.
    pub origin: Vec2,
    /// Fill color.
    pub color: Color,
}

/// One critter sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CritterVisual {
    /// Critter being drawn.
    pub id: CritterId,
    /// Center in pixels.
    pub position: Vec2,
    /// Remaining health as a fraction of the starting health.
    pub health_fraction: f32,
    /// Body color.
    pub color: Color,
}

/// One tower sprite with its range indicator.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerVisual {
    /// Tower being drawn.
    pub id: TowerId,
    /// Center in pixels.
    pub position: Vec2,
    /// Radius of the range circle in pixels.
    pub range_radius: f32,
    /// Level text drawn on the tower.
    pub label: String,
    /// Body color.
    pub color: Color,
}

/// Status line values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hud {
    /// Current balance.
    pub balance: Amount,
    /// Latest announced wave.
    pub wave: u32,
    /// Remaining base health.
    pub base_health: u32,
    /// Base health at the start of the game.
    pub max_base_health: u32,
}

/// Everything a renderer needs to present one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisualState {
    /// Terrain, in row-major order.
    pub cells: Vec<CellVisual>,
    /// Live critters, in spawn order.
    pub critters: Vec<CritterVisual>,
    /// Live towers, in placement order.
    pub towers: Vec<TowerVisual>,
    /// Status line.
    pub hud: Hud,
    /// Message from the latest map event, if any.
    pub banner: Option<String>,
}

/// Backend capable of presenting a [`VisualState`].
///
/// Sprite and font lookup belongs to the backend.
pub trait Renderer {
    /// Presents one frame.
    fn draw(&mut self, state: &VisualState) -> AnyResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_center_is_half_a_cell_from_the_origin() {
        let layout = Layout::new(20.0);
        let cell = CellCoord::new(2, 3);

        assert_eq!(layout.cell_origin(cell), Vec2::new(40.0, 60.0));
        assert_eq!(layout.cell_center(cell), Vec2::new(50.0, 70.0));
    }

    #[test]
    fn lighten_moves_towards_white() {
        let color = Color::from_rgb_u8(0, 0, 0).lighten(0.5);
        assert_eq!(color.red, 0.5);
        assert_eq!(color.alpha, 1.0);
    }
}
