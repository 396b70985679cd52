//! Map view that mirrors terrain, critters and the HUD.

use anyhow::Result as AnyResult;
use critter_defence_core::{Amount, CritterId, MapEvent, Result};
use critter_defence_observe::{Delta, Observer, ObserverVec};
use critter_defence_world::{Critter, MapGrid};
use indexmap::IndexMap;

use crate::{CellVisual, Color, CritterVisual, Hud, Layout, Renderer, TowerUIManager, VisualState};

/// Map view listening to map events and critter membership changes.
///
/// MapUI keeps its own copy of the terrain, patched from
/// [`MapEvent::TopologyChanged`], and one sprite per critter announced by the
/// critter manager. Sprite positions follow the snapshot passed to
/// [`MapUI::refresh`].
#[derive(Debug)]
pub struct MapUI {
    layout: Layout,
    map: MapGrid,
    critters: IndexMap<CritterId, CritterVisual>,
    hud: Hud,
    banner: Option<String>,
}

impl MapUI {
    /// Creates the view from the initial map.
    #[must_use]
    pub fn new(map: MapGrid, layout: Layout, base_health: u32) -> Self {
        Self {
            layout,
            map,
            critters: IndexMap::new(),
            hud: Hud {
                base_health,
                max_base_health: base_health,
                ..Hud::default()
            },
            banner: None,
        }
    }

    /// Current status line.
    #[must_use]
    pub const fn hud(&self) -> Hud {
        self.hud
    }

    /// Message from the latest map event.
    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Terrain as currently shown.
    #[must_use]
    pub fn map(&self) -> &MapGrid {
        &self.map
    }

    /// Critters currently shown, in spawn order.
    #[must_use]
    pub fn critter_ids(&self) -> Vec<CritterId> {
        self.critters.keys().copied().collect()
    }

    /// Moves sprites to the positions in `critters` and records the balance.
    ///
    /// Critters that have not been announced yet are ignored.
    pub fn refresh(&mut self, critters: &[Critter], balance: Amount) {
        self.hud.balance = balance;
        for critter in critters {
            if let Some(visual) = self.critters.get_mut(&critter.id()) {
                *visual = critter_visual(critter, self.layout);
            }
        }
    }

    /// Assembles the frame for the terrain, the critters and `towers`.
    #[must_use]
    pub fn visual_state(&self, towers: &TowerUIManager) -> VisualState {
        let cells = self
            .map
            .coords()
            .filter_map(|cell| {
                self.map.cell(cell).map(|kind| CellVisual {
                    cell,
                    origin: self.layout.cell_origin(cell),
                    color: Color::for_cell(kind),
                })
            })
            .collect();
        VisualState {
            cells,
            critters: self.critters.values().copied().collect(),
            towers: towers.visuals(),
            hud: self.hud,
            banner: self.banner.clone(),
        }
    }

    /// Hands the current frame to `renderer`.
    pub fn draw(&self, towers: &TowerUIManager, renderer: &mut dyn Renderer) -> AnyResult<()> {
        renderer.draw(&self.visual_state(towers))
    }
}

impl Observer<MapEvent> for MapUI {
    fn update(&mut self, event: &MapEvent) -> Result<()> {
        match *event {
            MapEvent::WaveStarted { wave } => {
                self.hud.wave = wave;
                self.banner = Some(format!("Wave {wave}"));
            }
            MapEvent::WaveCleared { wave } => {
                self.banner = Some(format!("Wave {wave} cleared"));
            }
            MapEvent::BaseDamaged { remaining } => self.hud.base_health = remaining,
            MapEvent::BaseBreached => {
                self.hud.base_health = 0;
                self.banner = Some(String::from("Base breached"));
            }
            MapEvent::TopologyChanged { cell, kind } => {
                let _ = self.map.set(cell, kind)?;
            }
        }
        Ok(())
    }
}

impl ObserverVec<Critter> for MapUI {
    fn update(&mut self, delta: &Delta<Critter>) -> Result<()> {
        for critter in delta.removed() {
            let _ = self.critters.shift_remove(&critter.id());
        }
        for critter in delta.added() {
            let _ = self
                .critters
                .insert(critter.id(), critter_visual(critter, self.layout));
        }
        Ok(())
    }
}

fn critter_visual(critter: &Critter, layout: Layout) -> CritterVisual {
    let health_fraction = if critter.max_health() == 0 {
        0.0
    } else {
        critter.health() as f32 / critter.max_health() as f32
    };
    CritterVisual {
        id: critter.id(),
        position: layout.cell_center(critter.cell()),
        health_fraction,
        color: Color::for_critter(critter.kind()),
    }
}
