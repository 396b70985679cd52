//! Tower proxies kept in step with the tower manager.

use critter_defence_core::{CellCoord, EntityKey, Error, Result, TowerId, TowerKind};
use critter_defence_observe::{Delta, ObserverVec};
use critter_defence_world::Tower;
use glam::Vec2;
use indexmap::IndexMap;

use crate::{Color, Layout, TowerVisual};

/// Visual proxy for one live tower.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerUI {
    id: TowerId,
    kind: TowerKind,
    cell: CellCoord,
    level: u32,
    range: u32,
    layout: Layout,
}

impl TowerUI {
    /// Creates the proxy from a tower snapshot.
    #[must_use]
    pub fn new(tower: &Tower, layout: Layout) -> Self {
        Self {
            id: tower.id(),
            kind: tower.kind(),
            cell: tower.cell(),
            level: tower.level(),
            range: tower.range(),
            layout,
        }
    }

    /// Tower this proxy draws.
    #[must_use]
    pub const fn id(&self) -> TowerId {
        self.id
    }

    /// Level shown on the label.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Center of the tower in pixels.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.layout.cell_center(self.cell)
    }

    /// Radius of the range circle in pixels.
    #[must_use]
    pub fn range_radius(&self) -> f32 {
        self.range as f32 * self.layout.cell_size()
    }

    /// Level text drawn on the tower.
    #[must_use]
    pub fn label(&self) -> String {
        format!("L{}", self.level)
    }

    /// Picks up level and range changes from a later snapshot.
    pub fn refresh(&mut self, tower: &Tower) {
        self.level = tower.level();
        self.range = tower.range();
    }

    /// Sprite description for the renderer.
    #[must_use]
    pub fn visual(&self) -> TowerVisual {
        // Each level above the first lightens the body.
        let lift = (self.level.saturating_sub(1) as f32 * 0.15).min(0.6);
        TowerVisual {
            id: self.id,
            position: self.position(),
            range_radius: self.range_radius(),
            label: self.label(),
            color: Color::for_tower(self.kind).lighten(lift),
        }
    }
}

/// Keeps exactly one [`TowerUI`] per live tower.
///
/// Proxies are created and destroyed inside the tower manager's notification
/// pass. A delta that adds a tower already shown, or removes one that is not,
/// fails the pass and leaves the proxies untouched.
#[derive(Debug)]
pub struct TowerUIManager {
    layout: Layout,
    proxies: IndexMap<TowerId, TowerUI>,
}

impl TowerUIManager {
    /// Creates a manager with no proxies.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            proxies: IndexMap::new(),
        }
    }

    /// Number of proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Reports whether no tower is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Proxy for `id`.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&TowerUI> {
        self.proxies.get(&id)
    }

    /// Towers shown, in placement order.
    #[must_use]
    pub fn ids(&self) -> Vec<TowerId> {
        self.proxies.keys().copied().collect()
    }

    /// Updates proxies from the latest tower snapshot.
    pub fn refresh(&mut self, towers: &[Tower]) {
        for tower in towers {
            if let Some(proxy) = self.proxies.get_mut(&tower.id()) {
                proxy.refresh(tower);
            }
        }
    }

    /// Sprite descriptions for every proxy.
    #[must_use]
    pub fn visuals(&self) -> Vec<TowerVisual> {
        self.proxies.values().map(TowerUI::visual).collect()
    }
}

impl ObserverVec<Tower> for TowerUIManager {
    fn update(&mut self, delta: &Delta<Tower>) -> Result<()> {
        for tower in delta.removed() {
            if !self.proxies.contains_key(&tower.id()) {
                return Err(Error::UnknownId(EntityKey::Tower(tower.id())));
            }
        }
        for tower in delta.added() {
            if self.proxies.contains_key(&tower.id()) {
                return Err(Error::DuplicateId(EntityKey::Tower(tower.id())));
            }
        }

        for tower in delta.removed() {
            let _ = self.proxies.shift_remove(&tower.id());
        }
        for tower in delta.added() {
            let _ = self
                .proxies
                .insert(tower.id(), TowerUI::new(tower, self.layout));
        }
        log::debug!("showing {} towers", self.proxies.len());
        Ok(())
    }
}
