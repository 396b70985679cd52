use std::{cell::RefCell, rc::Rc};

use anyhow::Result as AnyResult;
use critter_defence_core::{
    CellCoord, CellKind, CritterKind, Error, GridSize, MapEvent, SpecViolation, TowerKind,
};
use critter_defence_observe::Observable;
use critter_defence_presentation::{
    Layout, MapUI, PanelCommand, PanelEvent, PanelInput, PanelOutcome, Renderer, TowerUIManager,
    VisualState,
};
use critter_defence_world::{
    CritterManager, CritterSpec, Economy, MapGrid, Purse, TowerManager, TowerSpec,
};

#[derive(Default)]
struct RecordingRenderer {
    frames: Vec<VisualState>,
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, state: &VisualState) -> AnyResult<()> {
        self.frames.push(state.clone());
        Ok(())
    }
}

#[test]
fn placed_tower_gets_one_proxy_after_commit() {
    let map = Rc::new(RefCell::new(MapGrid::new(GridSize::new(6, 6))));
    let purse = Purse::shared(100);
    let towers = TowerManager::new(map, purse.clone(), 60, 8);
    let ui = Rc::new(RefCell::new(TowerUIManager::new(Layout::default())));
    towers.attach(ui.clone()).expect("attach");

    let id = towers
        .place(TowerSpec::new(TowerKind::Basic, CellCoord::new(2, 3)).with_cost(50))
        .expect("place");
    assert_eq!(purse.borrow().balance(), 50);
    assert!(ui.borrow().is_empty());

    let _ = towers.commit().expect("commit");

    assert_eq!(ui.borrow().ids(), vec![id]);
}

#[test]
fn sold_tower_loses_its_proxy_in_the_same_pass() {
    let map = Rc::new(RefCell::new(MapGrid::new(GridSize::new(6, 6))));
    let towers = TowerManager::new(map, Purse::shared(500), 60, 8);
    let ui = Rc::new(RefCell::new(TowerUIManager::new(Layout::default())));
    towers.attach(ui.clone()).expect("attach");
    let id = towers
        .place(TowerSpec::new(TowerKind::Slow, CellCoord::new(1, 1)))
        .expect("place");
    let _ = towers.commit().expect("commit");

    let _ = towers.sell(id).expect("sell");
    let _ = towers.commit().expect("commit");

    assert!(ui.borrow().is_empty());
}

#[test]
fn panel_reports_every_result_in_order() {
    let map = Rc::new(RefCell::new(MapGrid::new(GridSize::new(6, 6))));
    let purse = Purse::shared(280);
    let towers = Rc::new(TowerManager::new(map, purse.clone(), 60, 8));
    let mut panel = PanelInput::new(Rc::clone(&towers));
    let cell = CellCoord::new(2, 2);

    panel.push(PanelEvent::new(PanelCommand::Select(TowerKind::Splash), cell));
    panel.push(PanelEvent::new(PanelCommand::Place, cell));
    panel.push(PanelEvent::new(PanelCommand::Place, cell));
    panel.push(PanelEvent::new(PanelCommand::Sell, CellCoord::new(4, 4)));
    panel.push(PanelEvent::new(PanelCommand::Upgrade, cell));
    assert_eq!(panel.pending(), 5);

    let results = panel.process();

    let id = towers.tower_at(cell).expect("tower").id();
    assert_eq!(
        results,
        vec![
            Ok(PanelOutcome::Selected(TowerKind::Splash)),
            Ok(PanelOutcome::Placed(id)),
            Err(Error::InvalidSpec(SpecViolation::Occupied(cell))),
            Err(Error::InvalidSpec(SpecViolation::Vacant(CellCoord::new(4, 4)))),
            Err(Error::InsufficientResources {
                required: 150,
                available: 130
            }),
        ]
    );
    assert_eq!(panel.pending(), 0);
    assert_eq!(purse.borrow().balance(), 130);
}

#[test]
fn map_view_tracks_events_and_critters() {
    let map = MapGrid::from_rows(&["E##X", "...."]).expect("layout");
    let critters = CritterManager::new(map.size(), 8);
    let events: Observable<MapEvent> = Observable::new();
    let view = Rc::new(RefCell::new(MapUI::new(map, Layout::new(10.0), 12)));
    critters.attach(view.clone()).expect("attach critters");
    events.attach(view.clone()).expect("attach events");

    let id = critters
        .spawn(
            CritterSpec::new(CritterKind::Balanced, 1, CellCoord::new(0, 0)),
            0,
        )
        .expect("spawn");
    assert!(view.borrow().critter_ids().is_empty());
    let _ = critters.commit().expect("commit");
    assert_eq!(view.borrow().critter_ids(), vec![id]);

    events
        .notify(&MapEvent::WaveStarted { wave: 2 })
        .expect("notify");
    events
        .notify(&MapEvent::BaseDamaged { remaining: 5 })
        .expect("notify");
    events
        .notify(&MapEvent::TopologyChanged {
            cell: CellCoord::new(1, 1),
            kind: CellKind::Path,
        })
        .expect("notify");

    let view_ref = view.borrow();
    assert_eq!(view_ref.hud().wave, 2);
    assert_eq!(view_ref.hud().base_health, 5);
    assert_eq!(view_ref.hud().max_base_health, 12);
    assert_eq!(view_ref.banner(), Some("Wave 2"));
    assert_eq!(view_ref.map().cell(CellCoord::new(1, 1)), Some(CellKind::Path));
    drop(view_ref);

    let _ = critters.remove(id).expect("remove");
    let _ = critters.commit().expect("commit");
    assert!(view.borrow().critter_ids().is_empty());
}

#[test]
fn frame_contains_terrain_critters_and_towers() {
    let grid = MapGrid::from_rows(&["E##X", "...."]).expect("layout");
    let critters = CritterManager::new(grid.size(), 8);
    let towers = TowerManager::new(
        Rc::new(RefCell::new(grid.clone())),
        Purse::shared(500),
        60,
        8,
    );
    let view = Rc::new(RefCell::new(MapUI::new(grid, Layout::new(10.0), 10)));
    let tower_ui = Rc::new(RefCell::new(TowerUIManager::new(Layout::new(10.0))));
    critters.attach(view.clone()).expect("attach view");
    towers.attach(tower_ui.clone()).expect("attach towers");

    let critter = critters
        .spawn(CritterSpec::new(CritterKind::Speedy, 1, CellCoord::new(0, 0)), 0)
        .expect("spawn");
    let _ = towers
        .place(TowerSpec::new(TowerKind::Basic, CellCoord::new(1, 1)))
        .expect("place");
    let _ = critters.commit().expect("commit");
    let _ = towers.commit().expect("commit");
    critters
        .modify(critter, |critter| critter.step_to(CellCoord::new(1, 0)))
        .expect("step");
    view.borrow_mut().refresh(&critters.snapshot(), 400);

    let mut renderer = RecordingRenderer::default();
    view.borrow()
        .draw(&tower_ui.borrow(), &mut renderer)
        .expect("draw");

    let frame = &renderer.frames[0];
    assert_eq!(frame.cells.len(), 8);
    assert_eq!(frame.critters.len(), 1);
    assert_eq!(frame.critters[0].position.x, 15.0);
    assert_eq!(frame.critters[0].health_fraction, 1.0);
    assert_eq!(frame.towers.len(), 1);
    assert_eq!(frame.towers[0].range_radius, 30.0);
    assert_eq!(frame.towers[0].label, "L1");
    assert_eq!(frame.hud.balance, 400);
}
