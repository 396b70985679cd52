use std::{cell::RefCell, rc::Rc};

use critter_defence_core::{
    CellCoord, CellKind, CritterEvent, CritterId, CritterKind, Effect, Error, Result,
};
use critter_defence_observe::Observer;
use critter_defence_system_critter_logic::CritterLogic;
use critter_defence_world::{BreadthFirst, CritterManager, CritterSpec, MapGrid};

#[derive(Default)]
struct EventLog {
    events: Vec<CritterEvent>,
}

impl Observer<CritterEvent> for EventLog {
    fn update(&mut self, event: &CritterEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}

struct Harness {
    map: Rc<RefCell<MapGrid>>,
    critters: Rc<CritterManager>,
    logic: Rc<RefCell<CritterLogic>>,
    log: Rc<RefCell<EventLog>>,
}

fn harness(rows: &[&str]) -> Harness {
    let map = Rc::new(RefCell::new(MapGrid::from_rows(rows).expect("layout")));
    let size = map.borrow().size();
    let critters = Rc::new(CritterManager::new(size, 8));
    let logic = Rc::new(RefCell::new(CritterLogic::new(
        Rc::clone(&critters),
        Rc::clone(&map),
        Box::new(BreadthFirst),
    )));
    critters.attach(logic.clone()).expect("attach logic");
    let log = Rc::new(RefCell::new(EventLog::default()));
    logic.borrow().events().attach(log.clone()).expect("attach log");
    Harness {
        map,
        critters,
        logic,
        log,
    }
}

fn spawn(harness: &Harness, kind: CritterKind, cell: (u32, u32), health: Option<u32>) -> CritterId {
    let mut spec = CritterSpec::new(kind, 1, CellCoord::new(cell.0, cell.1));
    if let Some(health) = health {
        spec = spec.with_health(health);
    }
    harness.critters.spawn(spec, 0).expect("spawn")
}

#[test]
fn committed_spawn_receives_a_route_to_the_exit() {
    let harness = harness(&["E##X"]);
    let id = spawn(&harness, CritterKind::Speedy, (0, 0), None);

    assert_eq!(harness.logic.borrow().route(id), None);
    let _ = harness.critters.commit().expect("commit");

    assert_eq!(
        harness.logic.borrow().route(id),
        Some(vec![
            CellCoord::new(1, 0),
            CellCoord::new(2, 0),
            CellCoord::new(3, 0)
        ])
    );
}

#[test]
fn splash_damages_every_critter_in_radius() {
    let harness = harness(&["E###X"]);
    let fragile = spawn(&harness, CritterKind::Balanced, (1, 0), Some(10));
    let sturdy = spawn(&harness, CritterKind::Balanced, (2, 0), None);
    let _ = harness.critters.commit().expect("commit");

    harness
        .logic
        .borrow_mut()
        .apply_effect(
            &Effect::Splash {
                target: fragile,
                center: CellCoord::new(1, 0),
                amount: 20,
                radius: 1,
            },
            7,
        )
        .expect("splash");

    let delivered = harness.critters.commit().expect("commit");
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].removed_ids(), vec![fragile]);
    assert_eq!(harness.critters.find(sturdy).expect("live").health(), 40);
    assert_eq!(
        harness.log.borrow().events,
        vec![CritterEvent::Destroyed {
            critter: fragile,
            reward: 17,
            tick: 7
        }]
    );
}

#[test]
fn critter_walks_to_the_exit_and_escapes() {
    let harness = harness(&["E#X"]);
    let id = spawn(&harness, CritterKind::Speedy, (0, 0), None);
    let _ = harness.critters.commit().expect("commit");

    for tick in 1..=60 {
        harness.logic.borrow_mut().advance(tick).expect("advance");
    }

    assert!(harness.critters.find(id).is_none());
    assert_eq!(
        harness.log.borrow().events,
        vec![CritterEvent::ReachedGoal {
            critter: id,
            strength: 6,
            tick: 60
        }]
    );
    let delivered = harness.critters.commit().expect("commit");
    assert_eq!(delivered[0].removed_ids(), vec![id]);
    assert_eq!(harness.logic.borrow().routed(), 0);
}

#[test]
fn slow_effect_halves_walking_speed() {
    let harness = harness(&["E###X"]);
    let id = spawn(&harness, CritterKind::Speedy, (0, 0), None);
    let _ = harness.critters.commit().expect("commit");
    harness
        .logic
        .borrow_mut()
        .apply_effect(
            &Effect::Slow {
                target: id,
                amount: 5,
                speed_percent: 50,
                duration_ticks: 120,
            },
            0,
        )
        .expect("slow");

    for tick in 1..=30 {
        harness.logic.borrow_mut().advance(tick).expect("advance");
    }
    assert_eq!(harness.critters.find(id).expect("live").cell(), CellCoord::new(0, 0));

    for tick in 31..=60 {
        harness.logic.borrow_mut().advance(tick).expect("advance");
    }
    assert_eq!(harness.critters.find(id).expect("live").cell(), CellCoord::new(1, 0));
}

#[test]
fn spawn_without_route_fails_the_commit() {
    let harness = harness(&["E.X"]);
    let _ = spawn(&harness, CritterKind::Tanky, (0, 0), None);

    assert_eq!(
        harness.critters.commit(),
        Err(Error::Unreachable {
            from: CellCoord::new(0, 0),
            to: CellCoord::new(2, 0)
        })
    );
}

#[test]
fn routes_follow_topology_changes() {
    let harness = harness(&["E##", "..#", "..X"]);
    let id = spawn(&harness, CritterKind::Strong, (0, 0), None);
    let _ = harness.critters.commit().expect("commit");
    assert_eq!(harness.logic.borrow().route(id).map(|route| route.len()), Some(4));

    let _ = harness
        .map
        .borrow_mut()
        .set(CellCoord::new(0, 1), CellKind::Path)
        .expect("set");
    let _ = harness
        .map
        .borrow_mut()
        .set(CellCoord::new(0, 2), CellKind::Path)
        .expect("set");
    let _ = harness
        .map
        .borrow_mut()
        .set(CellCoord::new(1, 2), CellKind::Path)
        .expect("set");
    harness.logic.borrow_mut().recompute_routes().expect("recompute");

    assert_eq!(harness.logic.borrow().route(id).map(|route| route.len()), Some(4));
    let _ = harness
        .map
        .borrow_mut()
        .set(CellCoord::new(1, 0), CellKind::Scenery)
        .expect("set");
    harness.logic.borrow_mut().recompute_routes().expect("recompute");

    assert_eq!(
        harness.logic.borrow().route(id).and_then(|route| route.first().copied()),
        Some(CellCoord::new(0, 1))
    );
}
