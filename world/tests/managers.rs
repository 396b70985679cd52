use std::{cell::RefCell, rc::Rc};

use critter_defence_core::{
    Amount, CellCoord, CritterId, CritterKind, EntityKey, Error, GridSize, Result, TowerId,
    TowerKind,
};
use critter_defence_observe::{Delta, ObserverVec};
use critter_defence_world::{
    Critter, CritterManager, CritterSpec, Economy, MapGrid, Purse, Tower, TowerManager, TowerSpec,
};

#[derive(Default)]
struct TowerLog {
    added: Vec<TowerId>,
    removed: Vec<TowerId>,
}

impl ObserverVec<Tower> for TowerLog {
    fn update(&mut self, delta: &Delta<Tower>) -> Result<()> {
        self.added.extend(delta.added_ids());
        self.removed.extend(delta.removed_ids());
        Ok(())
    }
}

#[test]
fn placed_and_sold_in_one_tick_is_never_announced() {
    let map = Rc::new(RefCell::new(MapGrid::straight_corridor(GridSize::new(8, 5))));
    let purse = Purse::shared(500);
    let towers = TowerManager::new(map, purse.clone(), 60, 8);
    let log = Rc::new(RefCell::new(TowerLog::default()));
    towers.attach(log.clone()).expect("attach");

    let id = towers
        .place(TowerSpec::new(TowerKind::Basic, CellCoord::new(1, 1)))
        .expect("place");
    let refund = towers.sell(id).expect("sell");
    let _ = towers.commit().expect("commit");

    assert_eq!(refund, 70);
    assert_eq!(purse.borrow().balance(), 470);
    assert!(log.borrow().added.is_empty());
    assert!(log.borrow().removed.is_empty());
}

#[test]
fn sale_after_commit_is_announced_as_removal() {
    let map = Rc::new(RefCell::new(MapGrid::straight_corridor(GridSize::new(8, 5))));
    let towers = TowerManager::new(map, Purse::shared(500), 60, 8);
    let log = Rc::new(RefCell::new(TowerLog::default()));
    towers.attach(log.clone()).expect("attach");

    let id = towers
        .place(TowerSpec::new(TowerKind::Splash, CellCoord::new(3, 3)))
        .expect("place");
    let _ = towers.commit().expect("commit");
    let _ = towers.sell(id).expect("sell");
    let _ = towers.commit().expect("commit");

    assert_eq!(log.borrow().added, vec![id]);
    assert_eq!(log.borrow().removed, vec![id]);
}

#[test]
fn critter_snapshots_are_copies() {
    let critters = CritterManager::new(GridSize::new(4, 4), 8);
    let id = critters
        .spawn(CritterSpec::new(CritterKind::Tanky, 2, CellCoord::new(0, 1)), 3)
        .expect("spawn");

    let mut copy = critters.find(id).expect("live");
    let _ = copy.apply_damage(50);

    assert_eq!(critters.find(id).expect("live").health(), 130);
}

/// Observer that runs a closure against every delta it receives.
struct Hook<F>(F);

impl<F: FnMut(&Delta<Tower>) -> Result<()>> ObserverVec<Tower> for Hook<F> {
    fn update(&mut self, delta: &Delta<Tower>) -> Result<()> {
        (self.0)(delta)
    }
}

impl<F: FnMut(&Delta<Critter>) -> Result<()>> ObserverVec<Critter> for Hook<F> {
    fn update(&mut self, delta: &Delta<Critter>) -> Result<()> {
        (self.0)(delta)
    }
}

fn shared_towers(balance: Amount) -> (Rc<TowerManager>, Rc<RefCell<Purse>>) {
    let map = Rc::new(RefCell::new(MapGrid::straight_corridor(GridSize::new(8, 5))));
    let purse = Purse::shared(balance);
    let towers = Rc::new(TowerManager::new(map, purse.clone(), 60, 8));
    (towers, purse)
}

fn balanced_at(column: u32) -> CritterSpec {
    CritterSpec::new(CritterKind::Balanced, 1, CellCoord::new(column, 0))
}

#[test]
fn tower_callbacks_cannot_place_or_sell_directly() {
    let (towers, purse) = shared_towers(500);
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let hook = {
        let towers = Rc::clone(&towers);
        let attempts = Rc::clone(&attempts);
        Hook(move |delta: &Delta<Tower>| {
            for id in delta.added_ids() {
                let placed = towers.place(TowerSpec::new(TowerKind::Basic, CellCoord::new(0, 0)));
                attempts.borrow_mut().push(placed.map(drop));
                attempts.borrow_mut().push(towers.sell(id).map(drop));
            }
            Ok(())
        })
    };
    towers.attach(Rc::new(RefCell::new(hook))).expect("attach");
    let id = towers
        .place(TowerSpec::new(TowerKind::Basic, CellCoord::new(1, 1)))
        .expect("place");

    let delivered = towers.commit().expect("commit");

    assert_eq!(
        *attempts.borrow(),
        vec![Err(Error::ReentrantMutation), Err(Error::ReentrantMutation)]
    );
    assert_eq!(delivered.len(), 1);
    assert_eq!(towers.ids(), vec![id]);
    assert_eq!(purse.borrow().balance(), 400);
    assert!(!towers.has_pending());
}

#[test]
fn deferred_sale_refunds_once_and_follows_up() {
    let (towers, purse) = shared_towers(500);
    let sales = Rc::new(RefCell::new(Vec::new()));
    let hook = {
        let towers = Rc::clone(&towers);
        let sales = Rc::clone(&sales);
        Hook(move |delta: &Delta<Tower>| {
            for id in delta.added_ids() {
                sales.borrow_mut().push(towers.defer_sell(id));
                sales.borrow_mut().push(towers.defer_sell(id));
            }
            Ok(())
        })
    };
    towers.attach(Rc::new(RefCell::new(hook))).expect("attach");
    let id = towers
        .place(TowerSpec::new(TowerKind::Basic, CellCoord::new(1, 1)))
        .expect("place");

    let delivered = towers.commit().expect("commit");

    assert_eq!(
        *sales.borrow(),
        vec![Ok(70), Err(Error::UnknownId(EntityKey::Tower(id)))]
    );
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].added_ids(), vec![id]);
    assert_eq!(delivered[1].removed_ids(), vec![id]);
    assert!(towers.is_empty());
    assert_eq!(purse.borrow().balance(), 470);
}

#[test]
fn deferred_tower_removal_refunds_nothing() {
    let (towers, purse) = shared_towers(500);
    let hook = {
        let towers = Rc::clone(&towers);
        Hook(move |delta: &Delta<Tower>| {
            for id in delta.added_ids() {
                towers.defer_remove(id)?;
            }
            Ok(())
        })
    };
    towers.attach(Rc::new(RefCell::new(hook))).expect("attach");
    let id = towers
        .place(TowerSpec::new(TowerKind::Splash, CellCoord::new(3, 3)))
        .expect("place");

    let delivered = towers.commit().expect("commit");

    assert_eq!(delivered[1].removed_ids(), vec![id]);
    assert!(towers.is_empty());
    assert_eq!(purse.borrow().balance(), 350);
}

#[test]
fn critter_callbacks_cannot_spawn_or_remove_directly() {
    let critters = Rc::new(CritterManager::new(GridSize::new(4, 4), 8));
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let hook = {
        let critters = Rc::clone(&critters);
        let attempts = Rc::clone(&attempts);
        Hook(move |delta: &Delta<Critter>| {
            for id in delta.added_ids() {
                attempts.borrow_mut().push(critters.spawn(balanced_at(1), 0).map(drop));
                attempts.borrow_mut().push(critters.remove(id).map(drop));
            }
            Ok(())
        })
    };
    critters.attach(Rc::new(RefCell::new(hook))).expect("attach");
    let id = critters.spawn(balanced_at(0), 0).expect("spawn");

    let delivered = critters.commit().expect("commit");

    assert_eq!(
        *attempts.borrow(),
        vec![Err(Error::ReentrantMutation), Err(Error::ReentrantMutation)]
    );
    assert_eq!(delivered.len(), 1);
    assert_eq!(critters.ids(), vec![id]);
    assert!(!critters.has_pending());
}

#[test]
fn deferred_spawn_is_announced_in_a_follow_up_pass() {
    let critters = Rc::new(CritterManager::new(GridSize::new(4, 4), 8));
    let spawned = Rc::new(RefCell::new(Vec::new()));
    let hook = {
        let critters = Rc::clone(&critters);
        let spawned = Rc::clone(&spawned);
        let mut fired = false;
        Hook(move |_delta: &Delta<Critter>| {
            if !fired {
                fired = true;
                spawned.borrow_mut().push(critters.defer_spawn(balanced_at(2), 5)?);
            }
            Ok(())
        })
    };
    critters.attach(Rc::new(RefCell::new(hook))).expect("attach");
    let first = critters.spawn(balanced_at(0), 0).expect("spawn");

    let delivered = critters.commit().expect("commit");

    let follow_up = CritterId::new(first.get() + 1);
    assert_eq!(*spawned.borrow(), vec![follow_up]);
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].added_ids(), vec![first]);
    assert_eq!(delivered[1].added_ids(), vec![follow_up]);
    assert_eq!(critters.ids(), vec![first, follow_up]);
    assert_eq!(critters.find(follow_up).expect("live").spawn_tick(), 5);
}

#[test]
fn deferred_critter_removal_follows_the_spawn() {
    let critters = Rc::new(CritterManager::new(GridSize::new(4, 4), 8));
    let hook = {
        let critters = Rc::clone(&critters);
        Hook(move |delta: &Delta<Critter>| {
            for id in delta.added_ids() {
                critters.defer_remove(id)?;
            }
            Ok(())
        })
    };
    critters.attach(Rc::new(RefCell::new(hook))).expect("attach");
    let id = critters.spawn(balanced_at(0), 0).expect("spawn");

    let delivered = critters.commit().expect("commit");

    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[1].removed_ids(), vec![id]);
    assert!(critters.is_empty());
}

#[test]
fn deferred_spawn_outside_a_pass_applies_at_once() {
    let critters = CritterManager::new(GridSize::new(4, 4), 8);
    let id = critters.defer_spawn(balanced_at(3), 0).expect("spawn");

    assert!(critters.find(id).is_some());
    assert_eq!(critters.commit().expect("commit")[0].added_ids(), vec![id]);
}
