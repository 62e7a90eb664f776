//! Integration tests for membership reconciliation and the tick loop.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use tessera_core::{
    component_data, Commands, ComponentDescriptor, Ecs, EcsConfig, Entity, EntityId,
    FrequencyGate, ManualClock, System, SystemId, SystemRunner,
};

// ============================================================================
// HELPERS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Enter(EntityId),
    Exit(EntityId),
    Pre,
    Update(EntityId),
    Post,
}

type Log = Rc<RefCell<Vec<(&'static str, Event)>>>;

/// System driven by a predicate, recording every hook into a shared log.
struct Recorder {
    label: &'static str,
    accepts: Box<dyn Fn(&Entity) -> bool>,
    log: Log,
}

impl Recorder {
    fn runner(
        label: &'static str,
        log: &Log,
        accepts: impl Fn(&Entity) -> bool + 'static,
    ) -> SystemRunner {
        SystemRunner::new(Self {
            label,
            accepts: Box::new(accepts),
            log: Rc::clone(log),
        })
    }

    fn record(&self, event: Event) {
        self.log.borrow_mut().push((self.label, event));
    }
}

impl System for Recorder {
    fn test(&self, entity: &Entity) -> bool {
        (self.accepts)(entity)
    }

    fn enter(&mut self, entity: &mut Entity, _commands: &mut Commands) {
        self.record(Event::Enter(entity.id()));
    }

    fn exit(&mut self, entity: &mut Entity, _commands: &mut Commands) {
        self.record(Event::Exit(entity.id()));
    }

    fn pre_update(&mut self) {
        self.record(Event::Pre);
    }

    fn update(&mut self, entity: &mut Entity, _elapsed: f64, _commands: &mut Commands) {
        self.record(Event::Update(entity.id()));
    }

    fn post_update(&mut self) {
        self.record(Event::Post);
    }
}

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn count(log: &Log, label: &str, event: &Event) -> usize {
    log.borrow()
        .iter()
        .filter(|(l, e)| *l == label && e == event)
        .count()
}

fn updates(log: &Log, label: &str) -> usize {
    log.borrow()
        .iter()
        .filter(|(l, e)| *l == label && *e == Event::Pre)
        .count()
}

fn data(value: Value) -> Option<tessera_core::ComponentData> {
    Some(component_data(value))
}

fn members(ecs: &Ecs, system: SystemId) -> Vec<EntityId> {
    ecs.system(system).unwrap().entities().to_vec()
}

/// Every entity's memberships match exactly the systems accepting it.
fn assert_converged(ecs: &Ecs) {
    for entity in ecs.entities().iter() {
        for runner in ecs.systems().iter() {
            let eligible = runner.test(entity);
            assert_eq!(entity.is_member_of(runner.id()), eligible);
            assert_eq!(runner.contains(entity.id()), eligible);
        }
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn scenario_basic_lifecycle() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let entity = Entity::new();
    let id = entity.id();

    let system = ecs.add_system(Recorder::runner("s", &log, |_| true));
    ecs.add_entity(entity).unwrap();
    ecs.update();

    assert_eq!(members(&ecs, system), vec![id]);
    assert_eq!(count(&log, "s", &Event::Enter(id)), 1);
    assert_eq!(count(&log, "s", &Event::Update(id)), 1);
}

#[test]
fn scenario_component_driven_eligibility() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let system = ecs.add_system(Recorder::runner("hp", &log, |e| e.has_component("hp")));
    let id = ecs.add_entity(Entity::with_id(EntityId::new(1))).unwrap();

    ecs.update();
    assert!(members(&ecs, system).is_empty());

    let entity = ecs.get_entity_mut(id).unwrap();
    entity.add_component("hp", data(json!({"value": 10}))).unwrap();
    assert!(entity.is_dirty());

    ecs.update();
    assert_eq!(members(&ecs, system), vec![id]);
    assert_eq!(count(&log, "hp", &Event::Enter(id)), 1);

    ecs.get_entity_mut(id).unwrap().remove_component("hp");
    ecs.update();
    assert!(members(&ecs, system).is_empty());
    assert_eq!(count(&log, "hp", &Event::Exit(id)), 1);
    assert!(ecs.get_entity_by_id(id).unwrap().systems().is_empty());
}

#[test]
fn scenario_update_merge_semantics() {
    let mut ecs = Ecs::new();
    let id = ecs.add_entity(Entity::new()).unwrap();
    let entity = ecs.get_entity_mut(id).unwrap();

    entity.add_component("pos", data(json!({"x": 1, "y": 2}))).unwrap();
    entity
        .update_component("pos", component_data(json!({"y": 5, "z": 9})))
        .unwrap();

    let pos = entity.component("pos").unwrap().clone();
    assert_eq!(Value::Object(pos), json!({"x": 1, "y": 5, "z": 9}));
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn eligibility_converges_after_one_update() {
    let log = new_log();
    let mut ecs = Ecs::new();
    ecs.add_system(Recorder::runner("a", &log, |e| e.has_component("a")));
    ecs.add_system(Recorder::runner("ab", &log, |e| {
        e.has_component("a") && e.has_component("b")
    }));
    ecs.add_system(Recorder::runner("not_b", &log, |e| !e.has_component("b")));

    let ids: Vec<EntityId> = (0..12)
        .map(|raw| ecs.add_entity(Entity::with_id(EntityId::new(raw))).unwrap())
        .collect();
    ecs.update();
    assert_converged(&ecs);

    for (step, &id) in ids.iter().enumerate() {
        let entity = ecs.get_entity_mut(id).unwrap();
        match step % 4 {
            0 => entity.add_component("a", None).unwrap(),
            1 => entity.add_component("b", None).unwrap(),
            2 => {
                entity.add_component("a", None).unwrap();
                entity.add_component("b", None).unwrap();
            }
            _ => {
                entity.add_component("a", None).unwrap();
                entity.remove_component("a");
            }
        }
    }
    ecs.update();
    assert_converged(&ecs);

    for &id in ids.iter().step_by(3) {
        let entity = ecs.get_entity_mut(id).unwrap();
        entity.remove_component("a");
        entity.add_component("b", None).unwrap();
    }
    ecs.update();
    assert_converged(&ecs);
}

#[test]
fn disposal_is_idempotent() {
    let log = new_log();
    let mut ecs = Ecs::new();
    ecs.add_system(Recorder::runner("s", &log, |_| true));
    ecs.add_system(Recorder::runner("t", &log, |_| true));
    let id = ecs.add_entity(Entity::with_id(EntityId::new(7))).unwrap();
    ecs.update();

    let removed = ecs.remove_entity(id).unwrap();
    assert!(removed.systems().is_empty());
    assert_eq!(count(&log, "s", &Event::Exit(id)), 1);
    assert_eq!(count(&log, "t", &Event::Exit(id)), 1);

    assert!(ecs.remove_entity(id).is_none());
    assert!(ecs.remove_entity_by_id(7).is_none());
    assert_eq!(count(&log, "s", &Event::Exit(id)), 1);
    assert_eq!(count(&log, "t", &Event::Exit(id)), 1);
}

#[test]
fn dispose_leaves_every_system() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let systems: Vec<SystemId> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|label| ecs.add_system(Recorder::runner(label, &log, |_| true)))
        .collect();
    let id = ecs.add_entity(Entity::with_id(EntityId::new(1))).unwrap();
    ecs.update();

    ecs.remove_entity(id).unwrap();

    for (system, label) in systems.iter().zip(["a", "b", "c", "d"]) {
        assert!(members(&ecs, *system).is_empty());
        assert_eq!(count(&log, label, &Event::Exit(id)), 1);
    }
}

#[test]
fn frequency_gating_runs_on_multiples() {
    let log = new_log();
    let mut ecs = Ecs::new();
    ecs.add_system(Recorder::runner("every_third", &log, |_| true).with_frequency(3));

    for _ in 0..10 {
        ecs.update();
    }

    // ticks 0, 3, 6, 9
    assert_eq!(updates(&log, "every_third"), 4);
}

#[test]
fn frequency_gate_halts_later_systems() {
    let log = new_log();
    let mut ecs = Ecs::new();
    ecs.add_system(Recorder::runner("fast", &log, |_| true));
    ecs.add_system(Recorder::runner("slow", &log, |_| true).with_frequency(2));
    ecs.add_system(Recorder::runner("after", &log, |_| true));

    let first = ecs.update();
    assert_eq!(first.systems_run, 3);

    let second = ecs.update();
    assert_eq!(second.systems_run, 1);

    assert_eq!(updates(&log, "fast"), 2);
    assert_eq!(updates(&log, "slow"), 1);
    // halted behind "slow" on tick 1, not merely skipped
    assert_eq!(updates(&log, "after"), 1);
}

#[test]
fn skip_gate_only_skips_the_gated_system() {
    let log = new_log();
    let config = EcsConfig {
        frequency_gate: FrequencyGate::SkipSystem,
        ..EcsConfig::default()
    };
    let mut ecs = Ecs::with_config(config);
    ecs.add_system(Recorder::runner("slow", &log, |_| true).with_frequency(2));
    ecs.add_system(Recorder::runner("after", &log, |_| true));

    ecs.update();
    ecs.update();

    assert_eq!(updates(&log, "slow"), 1);
    assert_eq!(updates(&log, "after"), 2);
}

// ============================================================================
// CONTAINER OPERATIONS
// ============================================================================

#[test]
fn add_system_is_eager() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let tagged = ecs
        .add_entity(Entity::with_id(EntityId::new(1)).with_components(&[
            ComponentDescriptor::with_defaults("tag", component_data(json!({}))),
        ]))
        .unwrap();
    ecs.add_entity(Entity::with_id(EntityId::new(2))).unwrap();

    let system = ecs.add_system(Recorder::runner("tag", &log, |e| e.has_component("tag")));

    assert_eq!(members(&ecs, system), vec![tagged]);
    assert_eq!(count(&log, "tag", &Event::Enter(tagged)), 1);
}

#[test]
fn removing_and_re_adding_a_system_enters_again() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let system = ecs.add_system(Recorder::runner("s", &log, |_| true));
    let id = ecs.add_entity(Entity::new()).unwrap();
    ecs.update();

    let runner = ecs.remove_system(system).unwrap();
    assert!(runner.is_empty());
    assert_eq!(count(&log, "s", &Event::Exit(id)), 1);
    assert!(ecs.get_entity_by_id(id).unwrap().systems().is_empty());
    ecs.update();

    let system = ecs.add_system(runner);
    ecs.update();

    assert_eq!(members(&ecs, system), vec![id]);
    assert_eq!(count(&log, "s", &Event::Enter(id)), 2);
    assert!(ecs.remove_system(system).is_some());
    assert!(ecs.remove_system(system).is_none());
}

#[test]
fn disabled_system_tracks_membership_but_does_not_run() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let system = ecs.add_system(Recorder::runner("s", &log, |_| true));
    ecs.add_system(Recorder::runner("t", &log, |_| true));
    ecs.system_mut(system).unwrap().disable();

    let id = ecs.add_entity(Entity::new()).unwrap();
    let stats = ecs.update();

    assert_eq!(stats.systems_run, 1);
    assert_eq!(updates(&log, "s"), 0);
    assert_eq!(members(&ecs, system), vec![id]);

    ecs.system_mut(system).unwrap().enable();
    ecs.update();
    assert_eq!(updates(&log, "s"), 1);
}

#[test]
fn removed_dirty_entity_is_not_reconciled() {
    let log = new_log();
    let mut ecs = Ecs::new();
    ecs.add_system(Recorder::runner("s", &log, |_| true));
    let id = ecs.add_entity(Entity::new()).unwrap();

    ecs.remove_entity(id).unwrap();
    let stats = ecs.update();

    assert_eq!(stats.reconciled, 0);
    assert_eq!(count(&log, "s", &Event::Enter(id)), 0);
}

#[test]
fn update_hooks_run_in_order() {
    let log = new_log();
    let mut ecs = Ecs::new();
    ecs.add_system(Recorder::runner("s", &log, |_| true));
    let a = ecs.add_entity(Entity::with_id(EntityId::new(10))).unwrap();
    let b = ecs.add_entity(Entity::with_id(EntityId::new(20))).unwrap();
    ecs.update();

    let events: Vec<Event> = log.borrow().iter().map(|(_, e)| e.clone()).collect();
    assert_eq!(
        events,
        vec![
            Event::Enter(a),
            Event::Enter(b),
            Event::Pre,
            Event::Update(a),
            Event::Update(b),
            Event::Post,
        ]
    );
}

#[test]
fn elapsed_time_reaches_systems() {
    struct Elapsed(Rc<RefCell<Vec<f64>>>);

    impl System for Elapsed {
        fn test(&self, _entity: &Entity) -> bool {
            true
        }

        fn update(&mut self, _entity: &mut Entity, elapsed: f64, _commands: &mut Commands) {
            self.0.borrow_mut().push(elapsed);
        }
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let clock = ManualClock::new(0.0);
    let mut ecs = Ecs::new().with_clock(clock.clone());
    ecs.add_system(SystemRunner::new(Elapsed(Rc::clone(&seen))));
    ecs.add_entity(Entity::new()).unwrap();

    clock.advance(20.0);
    ecs.update();
    clock.advance(5.0);
    ecs.update();

    assert_eq!(*seen.borrow(), vec![20.0, 5.0]);
}

// ============================================================================
// RE-ENTRANT DIRTYING
// ============================================================================

/// Adds a marker component to every entity it updates.
struct Marker;

impl System for Marker {
    fn test(&self, _entity: &Entity) -> bool {
        true
    }

    fn update(&mut self, entity: &mut Entity, _elapsed: f64, _commands: &mut Commands) {
        if !entity.has_component("marked") {
            entity.add_component("marked", None).unwrap();
        }
    }
}

#[test]
fn hook_mutations_wait_for_next_drain() {
    let log = new_log();
    let mut ecs = Ecs::new();
    ecs.add_system(SystemRunner::new(Marker));
    let watcher = ecs.add_system(Recorder::runner("marked", &log, |e| e.has_component("marked")));
    let id = ecs.add_entity(Entity::new()).unwrap();

    ecs.update();
    // marked during the pass, reconciled only on the next drain
    assert!(members(&ecs, watcher).is_empty());
    assert_eq!(ecs.dirty_len(), 1);

    let stats = ecs.update();
    assert_eq!(stats.reconciled, 1);
    assert_eq!(members(&ecs, watcher), vec![id]);
}

/// Tags entities as they enter, which changes their own eligibility elsewhere.
struct Tagger;

impl System for Tagger {
    fn test(&self, entity: &Entity) -> bool {
        entity.has_component("new")
    }

    fn enter(&mut self, entity: &mut Entity, _commands: &mut Commands) {
        entity.add_component("tagged", None).unwrap();
    }
}

#[test]
fn enter_hook_dirtying_is_not_lost() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let watcher = ecs.add_system(Recorder::runner("tagged", &log, |e| e.has_component("tagged")));
    ecs.add_system(SystemRunner::new(Tagger));

    let id = ecs.add_entity(Entity::new()).unwrap();
    ecs.get_entity_mut(id).unwrap().add_component("new", None).unwrap();

    assert_eq!(ecs.clean_dirty_entities(), 1);
    // the watcher was tested before the tag existed
    assert!(members(&ecs, watcher).is_empty());
    assert!(ecs.get_entity_by_id(id).unwrap().is_dirty());

    assert_eq!(ecs.clean_dirty_entities(), 1);
    assert_eq!(members(&ecs, watcher), vec![id]);
    assert_converged(&ecs);
}

/// Leaves a trace on the entity it is removed from.
struct Farewell;

impl System for Farewell {
    fn test(&self, _entity: &Entity) -> bool {
        true
    }

    fn exit(&mut self, entity: &mut Entity, _commands: &mut Commands) {
        entity.add_component("gone", None).unwrap();
    }
}

#[test]
fn removal_leaves_no_stale_queue_entry() {
    let mut ecs = Ecs::new();
    ecs.add_system(SystemRunner::new(Farewell));
    let id = ecs.add_entity(Entity::new()).unwrap();
    ecs.update();
    assert_eq!(ecs.dirty_len(), 0);

    let removed = ecs.remove_entity(id).unwrap();

    // the exit hook dirtied the entity before it was purged
    assert!(removed.has_component("gone"));
    assert!(!removed.is_dirty());
    assert_eq!(ecs.dirty_len(), 0);
    assert_eq!(ecs.update().reconciled, 0);
}

// ============================================================================
// DEFERRED COMMANDS
// ============================================================================

/// Gives `target` a gift every time it updates one of its members.
struct Giver {
    target: EntityId,
}

impl System for Giver {
    fn test(&self, entity: &Entity) -> bool {
        entity.has_component("giver")
    }

    fn update(&mut self, _entity: &mut Entity, _elapsed: f64, commands: &mut Commands) {
        commands.update_component(self.target, "gift", component_data(json!({"from": "giver"})));
    }
}

#[test]
fn commands_reach_other_entities_on_the_next_drain() {
    let log = new_log();
    let mut ecs = Ecs::new();
    let giver = ecs
        .add_entity(Entity::with_id(EntityId::new(1)).with_components(&[
            ComponentDescriptor::with_defaults("giver", component_data(json!({}))),
        ]))
        .unwrap();
    let receiver = ecs.add_entity(Entity::with_id(EntityId::new(2))).unwrap();

    let gifted = ecs.add_system(SystemRunner::new(Giver { target: receiver }));
    let watcher = ecs.add_system(Recorder::runner("gift", &log, |e| e.has_component("gift")));

    let first = ecs.update();
    assert_eq!(first.commands, 1);
    assert_eq!(members(&ecs, gifted), vec![giver]);

    // given during this tick, not reconciled mid-pass
    let entity = ecs.get_entity_by_id(receiver).unwrap();
    assert_eq!(entity.component("gift").unwrap()["from"], "giver");
    assert!(entity.is_dirty());
    assert!(members(&ecs, watcher).is_empty());
    assert_eq!(count(&log, "gift", &Event::Update(receiver)), 0);

    let second = ecs.update();
    assert_eq!(second.reconciled, 1);
    assert_eq!(members(&ecs, watcher), vec![receiver]);
    assert_eq!(count(&log, "gift", &Event::Enter(receiver)), 1);
    assert_eq!(count(&log, "gift", &Event::Update(receiver)), 1);
}

/// Tags `partner` whenever one of its members leaves.
struct Bereaved {
    partner: EntityId,
}

impl System for Bereaved {
    fn test(&self, entity: &Entity) -> bool {
        entity.has_component("linked")
    }

    fn exit(&mut self, _entity: &mut Entity, commands: &mut Commands) {
        commands.add_component(self.partner, "orphaned", None);
    }
}

#[test]
fn exit_commands_apply_when_entity_is_removed() {
    let mut ecs = Ecs::new();
    let partner = ecs.add_entity(Entity::with_id(EntityId::new(1))).unwrap();
    let linked = ecs
        .add_entity(Entity::with_id(EntityId::new(2)).with_components(&[
            ComponentDescriptor::with_defaults("linked", component_data(json!({}))),
        ]))
        .unwrap();
    let system = ecs.add_system(SystemRunner::new(Bereaved { partner }));
    ecs.update();
    assert_eq!(ecs.dirty_len(), 0);

    ecs.remove_entity(linked).unwrap();

    assert!(ecs.system(system).unwrap().commands().is_empty());
    let entity = ecs.get_entity_by_id(partner).unwrap();
    assert!(entity.has_component("orphaned"));
    assert!(entity.is_dirty());
    assert_eq!(ecs.dirty_len(), 1);
}
