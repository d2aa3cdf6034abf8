//! Behavioural tests for event gating and command routing.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

use crate::command::CommandManager;
use crate::dispatch::{Destination, DispatchError, Dispatcher, Registry};
use crate::event::EventManager;

type Replies = Vec<String>;

struct TestWorld {
    runs: Arc<AtomicUsize>,
    events: EventManager<Dispatcher<Arc<AtomicUsize>>>,
    commands: CommandManager<Replies, ()>,
    replies: Replies,
    outcome: Option<Result<bool, DispatchError>>,
}

impl TestWorld {
    fn new() -> Self {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .controller("App\\Deploy", |runs: &Arc<AtomicUsize>| Arc::clone(runs))
            .method("run", |runs: &mut Arc<AtomicUsize>, _| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            });
        Self {
            events: EventManager::new(Dispatcher::new(Arc::clone(&runs), registry)),
            runs,
            commands: CommandManager::new(),
            replies: Vec::new(),
            outcome: None,
        }
    }

    fn attach(&mut self, destination: &str, group: &str, remove: bool, reset: bool) {
        let destination = Destination::parse(strip_quotes(destination)).expect("destination");
        self.events
            .attach(strip_quotes(group), destination, remove, reset);
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

#[given("an event group {group} waiting on {sub_id}")]
fn given_group_waiting(world: &RefCell<TestWorld>, group: String, sub_id: String) {
    world
        .borrow_mut()
        .events
        .add_group(strip_quotes(&group), strip_quotes(&sub_id));
}

#[given("the event group {group} also waits on {sub_id}")]
fn given_group_also_waits(world: &RefCell<TestWorld>, group: String, sub_id: String) {
    given_group_waiting(world, group, sub_id);
}

#[given("the callback {destination} is attached to {group}")]
fn given_callback(world: &RefCell<TestWorld>, destination: String, group: String) {
    world.borrow_mut().attach(&destination, &group, false, false);
}

#[given("the resetting callback {destination} is attached to {group}")]
fn given_resetting_callback(world: &RefCell<TestWorld>, destination: String, group: String) {
    world.borrow_mut().attach(&destination, &group, false, true);
}

#[given("the removing callback {destination} is attached to {group}")]
fn given_removing_callback(world: &RefCell<TestWorld>, destination: String, group: String) {
    world.borrow_mut().attach(&destination, &group, true, false);
}

#[given("the command {name} replies {reply}")]
fn given_command(world: &RefCell<TestWorld>, name: String, reply: String) {
    let reply = strip_quotes(&reply).to_owned();
    world.borrow_mut().commands.attach(
        strip_quotes(&name),
        move |replies: &mut Replies, _: &[String]| replies.push(reply.clone()),
        "behaviour",
    );
}

#[when("{group} is triggered with {sub_id}")]
fn when_triggered(world: &RefCell<TestWorld>, group: String, sub_id: String) {
    let mut w = world.borrow_mut();
    let outcome = w
        .events
        .trigger(strip_quotes(&group), strip_quotes(&sub_id), None);
    w.outcome = Some(outcome);
}

#[when("the command line {line} is received")]
fn when_command_line(world: &RefCell<TestWorld>, line: String) {
    let mut w = world.borrow_mut();
    let tokens: Vec<String> = strip_quotes(&line)
        .split_whitespace()
        .map(str::to_owned)
        .collect();
    let name = tokens.first().cloned().expect("command name");
    let TestWorld {
        commands, replies, ..
    } = &mut *w;
    commands
        .trigger(&name, replies, &tokens)
        .expect("command registered");
}

#[then("the trigger reports fired")]
fn then_fired(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    assert!(matches!(w.outcome, Some(Ok(true))), "{:?}", w.outcome);
}

#[then("the trigger reports not fired")]
fn then_not_fired(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    assert!(matches!(w.outcome, Some(Ok(false))), "{:?}", w.outcome);
}

#[then("the deploy controller ran {count} times")]
fn then_ran_plural(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().runs.load(Ordering::SeqCst), count);
}

#[then("the deploy controller ran {count} time")]
fn then_ran_singular(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().runs.load(Ordering::SeqCst), count);
}

#[then("the trigger fails because the path is unknown")]
fn then_path_unknown(world: &RefCell<TestWorld>) {
    let w = world.borrow();
    assert!(
        matches!(w.outcome, Some(Err(DispatchError::PathNotFound { .. }))),
        "{:?}",
        w.outcome
    );
}

#[then("the reply is {reply}")]
fn then_reply(world: &RefCell<TestWorld>, reply: String) {
    assert_eq!(
        world.borrow().replies.last().map(String::as_str),
        Some(strip_quotes(&reply))
    );
}

#[scenario(
    path = "tests/features/event_gating.feature",
    name = "Deploy waits for build and test"
)]
fn deploy_waits_for_build_and_test(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/event_gating.feature",
    name = "Reset groups fire again after re-arming"
)]
fn reset_groups_fire_again(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/event_gating.feature",
    name = "Removed groups fire once"
)]
fn removed_groups_fire_once(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/event_gating.feature",
    name = "Unknown controller paths are reported"
)]
fn unknown_controller_paths(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/event_gating.feature",
    name = "Ping answers pong"
)]
fn ping_answers_pong(world: RefCell<TestWorld>) {
    drop(world);
}
