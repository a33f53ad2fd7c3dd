mod support;

use activity_purge::{
    ActionExecutor, ActionOutcome, ContentEnumerator, DomError, FailureReason, FreshnessGuard,
    Item, Next, Role, RunConfig,
};
use support::{Event, FakeFeed, FakeItem, fast_config, init_logging};

fn config(role: Role) -> RunConfig {
    let mut config = fast_config(role);
    config.preserve_first = 0;
    config
}

fn first_item(feed: &mut FakeFeed, config: &RunConfig) -> Item {
    let mut enumerator = ContentEnumerator::new(config);
    match enumerator.next_item(feed, &FreshnessGuard::new()).unwrap() {
        Next::Item(item) => item,
        other => panic!("expected an item, got {other:?}"),
    }
}

#[test]
fn already_unpressed_reaction_is_not_clicked_again() {
    init_logging();
    let mut feed = FakeFeed::with_texts(Role::Reaction, 1);
    let config = config(Role::Reaction);
    let item = first_item(&mut feed, &config);

    // Someone else flipped it between selection and action.
    feed.state().items[0].pressed = false;

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &item).unwrap();
    assert_eq!(outcome, ActionOutcome::Success);
    assert_eq!(feed.clicks(), 0);
    assert!(!feed.state().items[0].pressed);
}

#[test]
fn swallowed_unlike_click_is_rejected_after_retries() {
    init_logging();
    let mut item = FakeItem::new("stubborn");
    item.stuck = true;
    let mut feed = FakeFeed::new(Role::Reaction, vec![item]);
    let config = config(Role::Reaction);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Failure(FailureReason::ActionRejected));
    assert_eq!(feed.clicks(), config.max_attempts as usize);
}

#[test]
fn vanished_item_counts_as_done() {
    init_logging();
    let mut feed = FakeFeed::with_texts(Role::Post, 2);
    let config = config(Role::Post);
    let item = first_item(&mut feed, &config);

    feed.state().items.remove(0);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &item).unwrap();
    assert_eq!(outcome, ActionOutcome::Failure(FailureReason::ElementNotFound));
    assert!(outcome.is_success());
    assert_eq!(feed.clicks(), 0);
}

#[test]
fn delete_without_confirmation_dialog() {
    init_logging();
    let mut item = FakeItem::new("quick");
    item.confirm = false;
    let mut feed = FakeFeed::new(Role::Comment, vec![item]);
    let config = config(Role::Comment);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Success);
    assert_eq!(feed.deleted(), vec!["quick"]);
    // Menu and delete entry, no confirm click.
    assert_eq!(feed.clicks(), 2);
}

#[test]
fn leftover_dialog_is_dismissed_then_retried() {
    init_logging();
    let mut feed = FakeFeed::with_texts(Role::Post, 2);
    let config = config(Role::Post);
    let item = first_item(&mut feed, &config);

    feed.state().dialog_for = Some(1);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &item).unwrap();
    assert_eq!(outcome, ActionOutcome::Success);
    assert_eq!(feed.deleted(), vec!["post 1"]);
    assert!(feed.events().contains(&Event::Dismiss));
}

#[test]
fn menu_without_delete_entry_is_restricted() {
    init_logging();
    let mut item = FakeItem::new("someone else's");
    item.deletable = false;
    let mut feed = FakeFeed::new(Role::Post, vec![item]);
    let config = config(Role::Post);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Failure(FailureReason::NoDeleteOption));
    // Opened the menu once, never retried.
    assert_eq!(feed.clicks(), 1);
    assert_eq!(feed.remaining(), vec!["someone else's"]);
}

#[test]
fn reaction_whose_text_changes_is_still_checked() {
    init_logging();
    let mut item = FakeItem::new("liked");
    item.stuck = true;
    item.relabels = true;
    let mut feed = FakeFeed::new(Role::Reaction, vec![item]);
    let config = config(Role::Reaction);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Failure(FailureReason::ActionRejected));
    assert!(feed.state().items[0].pressed);
    assert_eq!(feed.clicks(), config.max_attempts as usize);
}

#[test]
fn reaction_whose_text_changes_is_unliked() {
    init_logging();
    let mut item = FakeItem::new("liked");
    item.relabels = true;
    let mut feed = FakeFeed::new(Role::Reaction, vec![item]);
    let config = config(Role::Reaction);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Success);
    assert!(!feed.state().items[0].pressed);
    assert_eq!(feed.clicks(), 1);
}

#[test]
fn unlike_that_opens_a_dialog_is_dismissed_and_retried() {
    init_logging();
    let mut item = FakeItem::new("liked");
    item.prompts_on_unlike = true;
    let mut feed = FakeFeed::new(Role::Reaction, vec![item]);
    let config = config(Role::Reaction);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Success);
    assert!(feed.events().contains(&Event::Dismiss));
    assert!(!feed.state().items[0].pressed);
    assert_eq!(feed.clicks(), 2);
}

#[test]
fn menu_click_that_opens_the_item_goes_back_and_retries() {
    init_logging();
    let mut item = FakeItem::new("wandering");
    item.menu_navigates = true;
    let mut feed = FakeFeed::new(Role::Post, vec![item]);
    let config = config(Role::Post);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Success);
    assert!(feed.events().contains(&Event::Back));
    assert_eq!(feed.deleted(), vec!["wandering"]);
}

#[test]
fn timed_out_clicks_end_as_timeout() {
    init_logging();
    let mut feed = FakeFeed::with_texts(Role::Post, 1).failing_clicks(vec![
        DomError::Timeout("menu".to_string()),
        DomError::Timeout("menu".to_string()),
    ]);
    let config = config(Role::Post);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Failure(FailureReason::Timeout));
    assert_eq!(feed.remaining(), vec!["post 1"]);
}

#[test]
fn lost_session_is_returned_as_an_error() {
    init_logging();
    let mut feed = FakeFeed::with_texts(Role::Post, 1)
        .failing_clicks(vec![DomError::SessionLost("closed".to_string())]);
    let config = config(Role::Post);
    let target = first_item(&mut feed, &config);

    let err = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap_err();
    assert!(err.is_session_lost());
}

#[test]
fn deleting_one_of_two_identical_items_removes_only_that_one() {
    init_logging();
    let mut feed = FakeFeed::new(
        Role::Comment,
        vec![FakeItem::new("Congrats!"), FakeItem::new("Congrats!")],
    );
    let config = config(Role::Comment);
    let target = first_item(&mut feed, &config);

    let outcome = ActionExecutor::new(&config).apply(&mut feed, &target).unwrap();
    assert_eq!(outcome, ActionOutcome::Success);
    assert_eq!(feed.deleted(), vec!["Congrats!"]);
    assert_eq!(feed.remaining(), vec!["Congrats!"]);
}
