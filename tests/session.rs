use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vignette::error::EngineError;
use vignette::progress::{MemoryBackend, ProgressStore};
use vignette::runtime::StoryState;
use vignette::session::{SessionHub, StorySource};

const FORK: &str = r#"
VAR visited = false

=== start ===
You stand at a fork.
* [Go left] -> room_a
* [Go right] -> room_b

=== room_a ===
A quiet study.
~ visited = true
* [Back to the fork] -> start

=== room_b ===
A dusty cellar.
-> END
"#;

const LINEAR: &str = r#"
=== opening ===
A door creaks open.
-> landing

=== landing ===
Dust hangs in the light.
-> END
"#;

/// Source backed by a map of path -> script text.
struct MockSource {
    scripts: HashMap<String, String>,
}

impl MockSource {
    fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            scripts: entries
                .iter()
                .map(|(path, text)| (path.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl StorySource for MockSource {
    async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.scripts
            .get(path)
            .map(|text| text.as_bytes().to_vec())
            .ok_or_else(|| anyhow::anyhow!("no story at {}", path))
    }
}

fn hub(entries: &[(&str, &str)]) -> SessionHub<MockSource, MemoryBackend> {
    SessionHub::new(
        MockSource::new(entries),
        ProgressStore::open(MemoryBackend::new()),
    )
}

fn collector(
    hub: &mut SessionHub<MockSource, MemoryBackend>,
) -> Arc<Mutex<Vec<StoryState>>> {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    hub.subscribe(Box::new(move |state| {
        sink.lock().unwrap().push(state.clone());
    }));
    states
}

#[tokio::test]
async fn initialize_publishes_the_entry_state() {
    let mut hub = hub(&[("fork.story", FORK)]);
    let states = collector(&mut hub);

    hub.initialize("fork", "fork.story").await.unwrap();

    let states = states.lock().unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].story_id, "fork");
    assert_eq!(states[0].current_text, "You stand at a fork.");
    assert_eq!(states[0].choices.len(), 2);
    assert!(!states[0].can_continue);

    let latest = hub.state().unwrap();
    assert_eq!(*latest, states[0]);
}

#[tokio::test]
async fn late_subscriber_receives_the_current_state_immediately() {
    let mut hub = hub(&[("fork.story", FORK)]);
    hub.initialize("fork", "fork.story").await.unwrap();

    let states = collector(&mut hub);
    assert_eq!(states.lock().unwrap().len(), 1);
    assert_eq!(
        states.lock().unwrap()[0].current_text,
        "You stand at a fork."
    );
}

#[tokio::test]
async fn transitions_publish_in_application_order() {
    let mut hub = hub(&[("fork.story", FORK)]);
    let states = collector(&mut hub);

    hub.initialize("fork", "fork.story").await.unwrap();
    hub.make_choice(0).unwrap();
    hub.make_choice(0).unwrap();

    let states = states.lock().unwrap();
    assert_eq!(states.len(), 3);
    assert_eq!(states[1].current_text, "A quiet study.");
    assert_eq!(
        states[1].variables.get("visited"),
        Some(&vignette::format::Literal::Boolean(true))
    );
    // back at the fork after the return choice
    assert_eq!(states[2].current_text, "You stand at a fork.");
}

#[tokio::test]
async fn continue_story_walks_linear_nodes() {
    let mut hub = hub(&[("linear.story", LINEAR)]);
    hub.initialize("linear", "linear.story").await.unwrap();

    let first = hub.state().unwrap();
    assert_eq!(first.current_text, "A door creaks open.");
    assert!(first.can_continue);

    hub.continue_story().unwrap();
    let second = hub.state().unwrap();
    assert_eq!(second.current_text, "Dust hangs in the light.");
    assert!(second.is_complete);
}

#[tokio::test]
async fn rejected_intents_publish_nothing() {
    let mut hub = hub(&[("fork.story", FORK)]);
    let states = collector(&mut hub);
    hub.initialize("fork", "fork.story").await.unwrap();

    let err = hub.continue_story().unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    let err = hub.make_choice(9).unwrap_err();
    assert!(matches!(err, EngineError::InvalidChoice { .. }));

    let states = states.lock().unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(*hub.state().unwrap(), states[0]);
}

#[tokio::test]
async fn initialize_resumes_saved_progress() {
    let mut hub = hub(&[("fork.story", FORK)]);
    hub.initialize("fork", "fork.story").await.unwrap();
    hub.make_choice(0).unwrap();
    hub.save_progress("fork").unwrap();

    // a later visit to the same story picks up in the study
    hub.initialize("fork", "fork.story").await.unwrap();
    let resumed = hub.state().unwrap();
    assert_eq!(resumed.choices.len(), 1);
    assert_eq!(resumed.choices[0].text, "Back to the fork");
    assert_eq!(
        resumed.variables.get("visited"),
        Some(&vignette::format::Literal::Boolean(true))
    );
}

#[tokio::test]
async fn corrupt_progress_falls_back_to_a_fresh_start() {
    let mut hub = hub(&[("v1.story", FORK), ("v2.story", LINEAR)]);
    hub.initialize("tale", "v1.story").await.unwrap();
    hub.make_choice(0).unwrap(); // now inside room_a
    hub.save_progress("tale").unwrap();

    // the story got replaced; the saved node is gone
    hub.initialize("tale", "v2.story").await.unwrap();
    let state = hub.state().unwrap();
    assert_eq!(state.current_text, "A door creaks open.");
    assert!(state.can_continue);
}

#[tokio::test]
async fn reset_story_clears_progress_and_republishes() {
    let mut hub = hub(&[("fork.story", FORK)]);
    hub.initialize("fork", "fork.story").await.unwrap();
    hub.make_choice(0).unwrap();
    hub.save_progress("fork").unwrap();
    assert!(hub.load_progress("fork").is_some());

    hub.reset_story("fork").unwrap();
    assert!(hub.load_progress("fork").is_none());

    let state = hub.state().unwrap();
    assert_eq!(state.current_text, "You stand at a fork.");
    assert_eq!(
        state.variables.get("visited"),
        Some(&vignette::format::Literal::Boolean(false))
    );
}

#[tokio::test]
async fn initializing_another_story_discards_the_live_slot() {
    let mut hub = hub(&[("fork.story", FORK), ("linear.story", LINEAR)]);
    hub.initialize("fork", "fork.story").await.unwrap();
    hub.make_choice(0).unwrap();

    hub.initialize("linear", "linear.story").await.unwrap();
    assert_eq!(hub.active_story(), Some("linear"));

    // the fork session was never saved, so nothing survives the eviction
    assert!(hub.load_progress("fork").is_none());
    assert!(matches!(
        hub.reset_story("fork").unwrap_err(),
        EngineError::StoryNotActive(_)
    ));
}

#[tokio::test]
async fn a_newer_initialize_supersedes_an_older_load() {
    let mut hub = hub(&[("fork.story", FORK), ("linear.story", LINEAR)]);

    let stale = hub.begin_initialize("fork");
    let fresh = hub.begin_initialize("linear");

    let err = hub.finish_initialize(stale, FORK.as_bytes()).unwrap_err();
    assert!(matches!(err, EngineError::LoadSuperseded));
    assert_eq!(hub.active_story(), None);

    hub.finish_initialize(fresh, LINEAR.as_bytes()).unwrap();
    assert_eq!(hub.active_story(), Some("linear"));
}

#[tokio::test]
async fn fetch_failure_surfaces_as_a_load_error() {
    let mut hub = hub(&[]);
    let err = hub.initialize("ghost", "ghost.story").await.unwrap_err();
    assert!(matches!(err, EngineError::MalformedStory(_)));
    assert!(hub.state().is_none());
}

#[test]
fn blocking_initialize_drives_the_async_path() {
    let mut hub = hub(&[("fork.story", FORK)]);
    hub.initialize_blocking("fork", "fork.story").unwrap();
    assert_eq!(hub.active_story(), Some("fork"));
}

#[tokio::test]
async fn unsubscribed_observers_stop_receiving() {
    let mut hub = hub(&[("fork.story", FORK)]);
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let id = hub.subscribe(Box::new(move |state: &StoryState| {
        sink.lock().unwrap().push(state.clone());
    }));

    hub.initialize("fork", "fork.story").await.unwrap();
    hub.unsubscribe(id);
    hub.make_choice(0).unwrap();

    assert_eq!(states.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn direct_variable_writes_feed_the_next_guard_evaluation() {
    let source = r#"
VAR key = false

=== hall ===
A locked door bars the way.
* { key } [Unlock the door] -> beyond
* [Search the room] -> hall

=== beyond ===
You step through.
-> END
"#;
    let mut hub = hub(&[("hall.story", source)]);
    hub.initialize("hall", "hall.story").await.unwrap();
    assert_eq!(hub.state().unwrap().choices.len(), 1);

    hub.set_variable("key", vignette::format::Literal::Boolean(true))
        .unwrap();
    // searching loops back to the hall, now with the unlock choice live
    hub.make_choice(0).unwrap();
    let state = hub.state().unwrap();
    assert_eq!(state.choices.len(), 2);
    assert_eq!(state.choices[0].text, "Unlock the door");

    hub.make_choice(0).unwrap();
    assert!(hub.state().unwrap().is_complete);
}
