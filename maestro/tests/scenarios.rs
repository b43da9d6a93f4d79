//! End-to-end turns with a scripted generator.
//!
//! Each script interleaves coordinator replies and extractor replies in the
//! order the turn loop asks for them.

use maestro::prelude::*;
use maestro::testing::{tool_call, update_memory, ScriptedGenerator};
use maestro::updater::{TodoUpdater, Updater};
use serde_json::json;

fn namespace(category: MemoryCategory) -> Namespace {
    Namespace::for_category(category, "alex")
}

fn setup(replies: Vec<Message>) -> (Arc<ScriptedGenerator>, Arc<InMemoryStore>, TaskMaestro) {
    let generator = Arc::new(ScriptedGenerator::with_replies(replies));
    let store = Arc::new(InMemoryStore::new());
    let maestro = TaskMaestro::new(generator.clone(), store.clone())
        .with_keys(Arc::new(SequentialKeys::new("todo")));
    (generator, store, maestro)
}

fn user_says(text: &str) -> ConversationState {
    let mut state = ConversationState::new();
    state.push(Message::user(text));
    state
}

#[tokio::test]
async fn scenario_a_new_todo() {
    let (generator, store, maestro) = setup(vec![
        update_memory("call_1", "todo"),
        tool_call("ToDo", json!({"task": "Buy milk"})),
        Message::assistant("I've added buying milk to your ToDo list."),
    ]);

    let mut state = user_says("Remind me to buy milk");
    let report = maestro.run_turn(&mut state, &Turn::new("alex")).await.unwrap();

    assert_eq!(report.steps, 3);
    assert_eq!(report.updates.len(), 1);
    assert_eq!(report.updates[0].category, MemoryCategory::Todo);

    let items = store.search(&namespace(MemoryCategory::Todo)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].value["task"].as_str().unwrap().to_lowercase().contains("milk"));
    assert_eq!(items[0].value["status"], "not started");

    // user, routing call, acknowledgment, final reply
    assert_eq!(state.len(), 4);
    assert_eq!(state.messages[2].role, Role::Tool);
    assert!(report.updates[0].acknowledgment.starts_with("New ToDo created:"));
    assert!(!state.last().unwrap().has_tool_calls());

    // The extractor reflected on the conversation without the routing call.
    let requests = generator.requests();
    let extraction = &requests[1];
    assert_eq!(extraction.messages.len(), 2);
    assert_eq!(extraction.messages[0].role, Role::System);
    assert_eq!(extraction.messages[1].text_content(), "Remind me to buy milk");

    // The coordinator's second pass saw the new record in its prompt.
    assert!(requests[2].messages[0].text_content().contains("Buy milk"));
}

#[tokio::test]
async fn scenario_b_patch_existing_todo() {
    let (generator, store, maestro) = setup(vec![
        update_memory("call_1", "todo"),
        tool_call(
            "PatchDoc",
            json!({
                "json_doc_id": "abc",
                "planned_edits": "The user bought the milk, mark the task done",
                "patches": [{"op": "replace", "path": "/status", "value": "done"}]
            }),
        ),
        Message::assistant("Nice, I've marked the milk as done."),
    ]);
    let todos = namespace(MemoryCategory::Todo);
    store
        .put(
            &todos,
            &RecordKey::new("abc"),
            json!({"task": "buy milk", "status": "not started", "solutions": []}),
        )
        .await
        .unwrap();

    let mut state = user_says("I already bought the milk, mark it done");
    let report = maestro.run_turn(&mut state, &Turn::new("alex")).await.unwrap();

    let items = store.search(&todos).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key.as_str(), "abc");
    assert_eq!(items[0].value["status"], "done");
    assert_eq!(items[0].value["task"], "buy milk");

    let ack = &report.updates[0].acknowledgment;
    assert!(ack.starts_with("Document abc updated:\nPlan: The user bought the milk"));

    // The extractor was shown the record and offered both tools.
    let extraction = &generator.requests()[1];
    assert!(extraction.messages[0].text_content().contains("[abc] ToDo:"));
    let tools: Vec<_> = extraction.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tools, ["ToDo", "PatchDoc"]);
}

#[tokio::test]
async fn scenario_c_profile_is_silent() {
    let (generator, store, maestro) = setup(vec![
        update_memory("call_1", "user"),
        tool_call("Profile", json!({"name": "Alex", "location": "Denver"})),
        Message::assistant("Nice to meet you, Alex! How do you like Denver?"),
    ]);

    let mut state = user_says("My name is Alex and I live in Denver");
    let report = maestro.run_turn(&mut state, &Turn::new("alex")).await.unwrap();

    let items = store.search(&namespace(MemoryCategory::Profile)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].value["name"], "Alex");
    assert_eq!(items[0].value["location"], "Denver");

    assert_eq!(report.updates[0].acknowledgment, "updated profile");
    assert!(!state.last().unwrap().text_content().to_lowercase().contains("profile"));

    // The coordinator prompt carries the no-announcement policy and the new profile.
    let second_pass = generator.requests()[2].messages[0].text_content();
    assert!(second_pass.contains("Do not tell the user you have updated the user's profile"));
    assert!(second_pass.contains("Denver"));
}

#[tokio::test]
async fn scenario_d_instructions_replaced() {
    let (_generator, store, maestro) = setup(vec![
        update_memory("call_1", "instructions"),
        Message::assistant("Keep tasks short."),
        Message::assistant("Sure."),
        update_memory("call_2", "instructions"),
        Message::assistant("Always add a due date to tasks."),
        Message::assistant("Understood."),
    ]);
    let turn = Turn::new("alex");

    let mut state = user_says("Keep my tasks short");
    maestro.run_turn(&mut state, &turn).await.unwrap();
    state.push(Message::user("Always add a due date to tasks"));
    let report = maestro.run_turn(&mut state, &turn).await.unwrap();

    let items = store.search(&namespace(MemoryCategory::Instructions)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].value["memory"].as_str().unwrap().contains("due date"));
    assert_eq!(report.updates[0].acknowledgment, "updated instructions");
    assert!(matches!(report.updates[0].changes[0], Change::Updated { .. }));
}

#[tokio::test]
async fn reconciling_twice_adds_nothing() {
    let generator = Arc::new(ScriptedGenerator::new());
    let store = Arc::new(InMemoryStore::new());
    let updater = TodoUpdater::new(generator.clone(), store.clone(), Arc::new(SequentialKeys::new("todo")));
    let turn = Turn::new("alex");
    let todos = namespace(MemoryCategory::Todo);

    let mut state = user_says("Remind me to buy milk");
    state.push(update_memory("call_1", "todo"));

    generator.push(tool_call("ToDo", json!({"task": "Buy milk"})));
    updater.run(&mut state.clone(), &turn).await.unwrap();
    let after_first = store.search(&todos).await.unwrap();

    // Against the updated records the model patches to the same value.
    generator.push(tool_call(
        "PatchDoc",
        json!({
            "json_doc_id": "todo-1",
            "planned_edits": "Already recorded",
            "patches": [{"op": "replace", "path": "/task", "value": "Buy milk"}]
        }),
    ));
    updater.run(&mut state.clone(), &turn).await.unwrap();
    let after_second = store.search(&todos).await.unwrap();

    assert_eq!(after_first.len(), 1);
    assert_eq!(after_second.len(), 1);
    assert_eq!(after_first[0].key, after_second[0].key);
    assert_eq!(after_first[0].value, after_second[0].value);
}

#[tokio::test]
async fn inserts_never_reuse_existing_keys() {
    let generator = Arc::new(ScriptedGenerator::new());
    let store = Arc::new(InMemoryStore::new());
    let todos = namespace(MemoryCategory::Todo);
    store
        .put(&todos, &RecordKey::new("todo-1"), json!({"task": "Walk the dog"}))
        .await
        .unwrap();
    let updater = TodoUpdater::new(generator.clone(), store.clone(), Arc::new(SequentialKeys::new("todo")));

    let mut state = user_says("Also remind me to buy milk");
    state.push(update_memory("call_1", "todo"));
    generator.push(tool_call("ToDo", json!({"task": "Buy milk"})));
    let report = updater.run(&mut state, &Turn::new("alex")).await.unwrap();

    assert_eq!(report.changes[0].key().as_str(), "todo-2");
    let items = store.search(&todos).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].value["task"], "Walk the dog");
}

#[tokio::test]
async fn profile_stays_singleton() {
    let mut replies = Vec::new();
    for (i, fact) in ["Alex", "Denver", "baker"].iter().enumerate() {
        replies.push(update_memory(&format!("call_{i}"), "user"));
        if i == 0 {
            replies.push(tool_call("Profile", json!({"name": fact})));
        } else {
            replies.push(tool_call(
                "PatchDoc",
                json!({
                    "json_doc_id": "profile-1",
                    "planned_edits": "Add fact",
                    "patches": [{"op": "add", "path": "/interests/-", "value": fact}]
                }),
            ));
        }
        replies.push(Message::assistant("Noted."));
    }
    let generator = Arc::new(ScriptedGenerator::with_replies(replies));
    let store = Arc::new(InMemoryStore::new());
    let maestro = TaskMaestro::new(generator, store.clone())
        .with_keys(Arc::new(SequentialKeys::new("profile")));
    let turn = Turn::new("alex");

    let mut state = ConversationState::new();
    for text in ["I'm Alex", "I live in Denver", "I bake"] {
        state.push(Message::user(text));
        maestro.run_turn(&mut state, &turn).await.unwrap();
    }

    let items = store.search(&namespace(MemoryCategory::Profile)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].value["name"], "Alex");
    assert_eq!(items[0].value["interests"], json!(["Denver", "baker"]));
}
