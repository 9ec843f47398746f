use anyhow::Result;
use tokio::fs;

use super::HistoryStore;
use crate::domain::models::AgentReply;
use crate::domain::models::Message;

fn temp_store() -> (tempfile::TempDir, HistoryStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path().join("history"));

    return (dir, store);
}

#[tokio::test]
async fn it_round_trips_messages() {
    let (_dir, store) = temp_store();

    let user = Message::user("Show me laptops");
    let assistant = Message::assistant(AgentReply {
        text: "Here are some popular options.".to_string(),
        bounding_boxes: vec![],
    });

    store.append(&user).await;
    store.append(&assistant).await;

    let loaded = store.load().await;
    assert_eq!(loaded, vec![user.clone(), assistant.clone()]);
    assert_eq!(loaded[0].timestamp, user.timestamp);
    assert_eq!(loaded[1].timestamp, assistant.timestamp);
}

#[tokio::test]
async fn it_loads_in_creation_order() {
    let (_dir, store) = temp_store();

    let mut ids: Vec<String> = vec![];
    for idx in 0..8 {
        let message = Message::user(&format!("message {idx}"));
        ids.push(message.id.clone());
        store.append(&message).await;
    }

    let loaded = store
        .load()
        .await
        .iter()
        .map(|message| return message.id.clone())
        .collect::<Vec<String>>();

    assert_eq!(loaded, ids);
}

#[tokio::test]
async fn it_clears_all_records() {
    let (_dir, store) = temp_store();

    store.append(&Message::user("hello")).await;
    assert_eq!(store.load().await.len(), 1);

    store.clear().await;
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn it_loads_empty_when_the_store_is_missing() {
    let (_dir, store) = temp_store();
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn it_swallows_append_failures() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").await?;

    // The store directory path sits below a regular file, so every write
    // fails. None of that may surface.
    let store = HistoryStore::new(blocker.join("history"));
    store.append(&Message::user("hello")).await;
    store.clear().await;
    assert!(store.load().await.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_skips_corrupt_records() -> Result<()> {
    let (_dir, store) = temp_store();

    let message = Message::user("hello");
    store.append(&message).await;
    fs::write(store.store_dir.join("zzzz-garbage.yaml"), "{not yaml: [")
        .await?;

    let loaded = store.load().await;
    assert_eq!(loaded, vec![message]);

    return Ok(());
}
