//! Broadcast fan-out observed by project subscribers.

use std::sync::Arc;

use super::helpers::{TestBoard, board};
use eyre::{OptionExt, ensure};
use rstest::rstest;
use taskboard::{
    client::BoardCache,
    realtime::Subscription,
    task::{
        domain::{BoardEvent, ColumnName},
        ports::TaskRepository,
    },
};
use tokio::task::JoinSet;

fn drain(subscription: &mut Subscription) -> Vec<Arc<BoardEvent>> {
    std::iter::from_fn(|| subscription.try_recv()).collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subscribers_see_events_in_commit_order(board: TestBoard) -> eyre::Result<()> {
    let mut subscription = board.channels.join(board.project);
    let todo = board.seed("Todo", &["A", "B"]).await?;
    board.move_task(todo[1].id(), "Todo", 0).await?;
    board.service.delete_task(board.user, todo[0].id()).await?;

    let names: Vec<&str> = drain(&mut subscription)
        .iter()
        .map(|event| event.name())
        .collect();
    assert_eq!(
        names,
        vec!["task-created", "task-created", "task-moved", "task-deleted"]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moved_event_carries_the_committed_placement(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B", "C"]).await?;
    let mut subscription = board.channels.join(board.project);

    board.move_task(todo[2].id(), "Done", 9).await?;

    let event = subscription.recv().await.ok_or_eyre("no event delivered")?;
    let BoardEvent::TaskMoved(moved) = event.as_ref() else {
        eyre::bail!("expected task-moved, got {}", event.name());
    };
    assert_eq!(moved.task_id, todo[2].id());
    assert_eq!(moved.column.as_str(), "Done");
    assert_eq!(moved.position.value(), 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn other_projects_receive_nothing(board: TestBoard) -> eyre::Result<()> {
    let elsewhere = TestBoard::new(8);
    let mut foreign = board.channels.join(elsewhere.project);

    let todo = board.seed("Todo", &["A", "B"]).await?;
    board.move_task(todo[0].id(), "Todo", 1).await?;

    ensure!(drain(&mut foreign).is_empty(), "foreign project saw events");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn lagging_subscriber_is_dropped_without_failing_the_move() -> eyre::Result<()> {
    let board = TestBoard::new(1);
    let mut slow = board.channels.join(board.project);
    let todo = board.seed("Todo", &["A", "B"]).await?;

    // The second creation overflowed the single-slot buffer.
    ensure!(
        board.channels.subscriber_count(board.project) == 0,
        "lagging subscriber should have been removed"
    );
    board.move_task(todo[1].id(), "Todo", 0).await?;

    assert_eq!(board.order("Todo").await?, vec![todo[1].id(), todo[0].id()]);
    ensure!(slow.try_recv().is_some(), "buffered event should remain readable");
    ensure!(slow.recv().await.is_none(), "channel should be closed");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn leaving_stops_delivery(board: TestBoard) -> eyre::Result<()> {
    let subscription = board.channels.join(board.project);
    let id = subscription.id();
    drop(subscription);

    ensure!(!board.channels.members(board.project).contains(&id), "still joined");
    board.create("A", "Todo").await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn replaying_broadcasts_rebuilds_the_server_board(board: TestBoard) -> eyre::Result<()> {
    let mut subscription = board.channels.join(board.project);
    let todo = board.seed("Todo", &["A", "B", "C", "D"]).await?;
    let done = board.seed("Done", &["X", "Y"]).await?;

    let mut movers = JoinSet::new();
    let moves = [
        (todo[3].id(), "Todo", 0),
        (done[1].id(), "Todo", 2),
        (todo[0].id(), "Done", 1),
        (todo[1].id(), "Todo", 9),
        (done[0].id(), "Done", 5),
    ];
    for (task_id, column, position) in moves {
        let board = board.clone();
        movers.spawn(async move { board.move_task(task_id, column, position).await });
    }
    while let Some(joined) = movers.join_next().await {
        joined??;
    }

    let mut cache = BoardCache::new(board.project);
    for event in drain(&mut subscription) {
        cache.apply_event(&event);
    }

    for name in ["Todo", "Done"] {
        let column = ColumnName::new(name)?;
        assert_eq!(cache.column(&column), board.order(name).await?, "column {name}");
    }
    let stored = board.repository.list_by_project(board.project).await?;
    for task in &stored {
        let cached = cache.get(task.id()).ok_or_eyre("task missing from cache")?;
        assert_eq!(&cached.column, task.column());
        assert_eq!(cached.position, task.position());
    }
    Ok(())
}
