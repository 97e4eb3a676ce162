//! Concurrent movers against one shared board.

use std::collections::HashSet;
use std::time::Duration;

use super::helpers::{TestBoard, board};
use eyre::{ensure, eyre};
use rstest::rstest;
use taskboard::task::{
    domain::{ActivityAction, TaskId, TaskUpdate},
    services::MoveTaskRequest,
};
use tokio::task::JoinSet;
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(10);

async fn join_all(mut set: JoinSet<eyre::Result<()>>) -> eyre::Result<()> {
    while let Some(joined) = set.join_next().await {
        joined??;
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_moves_in_one_column_stay_dense(board: TestBoard) -> eyre::Result<()> {
    let titles: Vec<String> = (0..12).map(|n| format!("card {n}")).collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let seeded = board.seed("Todo", &refs).await?;

    let mut movers = JoinSet::new();
    for (index, task) in seeded.iter().enumerate() {
        let board = board.clone();
        let task_id = task.id();
        let target = i64::try_from((index * 7) % 12)?;
        movers.spawn(async move {
            board.move_task(task_id, "Todo", target).await?;
            Ok(())
        });
    }
    timeout(DEADLINE, join_all(movers))
        .await
        .map_err(|_| eyre!("movers did not finish in time"))??;

    board.assert_dense().await?;
    let order: HashSet<TaskId> = board.order("Todo").await?.into_iter().collect();
    let expected: HashSet<TaskId> = seeded.iter().map(|task| task.id()).collect();
    ensure!(order == expected, "tasks were lost or duplicated");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_cross_column_moves_do_not_deadlock(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B", "C", "D"]).await?;
    let done = board.seed("Done", &["W", "X", "Y", "Z"]).await?;

    let mut movers = JoinSet::new();
    for (left, right) in todo.iter().zip(&done) {
        for (task_id, column) in [(left.id(), "Done"), (right.id(), "Todo")] {
            let board = board.clone();
            movers.spawn(async move {
                board.move_task(task_id, column, 0).await?;
                Ok(())
            });
        }
    }
    timeout(DEADLINE, join_all(movers))
        .await
        .map_err(|_| eyre!("cross-column movers deadlocked"))??;

    board.assert_dense().await?;
    ensure!(board.order("Todo").await?.len() == 4, "Todo lost tasks");
    ensure!(board.order("Done").await?.len() == 4, "Done lost tasks");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn later_move_sees_the_earlier_commit(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B", "C"]).await?;
    let (a, b, c) = (todo[0].id(), todo[1].id(), todo[2].id());

    let first = {
        let board = board.clone();
        tokio::spawn(async move { board.move_task(a, "Todo", 2).await })
    };
    let second = {
        let board = board.clone();
        tokio::spawn(async move { board.move_task(c, "Todo", 0).await })
    };
    first.await??;
    second.await??;

    // Both serial orders end in [C, B, A].
    assert_eq!(board.order("Todo").await?, vec![c, b, a]);
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_take_distinct_slots(board: TestBoard) -> eyre::Result<()> {
    let mut creators = JoinSet::new();
    for n in 0..20 {
        let board = board.clone();
        creators.spawn(async move {
            board.create(&format!("card {n}"), "Todo").await?;
            Ok(())
        });
    }
    timeout(DEADLINE, join_all(creators))
        .await
        .map_err(|_| eyre!("creators did not finish in time"))??;

    ensure!(board.order("Todo").await?.len() == 20, "missing tasks");
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deletes_racing_moves_leave_a_dense_board(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B", "C", "D", "E", "F"]).await?;
    board.seed("Done", &["X"]).await?;

    let mut workers = JoinSet::new();
    for (index, task) in todo.iter().enumerate() {
        let board = board.clone();
        let task_id = task.id();
        workers.spawn(async move {
            if index % 2 == 0 {
                board.service.delete_task(board.user, task_id).await?;
            } else {
                board
                    .service
                    .move_task(board.user, task_id, MoveTaskRequest::new("Done", 0))
                    .await?;
            }
            Ok(())
        });
    }
    timeout(DEADLINE, join_all(workers))
        .await
        .map_err(|_| eyre!("workers did not finish in time"))??;

    board.assert_dense().await?;
    ensure!(board.order("Todo").await?.is_empty(), "Todo should be empty");
    ensure!(board.order("Done").await?.len() == 4, "Done should hold four tasks");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moves_on_other_projects_do_not_interfere() -> eyre::Result<()> {
    let first = TestBoard::new(16);
    let second = TestBoard::new(16);
    let a = first.seed("Todo", &["A", "B"]).await?;
    let x = second.seed("Todo", &["X", "Y"]).await?;

    let (left, right) = tokio::join!(
        first.move_task(a[1].id(), "Todo", 0),
        second.move_task(x[1].id(), "Todo", 0),
    );
    left?;
    right?;

    assert_eq!(first.order("Todo").await?, vec![a[1].id(), a[0].id()]);
    assert_eq!(second.order("Todo").await?, vec![x[1].id(), x[0].id()]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn content_edits_racing_moves_lose_nothing(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B"]).await?;
    let a = todo[0].id();

    let mut workers: JoinSet<eyre::Result<usize>> = JoinSet::new();
    for n in 0..8 {
        let editor = board.clone();
        workers.spawn(async move {
            let update = TaskUpdate {
                title: Some(format!("A rev {n}")),
                ..TaskUpdate::default()
            };
            editor.service.update_task(editor.user, a, update).await?;
            editor
                .service
                .add_subtask(editor.user, a, format!("step {n}"))
                .await?;
            Ok(0)
        });
        let mover = board.clone();
        workers.spawn(async move {
            let column = if n % 2 == 0 { "Done" } else { "Todo" };
            let outcome = mover
                .service
                .move_task(mover.user, a, MoveTaskRequest::new(column, 0))
                .await?;
            Ok(usize::from(outcome.changed))
        });
    }
    let mut moves = 0;
    timeout(DEADLINE, async {
        while let Some(joined) = workers.join_next().await {
            moves += joined??;
        }
        Ok::<_, eyre::Report>(())
    })
    .await
    .map_err(|_| eyre!("workers did not finish in time"))??;

    let stored = board.service.get_task(board.user, a).await?;
    ensure!(stored.subtasks().len() == 8, "subtask edits overwrote each other");
    let count = |action: ActivityAction| {
        stored
            .activity_log()
            .iter()
            .filter(|entry| entry.action == action)
            .count()
    };
    ensure!(count(ActivityAction::Created) == 1, "creation entry lost");
    ensure!(count(ActivityAction::Updated) == 8, "title entries lost");
    ensure!(count(ActivityAction::Moved) == moves, "move entries lost");
    board.assert_dense().await
}
