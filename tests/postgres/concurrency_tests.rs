//! Racing movers against the `PostgreSQL` repository.

use std::collections::HashSet;

use super::helpers::PgBoard;
use eyre::ensure;
use rstest::rstest;
use taskboard::task::domain::TaskId;
use tokio::task::JoinSet;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_movers_keep_columns_dense() -> eyre::Result<()> {
    let Some(board) = PgBoard::connect().await? else {
        return Ok(());
    };
    let board = std::sync::Arc::new(board);
    let todo = board.seed("Todo", &["A", "B", "C", "D", "E", "F"]).await?;
    let done = board.seed("Done", &["X", "Y"]).await?;

    let mut movers = JoinSet::new();
    let plan = [
        (todo[0].id(), "Done", 0),
        (done[0].id(), "Todo", 3),
        (todo[5].id(), "Todo", 0),
        (todo[2].id(), "Done", 7),
        (done[1].id(), "Todo", 1),
        (todo[3].id(), "Todo", 4),
    ];
    for (task_id, column, position) in plan {
        let board = std::sync::Arc::clone(&board);
        movers.spawn(async move { board.move_task(task_id, column, position).await });
    }
    while let Some(joined) = movers.join_next().await {
        joined??;
    }

    board.assert_dense().await?;
    let mut seen: HashSet<TaskId> = board.order("Todo").await?.into_iter().collect();
    seen.extend(board.order("Done").await?);
    ensure!(seen.len() == 8, "expected eight tasks, found {}", seen.len());
    Ok(())
}
