//! Ordering scenarios against the `PostgreSQL` repository.

use super::helpers::PgBoard;
use eyre::ensure;
use rstest::rstest;
use taskboard::task::{
    domain::{ActivityAction, TaskUpdate},
    services::ErrorKind,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reorder_within_a_column_persists() -> eyre::Result<()> {
    let Some(board) = PgBoard::connect().await? else {
        return Ok(());
    };
    let todo = board.seed("Todo", &["A", "B", "C"]).await?;

    board.move_task(todo[2].id(), "Todo", 0).await?;

    assert_eq!(
        board.order("Todo").await?,
        vec![todo[2].id(), todo[0].id(), todo[1].id()]
    );
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cross_column_move_closes_the_gap_and_clamps() -> eyre::Result<()> {
    let Some(board) = PgBoard::connect().await? else {
        return Ok(());
    };
    let todo = board.seed("Todo", &["A", "B", "C"]).await?;
    let done = board.seed("Done", &["X"]).await?;

    let moved = board.move_task(todo[0].id(), "Done", 99).await?;

    assert_eq!(moved.position().value(), 1);
    assert_eq!(board.order("Todo").await?, vec![todo[1].id(), todo[2].id()]);
    assert_eq!(board.order("Done").await?, vec![done[0].id(), todo[0].id()]);
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_repacks_and_activity_survives_reload() -> eyre::Result<()> {
    let Some(board) = PgBoard::connect().await? else {
        return Ok(());
    };
    let todo = board.seed("Todo", &["A", "B", "C"]).await?;
    board.move_task(todo[2].id(), "Doing", 0).await?;

    board.service.delete_task(board.user, todo[0].id()).await?;

    assert_eq!(board.order("Todo").await?, vec![todo[1].id()]);
    let log = board.service.activity(board.user, todo[2].id()).await?;
    ensure!(log.len() == 2, "expected creation and move entries, got {}", log.len());
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_user_is_forbidden() -> eyre::Result<()> {
    let Some(board) = PgBoard::connect().await? else {
        return Ok(());
    };
    let todo = board.seed("Todo", &["A"]).await?;

    let err = board
        .service
        .get_task(taskboard::task::domain::UserId::new(), todo[0].id())
        .await
        .err()
        .ok_or_else(|| eyre::eyre!("stranger read the task"))?;

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn content_edits_append_to_the_stored_activity_log() -> eyre::Result<()> {
    let Some(board) = PgBoard::connect().await? else {
        return Ok(());
    };
    let todo = board.seed("Todo", &["A", "B"]).await?;
    let a = todo[0].id();
    board.move_task(a, "Done", 0).await?;

    let update = TaskUpdate {
        title: Some("A prime".to_owned()),
        ..TaskUpdate::default()
    };
    let edited = board.service.update_task(board.user, a, update).await?;
    board.service.add_subtask(board.user, a, "check").await?;

    let reloaded = board.service.get_task(board.user, a).await?;
    let actions: Vec<ActivityAction> = reloaded
        .activity_log()
        .iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            ActivityAction::Created,
            ActivityAction::Moved,
            ActivityAction::Updated
        ]
    );
    assert_eq!(edited.column().as_str(), "Done");
    assert_eq!(reloaded.title(), "A prime");
    assert_eq!(reloaded.subtasks().len(), 1);
    board.assert_dense().await
}
