//! Dense ordering scenarios driven through the board service.

use super::helpers::{TestBoard, board};
use eyre::ensure;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn last_task_moved_to_top_of_its_column(board: TestBoard) -> eyre::Result<()> {
    let [a, b, c] = <[_; 3]>::try_from(board.seed("Todo", &["A", "B", "C"]).await?)
        .map_err(|_| eyre::eyre!("expected three tasks"))?;

    board.move_task(c.id(), "Todo", 0).await?;

    assert_eq!(board.order("Todo").await?, vec![c.id(), a.id(), b.id()]);
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_moved_to_top_of_another_column(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B"]).await?;
    let done = board.seed("Done", &["X"]).await?;
    let (a, b, x) = (&todo[0], &todo[1], &done[0]);

    board.move_task(a.id(), "Done", 0).await?;

    assert_eq!(board.order("Todo").await?, vec![b.id()]);
    assert_eq!(board.order("Done").await?, vec![a.id(), x.id()]);
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_middle_task_repacks_the_column(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B", "C"]).await?;

    board.service.delete_task(board.user, todo[1].id()).await?;

    assert_eq!(board.order("Todo").await?, vec![todo[0].id(), todo[2].id()]);
    board.assert_dense().await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn move_there_and_back_restores_every_position(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B", "C", "D"]).await?;
    board.seed("Done", &["X", "Y", "Z"]).await?;
    let before = board.snapshot().await?;
    let moving = &todo[2];

    board.move_task(moving.id(), "Done", 1).await?;
    board.move_task(moving.id(), "Todo", 2).await?;

    let after = board.snapshot().await?;
    ensure!(after == before, "round trip changed positions: {before:?} -> {after:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moving_into_a_new_column_creates_it(board: TestBoard) -> eyre::Result<()> {
    let todo = board.seed("Todo", &["A", "B"]).await?;

    let moved = board.move_task(todo[0].id(), "Blocked", 5).await?;

    assert_eq!(moved.column().as_str(), "Blocked");
    assert_eq!(moved.position().value(), 0);
    assert_eq!(board.order("Todo").await?, vec![todo[1].id()]);
    board.assert_dense().await
}

/// Small deterministic generator so the operation mix is reproducible.
struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let high = usize::try_from(self.0 >> 33).unwrap_or(0);
        high.checked_rem(bound).unwrap_or(0)
    }
}

#[rstest]
#[case(7)]
#[case(42)]
#[case(2024)]
#[tokio::test(flavor = "multi_thread")]
async fn any_sequence_of_operations_keeps_columns_dense(
    board: TestBoard,
    #[case] seed: u64,
) -> eyre::Result<()> {
    const COLUMNS: [&str; 3] = ["Todo", "Doing", "Done"];
    let mut rng = Lcg(seed);
    let mut live = Vec::new();

    for step in 0..120 {
        let column = COLUMNS[rng.below(COLUMNS.len())];
        match rng.below(10) {
            0..=2 => live.push(board.create(&format!("task {step}"), column).await?.id()),
            3 if !live.is_empty() => {
                let victim = live.swap_remove(rng.below(live.len()));
                board.service.delete_task(board.user, victim).await?;
            }
            _ if !live.is_empty() => {
                let task_id = live[rng.below(live.len())];
                let target = i64::try_from(rng.below(8))?;
                board.move_task(task_id, column, target).await?;
            }
            _ => live.push(board.create(&format!("task {step}"), column).await?.id()),
        }
        board.assert_dense().await?;
    }

    let stored = board.snapshot().await?;
    ensure!(stored.len() == live.len(), "task count drifted");
    Ok(())
}
