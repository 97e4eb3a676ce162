//! When steps for Kanban move BDD scenarios.

use super::world::{KanbanWorld, run_async};
use rstest_bdd_macros::when;
use taskboard::task::services::MoveTaskRequest;

#[when(r#""{title}" is moved to "{column}" at position {position:i64}"#)]
fn move_task(
    world: &mut KanbanWorld,
    title: String,
    column: String,
    position: i64,
) -> Result<(), eyre::Report> {
    let task_id = world.task_id(&title)?;
    while world.subscription.try_recv().is_some() {}

    let result = run_async(world.service.move_task(
        world.user,
        task_id,
        MoveTaskRequest::new(column, position),
    ));
    world.last_move = Some(result);
    world.events = std::iter::from_fn(|| world.subscription.try_recv()).collect();
    Ok(())
}
