//! Given steps for Kanban move BDD scenarios.

use super::world::{KanbanWorld, run_async, titles};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use taskboard::task::domain::TaskDraft;

#[given(r#"a "{column}" column holding "{list}""#)]
fn column_holding(
    world: &mut KanbanWorld,
    column: String,
    list: String,
) -> Result<(), eyre::Report> {
    for title in titles(&list) {
        let draft = TaskDraft::new(world.project, title.clone(), column.clone(), world.user);
        let created = run_async(world.service.create_task(draft))
            .wrap_err_with(|| format!("seed {title} into {column}"))?;
        world.tasks.insert(title, created.id());
    }
    Ok(())
}
