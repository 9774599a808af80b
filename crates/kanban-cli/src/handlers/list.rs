use crate::cli::ListAction;
use crate::context::CliContext;
use crate::handlers::{applied, drag_result};
use crate::output;
use kanban_domain::{FieldUpdate, ListUpdate, Scope};
use kanban_persistence::EntityStore;
use kanban_sync::DragEnd;

pub async fn handle(ctx: &mut CliContext, action: ListAction) -> anyhow::Result<()> {
    match action {
        ListAction::Create { board_id, name } => {
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, board_id).await?;
            let list = applied(session.add_list(&name).await?)?;
            session.close();
            output::output_success(&list);
        }
        ListAction::List { board_id } => {
            ctx.require_member(board_id).await?;
            let lists: Vec<_> = ctx
                .store
                .fetch_ordered(Scope::Lists(board_id))
                .await?
                .into_iter()
                .filter_map(|entity| entity.into_list())
                .collect();
            output::output_list(lists);
        }
        ListAction::Move { id, position } => {
            let list = ctx.list(id).await?;
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, list.board_id).await?;

            let lists = session.lists();
            let source_index = lists
                .iter()
                .position(|l| l.id == id)
                .ok_or_else(|| anyhow::anyhow!("list {} vanished from its board", id))?;
            let outcome = session
                .on_drag_end(DragEnd::list(list.board_id, source_index, position))
                .await?;
            session.close();
            output::output_success(drag_result(outcome)?);
        }
        ListAction::Update {
            id,
            name,
            wip_limit,
            clear_wip_limit,
            archived,
        } => {
            let updates = ListUpdate {
                name,
                wip_limit: if clear_wip_limit {
                    FieldUpdate::Clear
                } else {
                    wip_limit.map_or(FieldUpdate::NoChange, FieldUpdate::Set)
                },
                archived,
            };
            if !updates.is_change() {
                anyhow::bail!("nothing to update for list {}", id);
            }
            let list = ctx.list(id).await?;
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, list.board_id).await?;
            let list = applied(session.quick_update_entity(id, updates.into()).await?)?;
            session.close();
            output::output_success(&list);
        }
        ListAction::Delete { id } => {
            let list = ctx.list(id).await?;
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, list.board_id).await?;
            applied(session.delete_list(id).await?)?;
            session.close();
            output::output_success(serde_json::json!({"deleted": id.to_string()}));
        }
    }
    Ok(())
}
