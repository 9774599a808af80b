use crate::cli::SprintAction;
use crate::context::CliContext;
use crate::handlers::parse_datetime;
use crate::output;
use chrono::{Duration, Utc};
use kanban_domain::{DailyNote, Retrospective, SprintId};
use kanban_persistence::SprintStore;

pub async fn handle(ctx: &mut CliContext, action: SprintAction) -> anyhow::Result<()> {
    let service = ctx.sprints();
    match action {
        SprintAction::Create {
            board_id,
            name,
            goal,
            start,
            duration_days,
        } => {
            ctx.require_editor(board_id).await?;
            let start = match start {
                Some(s) => parse_datetime(&s)?,
                None => Utc::now(),
            };
            let end = start + Duration::days(duration_days);
            let sprint = service.create_sprint(board_id, name, goal, start, end).await?;
            output::output_success(&sprint);
        }
        SprintAction::List { board_id } => {
            ctx.require_member(board_id).await?;
            let sprints = ctx.store.sprints_for_board(board_id).await?;
            output::output_list(sprints);
        }
        SprintAction::Get { id } => {
            let sprint = ctx.store.get_sprint(id).await?;
            ctx.require_member(sprint.board_id).await?;
            output::output_success(&sprint);
        }
        SprintAction::AddCard { id, card_id } => {
            require_sprint_editor(ctx, id).await?;
            let sprint = service.add_card(id, card_id).await?;
            output::output_success(&sprint);
        }
        SprintAction::RemoveCard { id, card_id } => {
            require_sprint_editor(ctx, id).await?;
            let sprint = service.remove_card(id, card_id).await?;
            output::output_success(&sprint);
        }
        SprintAction::Metrics { id } => {
            let sprint = ctx.store.get_sprint(id).await?;
            ctx.require_member(sprint.board_id).await?;
            let sprint = service.refresh_metrics(id).await?;
            output::output_success(&sprint.metrics);
        }
        SprintAction::Note {
            id,
            notes,
            impediments,
            participants,
        } => {
            require_sprint_editor(ctx, id).await?;
            let note = DailyNote::new(impediments, notes, participants);
            let sprint = service.add_daily_note(id, note).await?;
            output::output_success(&sprint);
        }
        SprintAction::Retro {
            id,
            positives,
            negatives,
            action_items,
            participants,
        } => {
            require_sprint_editor(ctx, id).await?;
            let retrospective = Retrospective {
                positives,
                negatives,
                action_items,
                participants,
                held_at: None,
            };
            let sprint = service.set_retrospective(id, retrospective).await?;
            output::output_success(&sprint);
        }
        SprintAction::Activate { id } => {
            require_sprint_editor(ctx, id).await?;
            let sprint = service.activate(id).await?;
            output::output_success(&sprint);
        }
        SprintAction::Complete { id } => {
            require_sprint_editor(ctx, id).await?;
            let sprint = service.complete(id).await?;
            output::output_success(&sprint);
        }
        SprintAction::Cancel { id } => {
            require_sprint_editor(ctx, id).await?;
            let sprint = service.cancel(id).await?;
            output::output_success(&sprint);
        }
        SprintAction::Delete { id } => {
            require_sprint_editor(ctx, id).await?;
            ctx.store.delete_sprint(id).await?;
            output::output_success(serde_json::json!({"deleted": id.to_string()}));
        }
    }
    Ok(())
}

async fn require_sprint_editor(ctx: &CliContext, id: SprintId) -> anyhow::Result<()> {
    let sprint = ctx.store.get_sprint(id).await?;
    ctx.require_editor(sprint.board_id).await?;
    Ok(())
}
