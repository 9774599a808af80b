use crate::cli::{BoardAction, BoardUpdateArgs};
use crate::context::CliContext;
use crate::output;
use kanban_domain::{Board, BoardUpdate, FieldUpdate, MemberRole, Visibility};
use kanban_persistence::BoardStore;

pub async fn handle(ctx: &mut CliContext, action: BoardAction) -> anyhow::Result<()> {
    match action {
        BoardAction::Create {
            name,
            description,
            visibility,
        } => {
            let mut board = Board::new(ctx.user.clone(), ctx.user.clone(), name, description);
            if let Some(visibility) = visibility {
                board.visibility = visibility.parse::<Visibility>()?;
            }
            let board = ctx.store.create_board(board).await?;
            output::output_success(&board);
        }
        BoardAction::List => {
            let boards = ctx.store.boards_for_member(&ctx.user).await?;
            output::output_list(boards);
        }
        BoardAction::Get { id } => {
            let board = ctx.require_member(id).await?;
            output::output_success(&board);
        }
        BoardAction::Update(args) => {
            ctx.require_editor(args.id).await?;
            let updates = build_board_update(&args)?;
            let board = ctx.store.update_board(args.id, updates).await?;
            output::output_success(&board);
        }
        BoardAction::Delete { id } => {
            let board = ctx.require_member(id).await?;
            if board.owner_id != ctx.user {
                anyhow::bail!("only the owner can delete board {}", id);
            }
            ctx.store.delete_board(id).await?;
            output::output_success(serde_json::json!({"deleted": id.to_string()}));
        }
        BoardAction::AddMember {
            id,
            user_id,
            name,
            role,
        } => {
            let mut board = ctx.require_editor(id).await?;
            board.upsert_member(user_id, name, role.parse::<MemberRole>()?);
            let board = ctx.store.save_board(board).await?;
            output::output_success(&board);
        }
        BoardAction::RemoveMember { id, user_id } => {
            let mut board = ctx.require_editor(id).await?;
            board.remove_member(&user_id)?;
            let board = ctx.store.save_board(board).await?;
            output::output_success(&board);
        }
    }
    Ok(())
}

fn build_board_update(args: &BoardUpdateArgs) -> anyhow::Result<BoardUpdate> {
    let description = match (&args.description, args.clear_description) {
        (_, true) => FieldUpdate::Clear,
        (Some(description), false) => FieldUpdate::Set(description.clone()),
        (None, false) => FieldUpdate::NoChange,
    };
    Ok(BoardUpdate {
        name: args.name.clone(),
        description,
        visibility: args
            .visibility
            .as_deref()
            .map(str::parse::<Visibility>)
            .transpose()?,
        archived: args.archived,
        active_sprint_id: FieldUpdate::NoChange,
    })
}
