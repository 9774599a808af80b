use crate::cli::{CardAction, CardFieldArgs, CardListArgs, CardUpdateArgs, ChecklistAction, CommentAction};
use crate::context::CliContext;
use crate::handlers::{applied, drag_result, parse_datetime};
use crate::output;
use kanban_domain::{
    Assignee, Card, CardPriority, CardStatus, CardType, CardUpdate, ContentEdit, FieldUpdate, Scope,
};
use kanban_persistence::EntityStore;
use kanban_sync::DragEnd;

pub async fn handle(ctx: &mut CliContext, action: CardAction) -> anyhow::Result<()> {
    match action {
        CardAction::Create(args) => {
            let list = ctx.list(args.list_id).await?;
            let fields = build_field_update(&args.fields)?;
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, list.board_id).await?;
            let card = applied(session.add_card(list.id, &args.name, fields).await?)?;
            session.close();
            output::output_success(&card);
        }
        CardAction::List(args) => {
            let scope = list_scope(ctx, &args).await?;
            let cards: Vec<_> = ctx
                .store
                .fetch_ordered(scope)
                .await?
                .into_iter()
                .filter_map(|entity| entity.into_card())
                .collect();
            output::output_list(cards);
        }
        CardAction::Get { id } => {
            let card = ctx.card(id).await?;
            ctx.require_member(card.board_id).await?;
            output::output_success(&card);
        }
        CardAction::Update(args) => {
            let card = ctx.card(args.id).await?;
            let updates = build_card_update(&args)?;
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, card.board_id).await?;
            let card = applied(session.quick_update(card.id, updates).await?)?;
            session.close();
            output::output_success(&card);
        }
        CardAction::Move {
            id,
            list_id,
            position,
        } => {
            let card = ctx.card(id).await?;
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, card.board_id).await?;

            let source_index = session
                .cards_in(card.list_id)
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| anyhow::anyhow!("card {} vanished from its list", id))?;
            let dest_list = list_id.unwrap_or(card.list_id);

            let outcome = session
                .on_drag_end(DragEnd::card(card.list_id, source_index, dest_list, position))
                .await?;
            session.close();
            output::output_success(drag_result(outcome)?);
        }
        CardAction::Delete { id } => {
            let card = ctx.card(id).await?;
            let scheduler = ctx.scheduler();
            let session = ctx.open_for_edit(&scheduler, card.board_id).await?;
            applied(session.delete_card(id).await?)?;
            session.close();
            output::output_success(serde_json::json!({"deleted": id.to_string()}));
        }
        CardAction::Comment { action } => handle_comment(ctx, action).await?,
        CardAction::Checklist { action } => handle_checklist(ctx, action).await?,
    }
    Ok(())
}

async fn handle_comment(ctx: &CliContext, action: CommentAction) -> anyhow::Result<()> {
    match action {
        CommentAction::Add { card_id, text } => {
            let card = ctx.card(card_id).await?;
            let board = ctx.require_member(card.board_id).await?;
            let author_name = board
                .member(&ctx.user)
                .map_or_else(|| ctx.user.clone(), |m| m.name.clone());
            let edit = ContentEdit::add_comment(ctx.user.clone(), author_name, &text)?;
            let comment_id = edit.created_id();
            let card = edit_card_content(ctx, &card, edit).await?;
            let comment = card
                .comments
                .into_iter()
                .find(|c| Some(c.id) == comment_id)
                .ok_or_else(|| anyhow::anyhow!("comment missing from card {} after save", card_id))?;
            output::output_success(&comment);
        }
        CommentAction::Edit { card_id, id, text } => {
            let card = ctx.card(card_id).await?;
            let edit = ContentEdit::edit_comment(id, ctx.user.clone(), &text)?;
            let card = edit_card_content(ctx, &card, edit).await?;
            let comment = card.comments.into_iter().find(|c| c.id == id);
            output::output_success(&comment);
        }
        CommentAction::Delete { card_id, id } => {
            let card = ctx.card(card_id).await?;
            let edit = ContentEdit::DeleteComment {
                comment_id: id,
                author: ctx.user.clone(),
            };
            edit_card_content(ctx, &card, edit).await?;
            output::output_success(serde_json::json!({"deleted": id.to_string()}));
        }
        CommentAction::List { card_id } => {
            let card = ctx.card(card_id).await?;
            ctx.require_member(card.board_id).await?;
            output::output_list(card.comments_newest_first());
        }
    }
    Ok(())
}

async fn handle_checklist(ctx: &CliContext, action: ChecklistAction) -> anyhow::Result<()> {
    let (card_id, edit) = match action {
        ChecklistAction::Add { card_id, title } => (card_id, ContentEdit::add_checklist(&title)?),
        ChecklistAction::AddItem {
            card_id,
            checklist_id,
            text,
        } => (card_id, ContentEdit::add_checklist_item(checklist_id, &text)?),
        ChecklistAction::Toggle {
            card_id,
            checklist_id,
            item_id,
        } => (card_id, ContentEdit::ToggleItem { checklist_id, item_id }),
    };
    let card = ctx.card(card_id).await?;
    let card = edit_card_content(ctx, &card, edit).await?;
    output::output_success(&card.checklists);
    Ok(())
}

async fn edit_card_content(ctx: &CliContext, card: &Card, edit: ContentEdit) -> anyhow::Result<Card> {
    let scheduler = ctx.scheduler();
    let session = ctx.open_for_edit(&scheduler, card.board_id).await?;
    let result = session.edit_content(card.id, edit).await;
    session.close();
    applied(result?)
}

async fn list_scope(ctx: &CliContext, args: &CardListArgs) -> anyhow::Result<Scope> {
    match (args.list_id, args.board_id) {
        (Some(list_id), _) => {
            let list = ctx.list(list_id).await?;
            ctx.require_member(list.board_id).await?;
            Ok(Scope::Cards(list_id))
        }
        (None, Some(board_id)) => {
            ctx.require_member(board_id).await?;
            Ok(Scope::BoardCards(board_id))
        }
        (None, None) => anyhow::bail!("either --list-id or --board-id is required"),
    }
}

fn parse_assignee(s: &str) -> Assignee {
    match s.split_once(':') {
        Some((user_id, name)) => Assignee {
            user_id: user_id.to_string(),
            name: name.to_string(),
        },
        None => Assignee {
            user_id: s.to_string(),
            name: s.to_string(),
        },
    }
}

fn set_or_keep<T>(value: Option<T>) -> FieldUpdate<T> {
    value.map_or(FieldUpdate::NoChange, FieldUpdate::Set)
}

fn build_field_update(fields: &CardFieldArgs) -> anyhow::Result<CardUpdate> {
    Ok(CardUpdate {
        description: fields.description.clone(),
        priority: fields
            .priority
            .as_deref()
            .map(str::parse::<CardPriority>)
            .transpose()?,
        status: fields
            .status
            .as_deref()
            .map(str::parse::<CardStatus>)
            .transpose()?,
        card_type: fields
            .card_type
            .as_deref()
            .map(str::parse::<CardType>)
            .transpose()?,
        due_date: set_or_keep(fields.due_date.as_deref().map(parse_datetime).transpose()?),
        assignee: set_or_keep(fields.assignee.as_deref().map(parse_assignee)),
        story_points: set_or_keep(fields.points),
        tags: fields.tags.clone(),
        ..Default::default()
    })
}

fn build_card_update(args: &CardUpdateArgs) -> anyhow::Result<CardUpdate> {
    let mut updates = build_field_update(&args.fields)?;
    updates.name = args.name.clone();
    if args.clear_due_date {
        updates.due_date = FieldUpdate::Clear;
    }
    if args.clear_points {
        updates.story_points = FieldUpdate::Clear;
    }
    if args.clear_assignee {
        updates.assignee = FieldUpdate::Clear;
    }
    if !updates.is_change() {
        anyhow::bail!("nothing to update for card {}", args.id);
    }
    Ok(updates)
}
