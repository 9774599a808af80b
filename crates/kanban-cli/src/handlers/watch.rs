use crate::cli::WatchArgs;
use crate::context::CliContext;
use crate::output;
use kanban_domain::{Card, List};
use kanban_persistence::EntityStore;
use kanban_sync::{BoardSession, PollScheduler};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct BoardView {
    ticket: u64,
    lists: Vec<ListView>,
}

#[derive(Serialize)]
struct ListView {
    id: String,
    name: String,
    order: i32,
    cards: Vec<String>,
}

fn view(session: &BoardSession, ticket: u64) -> BoardView {
    let lists = session
        .lists()
        .into_iter()
        .map(|list| ListView {
            id: list.id.to_string(),
            cards: session
                .cards_in(list.id)
                .into_iter()
                .map(|card| card.name)
                .collect(),
            name: list.name,
            order: list.order,
        })
        .collect();
    BoardView { ticket, lists }
}

/// Print the board once, then again every time a poll changes it.
pub async fn handle(ctx: &CliContext, args: WatchArgs) -> anyhow::Result<()> {
    ctx.require_member(args.board_id).await?;
    let interval = args
        .interval_ms
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.effective_poll_interval());

    let store: Arc<dyn EntityStore> = ctx.store.clone();
    let scheduler = PollScheduler::new(Arc::clone(&store), interval);
    let session = BoardSession::open(store, &scheduler, args.board_id).await?;
    let mut changes = session.changes();
    tracing::info!("Watching board {} every {:?}", args.board_id, interval);

    let mut printed = 0usize;
    let mut last: Option<(Vec<List>, Vec<Card>)> = None;
    loop {
        let ticket = *changes.borrow_and_update();
        let current = Some((session.lists(), board_cards(&session)));
        if current != last {
            output::output_success(view(&session, ticket));
            printed += 1;
            last = current;
            if args.count.is_some_and(|count| printed >= count) {
                break;
            }
        }

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.close();
    Ok(())
}

fn board_cards(session: &BoardSession) -> Vec<Card> {
    session
        .lists()
        .iter()
        .flat_map(|list| session.cards_in(list.id))
        .collect()
}
