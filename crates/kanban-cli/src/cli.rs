use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kanban")]
#[command(about = "Kanban and Scrum boards with optimistic edits and live polling", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to kanban data file (or set KANBAN_FILE env var)
    #[arg(long, short, value_name = "FILE", env = "KANBAN_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Acting user id, recorded as creator and board owner
    #[arg(long, env = "KANBAN_USER", default_value = "local", global = true)]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Board operations
    Board(BoardCommand),
    /// List operations
    List(ListCommand),
    /// Card operations
    Card(CardCommand),
    /// Sprint operations
    Sprint(SprintCommand),
    /// Stream board changes as JSON lines
    Watch(WatchArgs),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// Board commands
#[derive(Args)]
pub struct BoardCommand {
    #[command(subcommand)]
    pub action: BoardAction,
}

#[derive(Subcommand)]
pub enum BoardAction {
    /// Create a new board owned by the acting user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// private, public or team
        #[arg(long)]
        visibility: Option<String>,
    },
    /// List boards the acting user belongs to
    List,
    /// Get a specific board
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Update a board
    Update(BoardUpdateArgs),
    /// Delete a board and everything on it
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Add a member or change their role
    AddMember {
        #[arg(long)]
        id: Uuid,
        #[arg(long = "member")]
        user_id: String,
        #[arg(long)]
        name: String,
        /// admin, editor or viewer
        #[arg(long, default_value = "editor")]
        role: String,
    },
    /// Remove a member
    RemoveMember {
        #[arg(long)]
        id: Uuid,
        #[arg(long = "member")]
        user_id: String,
    },
}

#[derive(Args)]
pub struct BoardUpdateArgs {
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[arg(long)]
    pub visibility: Option<String>,
    #[arg(long)]
    pub archived: Option<bool>,
}

// List commands
#[derive(Args)]
pub struct ListCommand {
    #[command(subcommand)]
    pub action: ListAction,
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Append a list to a board
    Create {
        #[arg(long)]
        board_id: Uuid,
        #[arg(long)]
        name: String,
    },
    /// Lists of a board, in order
    List {
        #[arg(long)]
        board_id: Uuid,
    },
    /// Move a list to a new position on its board
    Move {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        position: usize,
    },
    /// Rename a list, set its WIP limit or archive it
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_wip_limit")]
        wip_limit: Option<u32>,
        #[arg(long)]
        clear_wip_limit: bool,
        #[arg(long)]
        archived: Option<bool>,
    },
    /// Delete a list and its cards
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

// Card commands
#[derive(Args)]
pub struct CardCommand {
    #[command(subcommand)]
    pub action: CardAction,
}

#[derive(Subcommand)]
pub enum CardAction {
    /// Append a card to a list
    Create(CardCreateArgs),
    /// Cards of a list, or of a whole board
    List(CardListArgs),
    /// Get a specific card
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Edit card fields in place
    Update(CardUpdateArgs),
    /// Move a card within its list or to another list
    Move {
        #[arg(long)]
        id: Uuid,
        /// Destination list, defaults to the card's current list
        #[arg(long)]
        list_id: Option<Uuid>,
        /// Destination index; past the end appends
        #[arg(long)]
        position: usize,
    },
    /// Delete a card
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Card comments
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
    /// Card checklists
    Checklist {
        #[command(subcommand)]
        action: ChecklistAction,
    },
}

#[derive(Subcommand)]
pub enum CommentAction {
    /// Comment on a card as the acting user
    Add {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        text: String,
    },
    /// Edit one of your own comments
    Edit {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        text: String,
    },
    /// Delete one of your own comments
    Delete {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        id: Uuid,
    },
    /// Comments of a card, newest first
    List {
        #[arg(long)]
        card_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum ChecklistAction {
    /// Add an empty checklist to a card
    Add {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Append an item to a checklist
    AddItem {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        checklist_id: Uuid,
        #[arg(long)]
        text: String,
    },
    /// Flip an item between done and pending
    Toggle {
        #[arg(long)]
        card_id: Uuid,
        #[arg(long)]
        checklist_id: Uuid,
        #[arg(long)]
        item_id: Uuid,
    },
}

#[derive(Args)]
pub struct CardFieldArgs {
    #[arg(long)]
    pub description: Option<String>,
    /// low, medium, high or urgent
    #[arg(long)]
    pub priority: Option<String>,
    /// open, in-progress, in-review, blocked or done
    #[arg(long)]
    pub status: Option<String>,
    /// feature, bug, improvement, docs, test or refactor
    #[arg(long = "type")]
    pub card_type: Option<String>,
    #[arg(long)]
    pub points: Option<u32>,
    #[arg(long)]
    pub due_date: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,
    /// Assignee as USER_ID or USER_ID:NAME
    #[arg(long)]
    pub assignee: Option<String>,
}

#[derive(Args)]
pub struct CardCreateArgs {
    #[arg(long)]
    pub list_id: Uuid,
    #[arg(long)]
    pub name: String,
    #[command(flatten)]
    pub fields: CardFieldArgs,
}

#[derive(Args)]
pub struct CardListArgs {
    #[arg(long, required_unless_present = "board_id")]
    pub list_id: Option<Uuid>,
    #[arg(long)]
    pub board_id: Option<Uuid>,
}

#[derive(Args)]
pub struct CardUpdateArgs {
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub name: Option<String>,
    #[command(flatten)]
    pub fields: CardFieldArgs,
    #[arg(long)]
    pub clear_due_date: bool,
    #[arg(long)]
    pub clear_points: bool,
    #[arg(long)]
    pub clear_assignee: bool,
}

// Sprint commands
#[derive(Args)]
pub struct SprintCommand {
    #[command(subcommand)]
    pub action: SprintAction,
}

#[derive(Subcommand)]
pub enum SprintAction {
    /// Create a new sprint
    Create {
        #[arg(long)]
        board_id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        goal: Option<String>,
        /// Start date, defaults to now
        #[arg(long)]
        start: Option<String>,
        #[arg(long, default_value_t = 14)]
        duration_days: i64,
    },
    /// Sprints of a board, most recent first
    List {
        #[arg(long)]
        board_id: Uuid,
    },
    /// Get a specific sprint
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Add a card to a sprint
    AddCard {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        card_id: Uuid,
    },
    /// Remove a card from a sprint
    RemoveCard {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        card_id: Uuid,
    },
    /// Recompute story point totals from member cards
    Metrics {
        #[arg(long)]
        id: Uuid,
    },
    /// Record a daily standup note
    Note {
        #[arg(long)]
        id: Uuid,
        #[arg(long = "note")]
        notes: Vec<String>,
        #[arg(long = "impediment")]
        impediments: Vec<String>,
        #[arg(long = "participant")]
        participants: Vec<String>,
    },
    /// Replace the sprint retrospective
    Retro {
        #[arg(long)]
        id: Uuid,
        #[arg(long = "positive")]
        positives: Vec<String>,
        #[arg(long = "negative")]
        negatives: Vec<String>,
        #[arg(long = "action")]
        action_items: Vec<String>,
        #[arg(long = "participant")]
        participants: Vec<String>,
    },
    /// Activate a sprint
    Activate {
        #[arg(long)]
        id: Uuid,
    },
    /// Complete a sprint
    Complete {
        #[arg(long)]
        id: Uuid,
    },
    /// Cancel a sprint
    Cancel {
        #[arg(long)]
        id: Uuid,
    },
    /// Delete a sprint
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args)]
pub struct WatchArgs {
    #[arg(long)]
    pub board_id: Uuid,
    /// Poll interval in milliseconds, overriding the config file
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Exit after this many updates
    #[arg(long)]
    pub count: Option<usize>,
}
