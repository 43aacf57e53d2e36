use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Policies,
    Leases,
}

/// One column value handed to the rendering collaborator.
///
/// Relative-time cells carry the absolute instant so the label can be
/// recomputed on every refresh without consulting the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    /// Elapsed time since the instant.
    Since(Option<DateTime<Utc>>),
    /// Remaining time until the instant.
    Until(Option<DateTime<Utc>>),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Interrupted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Add {
        table: Table,
        row_id: String,
        cells: Vec<Cell>,
    },
    Update {
        table: Table,
        row_id: String,
        cells: Vec<Cell>,
    },
    Remove {
        table: Table,
        row_id: String,
    },
    RefreshRelativeLabels(DateTime<Utc>),
    Connection(ConnectionStatus),
}

impl Instruction {
    pub fn row_id(&self) -> Option<&str> {
        match self {
            Instruction::Add { row_id, .. }
            | Instruction::Update { row_id, .. }
            | Instruction::Remove { row_id, .. } => Some(row_id),
            _ => None,
        }
    }
}

/// The rendering side of the view. Implementations mirror what they are told
/// and hold no authoritative state.
#[async_trait]
pub trait ViewSink: Send + Sync {
    async fn add(&self, table: Table, row_id: &str, cells: Vec<Cell>);
    async fn update(&self, table: Table, row_id: &str, cells: Vec<Cell>);
    async fn remove(&self, table: Table, row_id: &str);
    async fn refresh_relative_labels(&self, now: DateTime<Utc>);
    async fn connection_changed(&self, status: &ConnectionStatus);

    async fn apply(&self, instruction: Instruction) {
        match instruction {
            Instruction::Add {
                table,
                row_id,
                cells,
            } => self.add(table, &row_id, cells).await,
            Instruction::Update {
                table,
                row_id,
                cells,
            } => self.update(table, &row_id, cells).await,
            Instruction::Remove { table, row_id } => self.remove(table, &row_id).await,
            Instruction::RefreshRelativeLabels(now) => self.refresh_relative_labels(now).await,
            Instruction::Connection(status) => self.connection_changed(&status).await,
        }
    }
}
