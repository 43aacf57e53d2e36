use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::util::labels;

use super::sink::{Cell, ConnectionStatus, Table, ViewSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: String,
    pub cells: Vec<Cell>,
    /// The text each cell showed at the last render.
    pub labels: Vec<String>,
}

impl RenderedRow {
    fn new(id: &str, cells: Vec<Cell>, now: DateTime<Utc>) -> Self {
        let mut row = Self {
            id: id.to_string(),
            cells,
            labels: Vec::new(),
        };
        row.render(now);
        row
    }

    fn render(&mut self, now: DateTime<Utc>) {
        self.labels = self.cells.iter().map(|cell| labels::render(cell, now)).collect();
    }
}

#[derive(Debug, Default)]
struct Tables {
    policies: Vec<RenderedRow>,
    leases: Vec<RenderedRow>,
    connection: ConnectionStatus,
    rendered_at: Option<DateTime<Utc>>,
}

impl Tables {
    fn table_mut(&mut self, table: Table) -> &mut Vec<RenderedRow> {
        match table {
            Table::Policies => &mut self.policies,
            Table::Leases => &mut self.leases,
        }
    }

    fn table(&self, table: Table) -> &Vec<RenderedRow> {
        match table {
            Table::Policies => &self.policies,
            Table::Leases => &self.leases,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.rendered_at.unwrap_or_else(Utc::now)
    }
}

/// An in-memory sink that mirrors instructions in arrival order, the way a
/// table widget appends rows.
#[derive(Debug, Default)]
pub struct RenderedTable {
    tables: RwLock<Tables>,
}

impl RenderedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self, table: Table) -> Vec<RenderedRow> {
        self.tables.read().await.table(table).clone()
    }

    pub async fn row_ids(&self, table: Table) -> Vec<String> {
        self.tables
            .read()
            .await
            .table(table)
            .iter()
            .map(|row| row.id.clone())
            .collect()
    }

    pub async fn row(&self, table: Table, id: &str) -> Option<RenderedRow> {
        self.tables
            .read()
            .await
            .table(table)
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }

    pub async fn connection(&self) -> ConnectionStatus {
        self.tables.read().await.connection.clone()
    }
}

#[async_trait]
impl ViewSink for RenderedTable {
    async fn add(&self, table: Table, row_id: &str, cells: Vec<Cell>) {
        let mut tables = self.tables.write().await;
        let now = tables.now();
        let rows = tables.table_mut(table);
        let row = RenderedRow::new(row_id, cells, now);
        match rows.iter_mut().find(|existing| existing.id == row_id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    async fn update(&self, table: Table, row_id: &str, cells: Vec<Cell>) {
        let mut tables = self.tables.write().await;
        let now = tables.now();
        if let Some(row) = tables
            .table_mut(table)
            .iter_mut()
            .find(|row| row.id == row_id)
        {
            row.cells = cells;
            row.render(now);
        }
    }

    async fn remove(&self, table: Table, row_id: &str) {
        self.tables
            .write()
            .await
            .table_mut(table)
            .retain(|row| row.id != row_id);
    }

    async fn refresh_relative_labels(&self, now: DateTime<Utc>) {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        tables.rendered_at = Some(now);
        for row in tables.policies.iter_mut().chain(tables.leases.iter_mut()) {
            row.render(now);
        }
    }

    async fn connection_changed(&self, status: &ConnectionStatus) {
        self.tables.write().await.connection = status.clone();
    }
}
