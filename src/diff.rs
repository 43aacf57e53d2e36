use crate::interface::sink::{Cell, Instruction, Table};

/// A row the view can project into table cells.
pub trait Row {
    const TABLE: Table;

    fn id(&self) -> &str;
    fn cells(&self) -> Vec<Cell>;

    fn add_instruction(&self) -> Instruction {
        Instruction::Add {
            table: Self::TABLE,
            row_id: self.id().to_string(),
            cells: self.cells(),
        }
    }

    fn update_instruction(&self) -> Instruction {
        Instruction::Update {
            table: Self::TABLE,
            row_id: self.id().to_string(),
            cells: self.cells(),
        }
    }
}

/// The outcome of one reconciliation pass. An identity appears in at most one
/// of the three lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff<R> {
    pub added: Vec<R>,
    pub updated: Vec<R>,
    pub removed: Vec<String>,
}

impl<R> Default for Diff<R> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<R: Row> Diff<R> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn added_ids(&self) -> Vec<&str> {
        self.added.iter().map(Row::id).collect()
    }

    pub fn updated_ids(&self) -> Vec<&str> {
        self.updated.iter().map(Row::id).collect()
    }

    /// Adds, then updates, then removes.
    pub fn into_instructions(self) -> Vec<Instruction> {
        let mut instructions =
            Vec::with_capacity(self.added.len() + self.updated.len() + self.removed.len());
        instructions.extend(self.added.iter().map(Row::add_instruction));
        instructions.extend(self.updated.iter().map(Row::update_instruction));
        instructions.extend(self.removed.into_iter().map(|row_id| Instruction::Remove {
            table: R::TABLE,
            row_id,
        }));
        instructions
    }
}
