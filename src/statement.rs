use std::sync::Arc;

use crate::col::Column;

/// A statement prepared on the server, with the result metadata it announced.
///
/// The column metadata is shared by every result set the statement produces
/// and is never modified after preparation. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Statement {
    id: u32,
    num_params: u16,
    columns: Arc<[Column]>,
}

impl Statement {
    pub fn new(id: u32, num_params: u16, columns: impl Into<Arc<[Column]>>) -> Self {
        Self {
            id,
            num_params,
            columns: columns.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn num_params(&self) -> u16 {
        self.num_params
    }

    pub fn columns(&self) -> &Arc<[Column]> {
        &self.columns
    }
}
