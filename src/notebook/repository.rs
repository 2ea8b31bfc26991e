//! # Notebook Repository
//!
//! Notebooks of query cells, one document per notebook in the
//! `notebooks` collection. Ownership is enforced here on every access;
//! the collection itself is reachable through the interpreter, but the
//! HTTP surface only exposes it through this repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::interpreter::ResultEnvelope;
use crate::store::DocumentStore;

use super::errors::{NotebookError, NotebookResult};

/// Collection holding notebook records
pub const NOTEBOOKS_COLLECTION: &str = "notebooks";

/// One query cell: the command text plus its last result envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: Uuid,
    pub query: String,
    pub result: Option<ResultEnvelope>,
}

/// A notebook of query cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub cells: Vec<Cell>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notebook CRUD over the store
pub struct NotebookRepository {
    store: Arc<dyn DocumentStore>,
}

impl NotebookRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, owner: Uuid, title: &str) -> NotebookResult<Notebook> {
        let now = Utc::now();
        let notebook = Notebook {
            id: Uuid::new_v4(),
            owner,
            title: title.to_string(),
            cells: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let document = to_document(&notebook)?;
        self.store.insert_one(NOTEBOOKS_COLLECTION, document)?;
        Ok(notebook)
    }

    /// Notebooks owned by this user, oldest first
    pub fn list_for_owner(&self, owner: Uuid) -> NotebookResult<Vec<Notebook>> {
        let documents = self
            .store
            .find(NOTEBOOKS_COLLECTION, &json!({"owner": owner}), None)?;

        documents.into_iter().map(from_document).collect()
    }

    /// Fetch a notebook, enforcing ownership
    pub fn get(&self, id: Uuid, owner: Uuid) -> NotebookResult<Notebook> {
        let document = self
            .store
            .find_one(NOTEBOOKS_COLLECTION, &json!({"id": id}))?
            .ok_or(NotebookError::NotFound)?;

        let notebook = from_document(document)?;
        if notebook.owner != owner {
            return Err(NotebookError::NotOwner);
        }
        Ok(notebook)
    }

    pub fn rename(&self, id: Uuid, owner: Uuid, title: &str) -> NotebookResult<Notebook> {
        let mut notebook = self.get(id, owner)?;
        notebook.title = title.to_string();
        self.save(notebook)
    }

    pub fn delete(&self, id: Uuid, owner: Uuid) -> NotebookResult<()> {
        // Ownership check before the delete touches anything
        self.get(id, owner)?;
        self.store
            .delete_one(NOTEBOOKS_COLLECTION, &json!({"id": id}))?;
        Ok(())
    }

    /// Append an empty-result cell with the given query text
    pub fn add_cell(&self, id: Uuid, owner: Uuid, query: &str) -> NotebookResult<Cell> {
        let mut notebook = self.get(id, owner)?;
        let cell = Cell {
            id: Uuid::new_v4(),
            query: query.to_string(),
            result: None,
        };
        notebook.cells.push(cell.clone());
        self.save(notebook)?;
        Ok(cell)
    }

    /// Replace a cell's query text and clear its stale result
    pub fn update_cell(
        &self,
        id: Uuid,
        owner: Uuid,
        cell_id: Uuid,
        query: &str,
    ) -> NotebookResult<Cell> {
        let mut notebook = self.get(id, owner)?;
        let cell = notebook
            .cells
            .iter_mut()
            .find(|c| c.id == cell_id)
            .ok_or(NotebookError::CellNotFound)?;

        cell.query = query.to_string();
        cell.result = None;
        let cell = cell.clone();
        self.save(notebook)?;
        Ok(cell)
    }

    /// Record the envelope a cell's last execution produced
    pub fn record_result(
        &self,
        id: Uuid,
        owner: Uuid,
        cell_id: Uuid,
        result: ResultEnvelope,
    ) -> NotebookResult<()> {
        let mut notebook = self.get(id, owner)?;
        let cell = notebook
            .cells
            .iter_mut()
            .find(|c| c.id == cell_id)
            .ok_or(NotebookError::CellNotFound)?;

        cell.result = Some(result);
        self.save(notebook)?;
        Ok(())
    }

    pub fn remove_cell(&self, id: Uuid, owner: Uuid, cell_id: Uuid) -> NotebookResult<()> {
        let mut notebook = self.get(id, owner)?;
        let before = notebook.cells.len();
        notebook.cells.retain(|c| c.id != cell_id);
        if notebook.cells.len() == before {
            return Err(NotebookError::CellNotFound);
        }
        self.save(notebook)?;
        Ok(())
    }

    fn save(&self, mut notebook: Notebook) -> NotebookResult<Notebook> {
        notebook.updated_at = Utc::now();
        let document = to_document(&notebook)?;
        self.store.update_one(
            NOTEBOOKS_COLLECTION,
            &json!({"id": notebook.id}),
            &document,
        )?;
        Ok(notebook)
    }
}

fn to_document(notebook: &Notebook) -> NotebookResult<serde_json::Value> {
    serde_json::to_value(notebook).map_err(|err| NotebookError::Store(err.to_string()))
}

fn from_document(document: serde_json::Value) -> NotebookResult<Notebook> {
    serde_json::from_value(document).map_err(|err| NotebookError::Store(err.to_string()))
}
