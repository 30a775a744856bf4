//! Table registry.
//!
//! The catalog holds the definition of every table and the writer slot that
//! keeps each table to a single writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{StorageError, StorageResult};
use super::table::TableDefinition;
use super::writer::WriterSlot;

#[derive(Debug)]
struct CatalogEntry {
    definition: Arc<TableDefinition>,
    /// Set while a writer is open on the table.
    writer_busy: Arc<AtomicBool>,
}

/// Table catalog.
#[derive(Debug)]
pub(crate) struct Catalog {
    tables: RwLock<HashMap<String, CatalogEntry>>,
    next_table_id: RwLock<u64>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub(crate) fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_table_id: RwLock::new(1),
        }
    }

    /// Validates and registers a table, assigning its ID.
    pub(crate) fn create_table(
        &self,
        definition: TableDefinition,
    ) -> StorageResult<Arc<TableDefinition>> {
        definition.validate()?;
        let mut tables = self.tables.write();
        if tables.contains_key(definition.name()) {
            return Err(StorageError::TableExists(definition.name().to_string()));
        }

        let mut next_id = self.next_table_id.write();
        let definition = Arc::new(definition.with_table_id(*next_id));
        *next_id += 1;

        tables.insert(
            definition.name().to_string(),
            CatalogEntry {
                definition: Arc::clone(&definition),
                writer_busy: Arc::new(AtomicBool::new(false)),
            },
        );
        Ok(definition)
    }

    /// Unregisters a table. Fails while a writer is open on it.
    pub(crate) fn drop_table(&self, name: &str) -> StorageResult<Arc<TableDefinition>> {
        let mut tables = self.tables.write();
        let entry = tables
            .get(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        if entry.writer_busy.load(Ordering::Acquire) {
            return Err(StorageError::WriterBusy(name.to_string()));
        }
        tables
            .remove(name)
            .map(|entry| entry.definition)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    /// Looks up a table.
    pub(crate) fn get(&self, name: &str) -> StorageResult<Arc<TableDefinition>> {
        self.tables
            .read()
            .get(name)
            .map(|entry| Arc::clone(&entry.definition))
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    /// Takes the writer slot of a table.
    pub(crate) fn acquire_writer(
        &self,
        name: &str,
    ) -> StorageResult<(Arc<TableDefinition>, WriterSlot)> {
        let tables = self.tables.read();
        let entry = tables
            .get(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        let slot = WriterSlot::acquire(&entry.writer_busy)
            .ok_or_else(|| StorageError::WriterBusy(name.to_string()))?;
        Ok((Arc::clone(&entry.definition), slot))
    }

    /// Lists table names in order.
    pub(crate) fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
