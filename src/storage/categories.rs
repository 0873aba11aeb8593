use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::Category;
use super::tables::*;

impl Database {
    // ========================================================================
    // Category operations
    // ========================================================================

    pub fn put_category(&self, category: &Category) -> Result<(), DatabaseError> {
        debug_assert!(!category.id.is_empty(), "category id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(CATEGORIES)?;
            let data = rmp_serde::to_vec_named(category)?;
            table.insert(category.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_category(&self, id: &str) -> Result<Option<Category>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CATEGORIES)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Rename a category. Returns false if it does not exist.
    pub fn update_category(
        &self,
        id: &str,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(CATEGORIES)?;
            let existing: Option<Category> = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing {
                Some(mut category) => {
                    category.name = name.to_string();
                    category.updated_at = updated_at;
                    let data = rmp_serde::to_vec_named(&category)?;
                    table.insert(id, data.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }

    pub fn delete_category(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(CATEGORIES)?;
            let removed = table.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// All categories, ordered by name
    pub fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut categories = self.get_all_categories()?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    /// Get all categories (for snapshot/restore)
    pub fn get_all_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CATEGORIES)?;

        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            categories.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(categories)
    }
}
