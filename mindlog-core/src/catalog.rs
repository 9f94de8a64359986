//! Meditation catalog access with role checks.
//!
//! Anyone may read the catalog; creating, editing and deleting meditation
//! types and meditations requires the admin role.

use crate::db::Database;
use crate::error::Result;
use crate::types::{
    Difficulty, Meditation, MeditationPatch, MeditationType, MeditationTypePatch, User,
};

pub struct CatalogService<'a> {
    db: &'a Database,
}

impl<'a> CatalogService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn types(&self) -> Result<Vec<MeditationType>> {
        self.db.list_meditation_types()
    }

    pub fn meditations(&self) -> Result<Vec<Meditation>> {
        self.db.list_meditations()
    }

    pub fn add_type(
        &self,
        actor: &User,
        name: &str,
        description: Option<&str>,
        duration_range: Option<&str>,
        tags: &[String],
    ) -> Result<MeditationType> {
        actor.require_admin("add meditation types")?;
        self.db.create_meditation_type(name, description, duration_range, tags)
    }

    pub fn edit_type(
        &self,
        actor: &User,
        id: i64,
        patch: &MeditationTypePatch,
    ) -> Result<MeditationType> {
        actor.require_admin("edit meditation types")?;
        self.db.update_meditation_type(id, patch)
    }

    pub fn delete_type(&self, actor: &User, id: i64) -> Result<()> {
        actor.require_admin("delete meditation types")?;
        self.db.delete_meditation_type(id)
    }

    pub fn add_meditation(
        &self,
        actor: &User,
        title: &str,
        duration: i64,
        difficulty: Difficulty,
        type_id: Option<i64>,
    ) -> Result<Meditation> {
        actor.require_admin("add meditations")?;
        self.db.create_meditation(title, duration, difficulty, type_id)
    }

    pub fn edit_meditation(
        &self,
        actor: &User,
        id: i64,
        patch: &MeditationPatch,
    ) -> Result<Meditation> {
        actor.require_admin("edit meditations")?;
        self.db.update_meditation(id, patch)
    }

    pub fn delete_meditation(&self, actor: &User, id: i64) -> Result<()> {
        actor.require_admin("delete meditations")?;
        self.db.delete_meditation(id)
    }
}
