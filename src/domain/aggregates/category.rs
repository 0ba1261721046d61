//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_blocked: bool,
    pub subcategories: Json<Vec<Subcategory>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_blocked: bool,
}

/// Partial update of a subcategory.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SubcategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_blocked: Option<bool>,
}

impl Category {
    pub fn subcategory(&self, id: Uuid) -> Option<&Subcategory> { self.subcategories.iter().find(|s| s.id == id) }

    pub fn add_subcategory(&mut self, name: &str, description: Option<String>) -> Result<&Subcategory, CategoryError> {
        let name = normalize_name(name)?;
        self.ensure_unique(&name, None)?;
        self.subcategories.0.push(Subcategory { id: Uuid::now_v7(), name, description, is_blocked: false });
        self.touch();
        let last = self.subcategories.len() - 1;
        Ok(&self.subcategories[last])
    }

    pub fn update_subcategory(&mut self, id: Uuid, patch: SubcategoryPatch) -> Result<&Subcategory, CategoryError> {
        let pos = self.position(id)?;
        if let Some(name) = patch.name.as_deref() {
            let name = normalize_name(name)?;
            self.ensure_unique(&name, Some(id))?;
            self.subcategories.0[pos].name = name;
        }
        let sub = &mut self.subcategories.0[pos];
        if patch.description.is_some() { sub.description = patch.description; }
        if let Some(blocked) = patch.is_blocked { sub.is_blocked = blocked; }
        self.touch();
        Ok(&self.subcategories[pos])
    }

    pub fn remove_subcategory(&mut self, id: Uuid) -> Result<Subcategory, CategoryError> {
        let pos = self.position(id)?;
        self.touch();
        Ok(self.subcategories.0.remove(pos))
    }

    fn position(&self, id: Uuid) -> Result<usize, CategoryError> {
        self.subcategories.iter().position(|s| s.id == id).ok_or(CategoryError::SubcategoryNotFound(id))
    }

    fn ensure_unique(&self, name: &str, except: Option<Uuid>) -> Result<(), CategoryError> {
        let taken = self.subcategories.iter().any(|s| Some(s.id) != except && s.name.eq_ignore_ascii_case(name));
        if taken { Err(CategoryError::DuplicateSubcategory(name.to_string())) } else { Ok(()) }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

pub fn normalize_name(name: &str) -> Result<String, CategoryError> {
    let name = name.trim();
    if name.is_empty() { return Err(CategoryError::MissingName); }
    Ok(name.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryError { MissingName, DuplicateSubcategory(String), SubcategoryNotFound(Uuid) }
impl std::error::Error for CategoryError {}
impl std::fmt::Display for CategoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Name is required"),
            Self::DuplicateSubcategory(name) => write!(f, "Subcategory '{}' already exists", name),
            Self::SubcategoryNotFound(id) => write!(f, "Subcategory {} not found", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category() -> Category {
        let now = Utc::now();
        Category { id: Uuid::new_v4(), name: "Skincare".into(), description: None, is_blocked: false, subcategories: Json(vec![]), created_at: now, updated_at: now }
    }

    #[test]
    fn test_subcategory_lifecycle() {
        let mut c = category();
        let toner = c.add_subcategory(" Toners ", None).unwrap().id;
        assert_eq!(c.subcategory(toner).unwrap().name, "Toners");
        assert_eq!(c.add_subcategory("TONERS", None).unwrap_err(), CategoryError::DuplicateSubcategory("TONERS".into()));
        let serum = c.add_subcategory("Serums", Some("Face serums".into())).unwrap().id;

        let clash = SubcategoryPatch { name: Some("toners".into()), ..Default::default() };
        assert!(matches!(c.update_subcategory(serum, clash), Err(CategoryError::DuplicateSubcategory(_))));

        let rename = SubcategoryPatch { name: Some("Toners".into()), is_blocked: Some(true), ..Default::default() };
        let updated = c.update_subcategory(toner, rename).unwrap();
        assert!(updated.is_blocked);

        c.remove_subcategory(toner).unwrap();
        assert_eq!(c.remove_subcategory(toner).unwrap_err(), CategoryError::SubcategoryNotFound(toner));
        assert_eq!(c.subcategories.len(), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        assert_eq!(category().add_subcategory("   ", None).unwrap_err(), CategoryError::MissingName);
    }
}
