//! Categories and tags products are filed under.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::slugify;
use crate::CatalogError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: Uuid,
    name: String,
    slug: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parent: Option<Uuid>,
}

impl Category {
    pub fn new(name: impl Into<String>, parent: Option<Uuid>) -> crate::Result<Self> {
        let (name, slug) = named("category", name.into())?;
        Ok(Self { id: Uuid::new_v4(), name, slug, description: None, parent })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn slug(&self) -> &str { &self.slug }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn parent(&self) -> Option<Uuid> { self.parent }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: Uuid,
    name: String,
    slug: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let (name, slug) = named("tag", name.into())?;
        Ok(Self { id: Uuid::new_v4(), name, slug })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn slug(&self) -> &str { &self.slug }
}

fn named(unit: &str, name: String) -> crate::Result<(String, String)> {
    let name = name.trim().to_string();
    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(CatalogError::invalid(unit, "name must contain a letter or digit"));
    }
    Ok((name, slug))
}
