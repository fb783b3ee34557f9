use serde::Serialize;

/// Display metadata of a model category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub name: Option<String>,
}

/// A model offered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    /// Identifier sent in generation requests
    pub id: String,
    /// Raw name as reported by the backend. Entries without a name fall back
    /// to their id.
    pub name: String,
    pub tags: Vec<String>,
}

impl ModelEntry {
    pub fn new(id: impl Into<String>, name: Option<String>, tags: Vec<String>) -> Self {
        let id = id.into();
        let name = name.unwrap_or_else(|| id.clone());
        Self { id, name, tags }
    }

    /// Human label derived from the name (see [`display_name`])
    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }

    /// Tooltip text listing the tags, if any
    pub fn tooltip(&self) -> Option<String> {
        if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.join(", "))
        }
    }
}

/// One category of the catalog, in response order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCategory {
    pub key: String,
    pub info: CategoryInfo,
    pub models: Vec<ModelEntry>,
}

impl ModelCategory {
    /// `info.name`, or the key with separators turned into spaces
    pub fn label(&self) -> String {
        match &self.info.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.key.replace(['-', '_'], " "),
        }
    }
}

/// Normalized model catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelCatalog {
    categories: Vec<ModelCategory>,
    total_models: usize,
}

impl ModelCatalog {
    /// Build a catalog. A missing or zero `reported_total` falls back to the
    /// number of entries across all categories.
    pub fn new(categories: Vec<ModelCategory>, reported_total: Option<usize>) -> Self {
        let counted = categories.iter().map(|c| c.models.len()).sum();
        let total_models = reported_total.filter(|n| *n > 0).unwrap_or(counted);
        Self {
            categories,
            total_models,
        }
    }

    pub fn categories(&self) -> &[ModelCategory] {
        &self.categories
    }

    pub fn total_models(&self) -> usize {
        self.total_models
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelEntry> {
        self.categories.iter().flat_map(|c| c.models.iter())
    }

    pub fn find(&self, id: &str) -> Option<&ModelEntry> {
        self.models().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }
}

const MODEL_PREFIXES: [&str; 2] = ["goblin-", "goblin_"];

/// Turn a model name into a display label.
///
/// Strips a leading `goblin-`/`goblin_` (any case), turns `-` and `_` into
/// spaces and upper-cases the first letter of every word. Different names may
/// map to the same label.
pub fn display_name(name: &str) -> String {
    let stripped = MODEL_PREFIXES
        .iter()
        .find_map(|prefix| {
            name.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &name[prefix.len()..])
        })
        .unwrap_or(name);

    stripped
        .replace(['-', '_'], " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
