use serde::Serialize;

use super::ModelCatalog;

pub const FAILED_TO_CONNECT: &str = "Failed to connect.";

/// One selectable model in the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelItem {
    pub id: String,
    pub label: String,
    pub tooltip: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub label: String,
    pub models: Vec<ModelItem>,
}

/// Render data for the model picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModelListView {
    Loaded {
        groups: Vec<CategoryGroup>,
        count_text: String,
    },
    Failed {
        placeholder: String,
    },
}

impl ModelListView {
    /// Groups in catalog order, empty categories left out
    pub fn from_catalog(catalog: &ModelCatalog, selected: &str) -> Self {
        let groups = catalog
            .categories()
            .iter()
            .filter(|category| !category.models.is_empty())
            .map(|category| CategoryGroup {
                label: category.label(),
                models: category
                    .models
                    .iter()
                    .map(|entry| ModelItem {
                        id: entry.id.clone(),
                        label: entry.display_name(),
                        tooltip: entry.tooltip(),
                        active: entry.id == selected,
                    })
                    .collect(),
            })
            .collect();

        ModelListView::Loaded {
            groups,
            count_text: format!("{} available", catalog.total_models()),
        }
    }

    pub fn failed() -> Self {
        ModelListView::Failed {
            placeholder: FAILED_TO_CONNECT.to_string(),
        }
    }

    /// Plain-text rendering used by the shell
    pub fn render_text(&self) -> String {
        match self {
            ModelListView::Failed { placeholder } => placeholder.clone(),
            ModelListView::Loaded { groups, count_text } => {
                let mut out = format!("Models ({})\n", count_text);
                for group in groups {
                    out.push_str(&format!("  {}\n", group.label));
                    for item in &group.models {
                        let marker = if item.active { '*' } else { ' ' };
                        out.push_str(&format!("   {} {} [{}]", marker, item.label, item.id));
                        if let Some(tooltip) = &item.tooltip {
                            out.push_str(&format!("  ({})", tooltip));
                        }
                        out.push('\n');
                    }
                }
                out
            }
        }
    }
}
