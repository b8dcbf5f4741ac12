//! Feature composer: builds a synthetic probe from catalog feature variants.

use crate::error::ValidationError;
use crate::types::{FeatureCatalog, FeatureCategory, SynthesizedAsset};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// At most one chosen variant id per category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureSelection {
    entries: BTreeMap<FeatureCategory, Option<String>>,
}

impl FeatureSelection {
    /// Empty selection over the standard categories.
    pub fn new() -> Self {
        Self::over(FeatureCategory::STANDARD)
    }

    /// Empty selection over every category the catalog serves.
    pub fn for_catalog(catalog: &FeatureCatalog) -> Self {
        Self::over(catalog.categories().map(|(c, _)| c.clone()))
    }

    fn over(categories: impl IntoIterator<Item = FeatureCategory>) -> Self {
        Self {
            entries: categories.into_iter().map(|c| (c, None)).collect(),
        }
    }

    pub fn set(&mut self, category: FeatureCategory, variant_id: impl Into<String>) {
        self.entries.insert(category, Some(variant_id.into()));
    }

    pub fn get(&self, category: &FeatureCategory) -> Option<&str> {
        self.entries.get(category).and_then(|v| v.as_deref())
    }

    /// Set every entry back to `None`, keeping the categories.
    pub fn clear(&mut self) {
        for entry in self.entries.values_mut() {
            *entry = None;
        }
    }

    /// True when no category has a selected variant.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Option::is_none)
    }

    pub fn selected(&self) -> impl Iterator<Item = (&FeatureCategory, &str)> {
        self.entries
            .iter()
            .filter_map(|(c, v)| v.as_deref().map(|id| (c, id)))
    }
}

impl Default for FeatureSelection {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of a remote face composition call.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeRequest {
    pub features: FeatureSelection,
    pub enhance_gan: bool,
    pub request_embedding: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CatalogStatus {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Arc<FeatureCatalog>),
    /// Load failed; retry by loading again.
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct FeatureComposer {
    catalog: CatalogStatus,
    selection: FeatureSelection,
    preview: Option<SynthesizedAsset>,
}

impl FeatureComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog_status(&self) -> &CatalogStatus {
        &self.catalog
    }

    pub fn catalog(&self) -> Option<&Arc<FeatureCatalog>> {
        match &self.catalog {
            CatalogStatus::Loaded(catalog) => Some(catalog),
            _ => None,
        }
    }

    pub fn selection(&self) -> &FeatureSelection {
        &self.selection
    }

    pub fn preview(&self) -> Option<&SynthesizedAsset> {
        self.preview.as_ref()
    }

    /// Whether a catalog fetch should be issued. A loaded catalog is never
    /// fetched again; a failed one may be retried.
    pub fn needs_catalog(&self) -> bool {
        matches!(self.catalog, CatalogStatus::NotLoaded | CatalogStatus::Unavailable(_))
    }

    pub(crate) fn catalog_loading(&mut self) {
        self.catalog = CatalogStatus::Loading;
    }

    pub(crate) fn catalog_loaded(&mut self, catalog: FeatureCatalog) {
        tracing::info!(categories = catalog.categories().count(), "feature catalog loaded");
        // Picks made before the catalog arrived survive if the catalog knows them.
        let mut selection = FeatureSelection::for_catalog(&catalog);
        for (category, variant_id) in self.selection.selected() {
            if catalog.contains(category, variant_id) {
                selection.set(category.clone(), variant_id);
            } else {
                tracing::debug!(%category, variant_id, "dropping selection unknown to catalog");
            }
        }
        self.selection = selection;
        self.catalog = CatalogStatus::Loaded(Arc::new(catalog));
    }

    pub(crate) fn catalog_failed(&mut self, message: String) {
        tracing::warn!(message = %message, "feature catalog unavailable");
        self.catalog = CatalogStatus::Unavailable(message);
    }

    /// Choose a variant for a category. Re-selecting the same variant is a no-op
    /// on the selection; any composed preview is invalidated either way.
    pub fn select(
        &mut self,
        category: FeatureCategory,
        variant_id: &str,
    ) -> Result<(), ValidationError> {
        if let Some(catalog) = self.catalog() {
            if catalog.variants(&category).is_none() {
                return Err(ValidationError::UnknownCategory(category.to_string()));
            }
            if !catalog.contains(&category, variant_id) {
                return Err(ValidationError::UnknownVariant {
                    category: category.to_string(),
                    variant: variant_id.to_string(),
                });
            }
        }
        self.selection.set(category, variant_id);
        self.preview = None;
        Ok(())
    }

    /// Build the composition request. Fails locally on an empty selection.
    pub fn compose_request(&self, enhance_gan: bool) -> Result<ComposeRequest, ValidationError> {
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(ComposeRequest {
            features: self.selection.clone(),
            enhance_gan,
            request_embedding: true,
        })
    }

    pub(crate) fn set_preview(&mut self, asset: SynthesizedAsset) {
        self.preview = Some(asset);
    }

    /// Clear the selection and drop the composed preview. Local only.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.preview = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureVariant;

    fn catalog() -> FeatureCatalog {
        let mut map = BTreeMap::new();
        map.insert(
            FeatureCategory::FaceShape,
            vec![
                FeatureVariant { id: "oval_1".into(), name: "Oval".into() },
                FeatureVariant { id: "round_1".into(), name: "Round".into() },
            ],
        );
        map.insert(
            FeatureCategory::Eyes,
            vec![FeatureVariant { id: "almond_1".into(), name: "Almond".into() }],
        );
        FeatureCatalog::new(map)
    }

    fn loaded() -> FeatureComposer {
        let mut composer = FeatureComposer::new();
        composer.catalog_loaded(catalog());
        composer
    }

    fn preview() -> SynthesizedAsset {
        SynthesizedAsset { asset_ref: "/media/composed/1.png".into(), embedding: None }
    }

    #[test]
    fn test_empty_selection_rejected() {
        let composer = loaded();
        assert_eq!(composer.compose_request(false), Err(ValidationError::EmptySelection));
        assert_eq!(FeatureComposer::new().compose_request(true), Err(ValidationError::EmptySelection));
    }

    #[test]
    fn test_compose_request_carries_selection_and_flags() {
        let mut composer = loaded();
        composer.select(FeatureCategory::Eyes, "almond_1").unwrap();
        let request = composer.compose_request(true).unwrap();
        assert!(request.enhance_gan);
        assert!(request.request_embedding);
        assert_eq!(request.features.get(&FeatureCategory::Eyes), Some("almond_1"));
        assert_eq!(request.features.get(&FeatureCategory::FaceShape), None);
    }

    #[test]
    fn test_select_is_idempotent_and_invalidates_preview() {
        let mut composer = loaded();
        composer.select(FeatureCategory::FaceShape, "oval_1").unwrap();
        composer.set_preview(preview());

        composer.select(FeatureCategory::FaceShape, "oval_1").unwrap();
        assert!(composer.preview().is_none());
        assert_eq!(composer.selection().selected().count(), 1);

        composer.select(FeatureCategory::FaceShape, "round_1").unwrap();
        assert_eq!(composer.selection().get(&FeatureCategory::FaceShape), Some("round_1"));
    }

    #[test]
    fn test_select_checks_catalog() {
        let mut composer = loaded();
        assert_eq!(
            composer.select(FeatureCategory::Nose, "button_1"),
            Err(ValidationError::UnknownCategory("nose".into()))
        );
        assert!(matches!(
            composer.select(FeatureCategory::Eyes, "oval_1"),
            Err(ValidationError::UnknownVariant { .. })
        ));
        assert!(composer.selection().is_empty());
    }

    #[test]
    fn test_reset_clears_selection_and_preview() {
        let mut composer = loaded();
        composer.select(FeatureCategory::FaceShape, "oval_1").unwrap();
        composer.select(FeatureCategory::Eyes, "almond_1").unwrap();
        composer.set_preview(preview());

        composer.reset();
        assert!(composer.selection().is_empty());
        assert!(composer.preview().is_none());
        // categories are kept, only the choices are cleared
        assert_eq!(composer.selection(), &FeatureSelection::for_catalog(&catalog()));
    }

    #[test]
    fn test_selection_serializes_nulls() {
        let mut selection = FeatureSelection::new();
        selection.set(FeatureCategory::Nose, "button_2");
        let json = serde_json::to_value(&selection).unwrap();
        assert_eq!(json["nose"], "button_2");
        assert!(json["eyes"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_catalog_lifecycle() {
        let mut composer = FeatureComposer::new();
        assert!(composer.needs_catalog());
        composer.catalog_loading();
        assert!(!composer.needs_catalog());
        composer.catalog_failed("Failed to load facial features".into());
        assert!(composer.needs_catalog());
        composer.catalog_loaded(catalog());
        assert!(!composer.needs_catalog());
        assert!(composer.catalog().is_some());
    }

    #[test]
    fn test_early_selection_survives_catalog_load() {
        let mut composer = FeatureComposer::new();
        composer.select(FeatureCategory::Eyes, "almond_1").unwrap();
        composer.select(FeatureCategory::Nose, "hooked_3").unwrap();

        composer.catalog_loaded(catalog());
        let selection = composer.selection();
        assert_eq!(selection.get(&FeatureCategory::Eyes), Some("almond_1"));
        assert_eq!(selection.get(&FeatureCategory::Nose), None);
        assert_eq!(selection.selected().count(), 1);
    }
}
