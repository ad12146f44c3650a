//! Work items: photos queued for upload, each with its own value snapshot

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fieldcap_composite::Rotation;

use crate::types::{FieldValues, FormError, Result};

/// A photo on disk and how it is turned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub source: PathBuf,
    pub rotation: Rotation,
}

impl ImageAsset {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            rotation: Rotation::None,
        }
    }
}

/// One photo plus the field values recorded for it.
///
/// The snapshot is shared read-only and only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub asset: ImageAsset,
    snapshot: Arc<FieldValues>,
}

impl WorkItem {
    pub fn new(asset: ImageAsset, snapshot: FieldValues) -> Self {
        Self {
            asset,
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn source(&self) -> &Path {
        &self.asset.source
    }

    pub fn rotation(&self) -> Rotation {
        self.asset.rotation
    }

    pub fn snapshot(&self) -> &FieldValues {
        &self.snapshot
    }
}

/// Ordered work items with an optional selection
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    items: Vec<WorkItem>,
    selected: Option<usize>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkItem> {
        self.items.get(index)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&WorkItem> {
        self.selected.and_then(|i| self.items.get(i))
    }

    /// Append photos, each starting unrotated with a copy of `snapshot`.
    ///
    /// The first newly added photo becomes the selection. Returns how many
    /// photos were added.
    pub fn add_images<I, P>(&mut self, sources: I, snapshot: &FieldValues) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let first_new = self.items.len();
        let snapshot = Arc::new(snapshot.clone());
        self.items.extend(sources.into_iter().map(|source| WorkItem {
            asset: ImageAsset::new(source),
            snapshot: Arc::clone(&snapshot),
        }));

        let added = self.items.len() - first_new;
        if added > 0 {
            self.selected = Some(first_new);
        }
        added
    }

    /// Select an item and return its snapshot for loading into the editor
    pub fn select(&mut self, index: usize) -> Result<&FieldValues> {
        let item = self.items.get(index).ok_or(FormError::NoSuchItem(index))?;
        self.selected = Some(index);
        Ok(&item.snapshot)
    }

    /// Replace the selected item's snapshot
    pub fn save_selected(&mut self, values: &FieldValues) -> Result<()> {
        let item = self.selected_mut()?;
        item.snapshot = Arc::new(values.clone());
        Ok(())
    }

    /// Turn the selected photo a further 90 degrees clockwise
    pub fn rotate_selected(&mut self) -> Result<Rotation> {
        let item = self.selected_mut()?;
        item.asset.rotation = item.asset.rotation.rotated_cw();
        Ok(item.asset.rotation)
    }

    /// Remove an item.
    ///
    /// Removing the selected item selects the first remaining one; removing
    /// an item before the selection keeps the same item selected.
    pub fn remove(&mut self, index: usize) -> Result<WorkItem> {
        if index >= self.items.len() {
            return Err(FormError::NoSuchItem(index));
        }
        let removed = self.items.remove(index);

        self.selected = match self.selected {
            Some(s) if s == index => (!self.items.is_empty()).then_some(0),
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
    }

    fn selected_mut(&mut self) -> Result<&mut WorkItem> {
        let index = self.selected.ok_or(FormError::NoSelection)?;
        self.items.get_mut(index).ok_or(FormError::NoSuchItem(index))
    }
}
