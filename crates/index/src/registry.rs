//! Bijection between caller-supplied document names and dense ids.

use hashbrown::HashMap;

use crate::{DocumentId, IndexError};

/// Maximum number of distinct documents one index can hold.
pub const MAX_DOCUMENTS: usize = DocumentId::MAX as usize + 1;

/// Name ↔ id map. Ids are assigned in insertion order starting at 0, so the
/// id of a new name is always the current size of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRegistry {
    ids: HashMap<String, DocumentId>,
    names: Vec<String>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, registering it first if it is unknown.
    ///
    /// The boolean is `true` when a new id was assigned.
    pub fn resolve_or_register(&mut self, name: &str) -> Result<(DocumentId, bool), IndexError> {
        if let Some(&id) = self.ids.get(name) {
            return Ok((id, false));
        }
        let id = DocumentId::try_from(self.names.len()).map_err(|_| {
            IndexError::TooManyDocuments {
                max: MAX_DOCUMENTS,
            }
        })?;
        self.ids.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        Ok((id, true))
    }

    pub fn id(&self, name: &str) -> Option<DocumentId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: DocumentId) -> Option<&str> {
        self.names.get(usize::from(id)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All `(id, name)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (DocumentId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx as DocumentId, name.as_str()))
    }

    /// Rebuild a registry from stored `(name, id)` pairs.
    ///
    /// The pairs may come in any order but must be a bijection onto
    /// `0..pairs.len()`; anything else would break id assignment for
    /// documents added later.
    pub(crate) fn from_pairs(pairs: Vec<(String, DocumentId)>) -> Result<Self, String> {
        if pairs.len() > MAX_DOCUMENTS {
            return Err(format!("{} identifiers exceed the limit", pairs.len()));
        }
        let mut names: Vec<Option<String>> = vec![None; pairs.len()];
        let mut ids = HashMap::with_capacity(pairs.len());

        for (name, id) in pairs {
            let slot = names
                .get_mut(usize::from(id))
                .ok_or_else(|| format!("identifier {id} for {name:?} is out of range"))?;
            if slot.is_some() {
                return Err(format!("identifier {id} is assigned twice"));
            }
            if ids.insert(name.clone(), id).is_some() {
                return Err(format!("document name {name:?} is listed twice"));
            }
            *slot = Some(name);
        }

        // Pigeonhole: n distinct ids below n fill every slot.
        let names = names.into_iter().flatten().collect();
        Ok(Self { ids, names })
    }
}
