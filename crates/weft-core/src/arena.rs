// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::chore::Chore;
use crate::ident::ChoreId;

#[derive(Debug)]
struct Entry {
    generation: u32,
    chore: Option<Chore>,
}

/// Generation-checked slab owning every live chore.
///
/// Queue, parked set, running set, dependents and owner mirrors hold only
/// [`ChoreId`]s; the arena is the single owner of chore records.
#[derive(Debug, Default)]
pub(crate) struct ChoreArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
}

impl ChoreArena {
    pub(crate) fn insert(&mut self, chore: Chore) -> ChoreId {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.chore = Some(chore);
            return ChoreId { index, generation: entry.generation };
        }
        let index = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        self.entries.push(Entry { generation: 0, chore: Some(chore) });
        ChoreId { index, generation: 0 }
    }

    pub(crate) fn get(&self, id: ChoreId) -> Option<&Chore> {
        self.entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.chore.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: ChoreId) -> Option<&mut Chore> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.chore.as_mut())
    }

    /// Releases the slot; stale ids no longer resolve afterwards.
    pub(crate) fn remove(&mut self, id: ChoreId) -> Option<Chore> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        let chore = entry.chore.take()?;
        self.free.push(id.index);
        Some(chore)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }
}
