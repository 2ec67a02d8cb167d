//! In-memory `papers` metadata table (spec.md §3, §6).
//!
//! [`citegraph_index::Store`] only persists chunk/vector data; paper
//! metadata (title, authors, year, processing status) lives here, in a
//! `DashMap` keyed by [`PaperId`] — the same "shared, lock-free map" shape
//! the teacher's server crate uses for its rate limiter
//! (`crates/server/src/state.rs`), just keyed differently. Durability of
//! this table is out of scope for the distilled spec (spec.md §1 Non-goals
//! exclude a metadata database); a restart replays nothing here, only the
//! `redb`-backed chunks.

use citegraph_core::types::{Paper, PaperId, UserId};
use citegraph_pipeline::context::{PaperProvider, PaperSummary};
use dashmap::DashMap;
use std::collections::HashMap;

#[derive(Default)]
pub struct PapersTable {
    papers: DashMap<PaperId, Paper>,
}

impl PapersTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, paper: Paper) {
        self.papers.insert(paper.id, paper);
    }

    pub fn get(&self, id: PaperId) -> Option<Paper> {
        self.papers.get(&id).map(|entry| entry.clone())
    }

    pub fn remove(&self, id: PaperId) -> Option<Paper> {
        self.papers.remove(&id).map(|(_, paper)| paper)
    }

    /// Papers owned by `owner_id`, most recent first — used by the listing
    /// endpoint.
    pub fn list_for_owner(&self, owner_id: UserId) -> Vec<Paper> {
        let mut papers: Vec<Paper> = self
            .papers
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.clone())
            .collect();
        papers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        papers
    }
}

#[async_trait::async_trait]
impl PaperProvider for PapersTable {
    async fn get_many(&self, paper_ids: &[PaperId]) -> HashMap<PaperId, PaperSummary> {
        paper_ids
            .iter()
            .filter_map(|id| {
                let paper = self.papers.get(id)?;
                Some((
                    *id,
                    PaperSummary {
                        id: paper.id,
                        title: paper.title.clone(),
                        authors: paper.authors.clone(),
                        year: paper.year,
                        citation_count: paper.citation_count,
                    },
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_many_returns_only_known_ids() {
        let table = PapersTable::new();
        let paper = Paper::new(UserId(uuid::Uuid::new_v4()), "Attention Is All You Need");
        let id = paper.id;
        table.insert(paper);

        let summaries = table.get_many(&[id, PaperId::new()]).await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[&id].title, "Attention Is All You Need");
    }

    #[test]
    fn list_for_owner_filters_and_sorts_newest_first() {
        let table = PapersTable::new();
        let owner = UserId(uuid::Uuid::new_v4());
        let other = UserId(uuid::Uuid::new_v4());
        table.insert(Paper::new(owner, "first"));
        std::thread::sleep(std::time::Duration::from_millis(2));
        table.insert(Paper::new(owner, "second"));
        table.insert(Paper::new(other, "not mine"));

        let listed = table.list_for_owner(owner);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "second");
    }
}
