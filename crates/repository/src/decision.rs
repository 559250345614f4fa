//! Append-only decision journal.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{DecisionId, LotId};
use domain::{AllocationDecision, DecisionTarget};
use tokio::sync::RwLock;

use crate::{RepositoryError, Result};

/// Journal of allocation decisions. Decisions are never edited or removed.
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    /// Appends a batch atomically.
    ///
    /// Fails with `AlreadyExists` if any reversal in the batch targets a
    /// decision that has already been reversed; nothing is written then.
    async fn append(&self, decisions: Vec<AllocationDecision>) -> Result<()>;

    /// Loads one decision.
    async fn get(&self, id: &DecisionId) -> Result<Option<AllocationDecision>>;

    /// All decisions for a lot, in the order they were appended.
    async fn for_lot(&self, lot: &LotId) -> Result<Vec<AllocationDecision>>;

    /// The reversal recorded against a decision, if any.
    async fn reversal_of(&self, id: &DecisionId) -> Result<Option<AllocationDecision>>;

    /// Every decision, in append order.
    async fn all(&self) -> Result<Vec<AllocationDecision>>;
}

#[derive(Debug, Default)]
struct Journal {
    entries: Vec<AllocationDecision>,
    by_id: HashMap<DecisionId, usize>,
    reversals: HashMap<DecisionId, usize>,
}

/// In-memory decision journal.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDecisionRepository {
    journal: Arc<RwLock<Journal>>,
}

impl InMemoryDecisionRepository {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }
}

fn reversed_id(decision: &AllocationDecision) -> Option<DecisionId> {
    match decision.target {
        DecisionTarget::Reversal { of } => Some(of),
        _ => None,
    }
}

#[async_trait]
impl DecisionRepository for InMemoryDecisionRepository {
    async fn append(&self, decisions: Vec<AllocationDecision>) -> Result<()> {
        let mut journal = self.journal.write().await;

        let mut batch_targets = Vec::new();
        for decision in &decisions {
            if journal.by_id.contains_key(&decision.id) {
                return Err(RepositoryError::AlreadyExists {
                    entity: "decision",
                    id: decision.id.to_string(),
                });
            }
            if let Some(of) = reversed_id(decision) {
                if journal.reversals.contains_key(&of) || batch_targets.contains(&of) {
                    return Err(RepositoryError::AlreadyExists {
                        entity: "reversal",
                        id: of.to_string(),
                    });
                }
                batch_targets.push(of);
            }
        }

        for decision in decisions {
            let index = journal.entries.len();
            journal.by_id.insert(decision.id, index);
            if let Some(of) = reversed_id(&decision) {
                journal.reversals.insert(of, index);
            }
            journal.entries.push(decision);
        }
        Ok(())
    }

    async fn get(&self, id: &DecisionId) -> Result<Option<AllocationDecision>> {
        let journal = self.journal.read().await;
        Ok(journal.by_id.get(id).map(|&i| journal.entries[i].clone()))
    }

    async fn for_lot(&self, lot: &LotId) -> Result<Vec<AllocationDecision>> {
        let journal = self.journal.read().await;
        Ok(journal
            .entries
            .iter()
            .filter(|d| &d.lot == lot)
            .cloned()
            .collect())
    }

    async fn reversal_of(&self, id: &DecisionId) -> Result<Option<AllocationDecision>> {
        let journal = self.journal.read().await;
        Ok(journal
            .reversals
            .get(id)
            .map(|&i| journal.entries[i].clone()))
    }

    async fn all(&self) -> Result<Vec<AllocationDecision>> {
        Ok(self.journal.read().await.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{LocationCode, SkuCode};

    fn storage(lot: &str, qty: u32) -> AllocationDecision {
        AllocationDecision::storage(
            &LotId::new(lot),
            &SkuCode::new("SKU-1"),
            LocationCode::new("STORAGE-MAIN"),
            qty,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_for_lot_filters_and_orders() {
        let repo = InMemoryDecisionRepository::new();
        let a = storage("LOT-1", 4);
        let b = storage("LOT-2", 5);
        let c = storage("LOT-1", 6);
        repo.append(vec![a.clone(), b, c.clone()]).await.unwrap();

        let lot = repo.for_lot(&LotId::new("LOT-1")).await.unwrap();
        assert_eq!(lot, vec![a, c]);
    }

    #[tokio::test]
    async fn test_single_reversal() {
        let repo = InMemoryDecisionRepository::new();
        let original = storage("LOT-1", 4);
        repo.append(vec![original.clone()]).await.unwrap();

        let reversal = original.reversal("miscount", Utc::now());
        repo.append(vec![reversal.clone()]).await.unwrap();
        assert_eq!(repo.reversal_of(&original.id).await.unwrap(), Some(reversal));

        let again = original.reversal("again", Utc::now());
        assert!(matches!(
            repo.append(vec![again]).await,
            Err(RepositoryError::AlreadyExists { .. })
        ));
        assert_eq!(repo.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_batch_writes_nothing() {
        let repo = InMemoryDecisionRepository::new();
        let original = storage("LOT-1", 4);
        repo.append(vec![original.clone()]).await.unwrap();

        let batch = vec![
            storage("LOT-1", 1),
            original.reversal("one", Utc::now()),
            original.reversal("two", Utc::now()),
        ];
        assert!(repo.append(batch).await.is_err());
        assert_eq!(repo.all().await.unwrap().len(), 1);
    }
}
