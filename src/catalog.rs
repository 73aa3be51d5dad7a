use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, WorkflowError};
use crate::types::{AutomobileId, PrincipalId, Role};

/// vehicle record as supplied by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automobile {
    pub id: AutomobileId,
    pub description: String,
    pub daily_rate: Money,
    pub available: bool,
    pub owner_id: PrincipalId,
    pub owner_role: Role,
}

impl Automobile {
    pub fn new(
        description: impl Into<String>,
        daily_rate: Money,
        owner_id: PrincipalId,
        owner_role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            daily_rate,
            available: true,
            owner_id,
            owner_role,
        }
    }

    /// rentals of this vehicle are gated by the owner's credit ledger
    pub fn is_lender_owned(&self) -> bool {
        self.owner_role.is_lender()
    }
}

/// external vehicle catalog
pub trait VehicleCatalog: Send + Sync {
    fn automobile(&self, id: AutomobileId) -> Result<Option<Automobile>>;

    fn set_available(&self, id: AutomobileId, available: bool) -> Result<()>;

    fn owned_by(&self, owner_id: PrincipalId) -> Result<Vec<Automobile>>;
}

/// in-memory catalog
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    automobiles: RwLock<HashMap<AutomobileId, Automobile>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, automobile: Automobile) -> Result<AutomobileId> {
        let id = automobile.id;
        self.automobiles
            .write()
            .map_err(|_| poisoned())?
            .insert(id, automobile);
        Ok(id)
    }
}

impl VehicleCatalog for InMemoryCatalog {
    fn automobile(&self, id: AutomobileId) -> Result<Option<Automobile>> {
        Ok(self.automobiles.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    fn set_available(&self, id: AutomobileId, available: bool) -> Result<()> {
        let mut automobiles = self.automobiles.write().map_err(|_| poisoned())?;
        let automobile = automobiles
            .get_mut(&id)
            .ok_or_else(|| WorkflowError::not_found("automobile", id))?;
        automobile.available = available;
        Ok(())
    }

    fn owned_by(&self, owner_id: PrincipalId) -> Result<Vec<Automobile>> {
        Ok(self
            .automobiles
            .read()
            .map_err(|_| poisoned())?
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

fn poisoned() -> WorkflowError {
    WorkflowError::Storage {
        message: "catalog lock poisoned".to_string(),
    }
}
