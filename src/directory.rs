use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{Result, WorkflowError};
use crate::types::{Principal, PrincipalId, Role};

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<PrincipalId, Principal>,
    by_username: HashMap<String, PrincipalId>,
    by_role: HashMap<Role, Vec<PrincipalId>>,
}

/// principal lookup table indexed by id, username and role
#[derive(Debug, Default)]
pub struct Directory {
    tables: RwLock<Tables>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a principal; usernames are unique
    pub fn register(&self, principal: Principal) -> Result<()> {
        let mut tables = self.write()?;
        if tables.by_username.contains_key(&principal.username) {
            return Err(WorkflowError::invalid_argument(format!(
                "username already registered: {}",
                principal.username
            )));
        }
        tables
            .by_username
            .insert(principal.username.clone(), principal.id);
        tables
            .by_role
            .entry(principal.role)
            .or_default()
            .push(principal.id);
        tables.by_id.insert(principal.id, principal);
        Ok(())
    }

    pub fn get(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.read()?.by_id.get(&id).cloned())
    }

    pub fn by_username(&self, username: &str) -> Result<Option<Principal>> {
        let tables = self.read()?;
        Ok(tables
            .by_username
            .get(username)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    pub fn with_role(&self, role: Role) -> Result<Vec<Principal>> {
        let tables = self.read()?;
        Ok(tables
            .by_role
            .get(&role)
            .map(|ids| ids.iter().filter_map(|id| tables.by_id.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    /// principal that must exist and hold a role accepted by `accept`
    pub fn require(
        &self,
        id: PrincipalId,
        entity: &'static str,
        accept: impl Fn(Role) -> bool,
    ) -> Result<Principal> {
        self.get(id)?
            .filter(|p| accept(p.role))
            .ok_or_else(|| WorkflowError::not_found(entity, id))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| WorkflowError::Storage {
            message: "directory lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| WorkflowError::Storage {
            message: "directory lock poisoned".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_index() {
        let directory = Directory::new();
        directory.register(Principal::customer("ana")).unwrap();
        directory.register(Principal::bank_agent("banco-sul")).unwrap();
        directory.register(Principal::bank_agent("banco-norte")).unwrap();

        assert_eq!(directory.with_role(Role::BankAgent).unwrap().len(), 2);
        assert_eq!(directory.with_role(Role::Customer).unwrap().len(), 1);
        assert!(directory.with_role(Role::Bank).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let directory = Directory::new();
        directory.register(Principal::customer("ana")).unwrap();
        assert!(directory.register(Principal::customer("ana")).is_err());
    }

    #[test]
    fn test_require_checks_role() {
        let directory = Directory::new();
        let customer = Principal::customer("ana");
        directory.register(customer.clone()).unwrap();

        assert!(directory.require(customer.id, "customer", |r| r == Role::Customer).is_ok());
        let err = directory.require(customer.id, "lender", |r| r.is_lender()).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { entity: "lender", .. }));
    }
}
