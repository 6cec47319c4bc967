use std::sync::Arc;

use crate::auth::AuthManager;
use crate::store::{BudgetStore, CategoryStore, ExpenseStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub expenses: Arc<dyn ExpenseStore>,
    pub budgets: Arc<dyn BudgetStore>,
    pub auth: Arc<AuthManager>,
}

impl AppState {
    /// Wire every resource to the same backing store.
    pub fn new<S>(store: Arc<S>, auth: AuthManager) -> Self
    where
        S: UserStore + CategoryStore + ExpenseStore + BudgetStore + 'static,
    {
        Self {
            users: store.clone(),
            categories: store.clone(),
            expenses: store.clone(),
            budgets: store,
            auth: Arc::new(auth),
        }
    }
}
