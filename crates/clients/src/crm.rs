use async_trait::async_trait;
use serde_json::{Map, Value};

use opshub_core::domain::crm::{
    AccountId, AccountMatch, AccountSnapshot, Case, Contact, CreatedRecord, NewNote, NewTask,
    Opportunity, Task,
};

use crate::error::ClientError;

/// Account-centric reads and the two writes the chat flows perform.
#[async_trait]
pub trait CrmRepository: Send + Sync {
    async fn search_accounts(&self, term: &str) -> Result<Vec<AccountMatch>, ClientError>;

    /// `Ok(None)` when the CRM has no account with this id.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Map<String, Value>>, ClientError>;

    async fn contacts_for_account(&self, id: &AccountId) -> Result<Vec<Contact>, ClientError>;

    async fn opportunities_for_account(
        &self,
        id: &AccountId,
    ) -> Result<Vec<Opportunity>, ClientError>;

    async fn cases_for_account(&self, id: &AccountId) -> Result<Vec<Case>, ClientError>;

    async fn tasks_for_account(&self, id: &AccountId) -> Result<Vec<Task>, ClientError>;

    async fn create_task(&self, task: NewTask) -> Result<CreatedRecord, ClientError>;

    async fn add_note(&self, note: NewNote) -> Result<CreatedRecord, ClientError>;
}

pub async fn account_snapshot(
    crm: &dyn CrmRepository,
    id: &AccountId,
) -> Result<Option<AccountSnapshot>, ClientError> {
    let Some(details) = crm.get_account(id).await? else {
        return Ok(None);
    };

    let (contacts, cases, opportunities, activities) = tokio::try_join!(
        crm.contacts_for_account(id),
        crm.cases_for_account(id),
        crm.opportunities_for_account(id),
        crm.tasks_for_account(id),
    )?;

    Ok(Some(AccountSnapshot {
        account_id: id.clone(),
        details,
        contacts,
        cases,
        opportunities,
        activities,
    }))
}
