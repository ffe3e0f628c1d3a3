use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use opshub_core::domain::crm::{
    AccountId, AccountMatch, Case, Contact, CreatedRecord, NewNote, NewTask, Opportunity, Task,
};

use crate::crm::CrmRepository;
use crate::error::ClientError;

#[derive(Clone, Debug, Default)]
struct AccountRecords {
    details: Map<String, Value>,
    contacts: Vec<Contact>,
    opportunities: Vec<Opportunity>,
    cases: Vec<Case>,
    tasks: Vec<Task>,
    notes: Vec<NewNote>,
}

/// CRM kept in process memory; used by tests and offline demos.
#[derive(Default)]
pub struct InMemoryCrm {
    accounts: RwLock<HashMap<String, AccountRecords>>,
    next_id: AtomicU64,
}

impl InMemoryCrm {
    pub async fn insert_account(&self, id: &AccountId, name: &str, industry: Option<&str>) {
        let mut details = Map::new();
        details.insert("Id".to_owned(), json!(id.as_str()));
        details.insert("Name".to_owned(), json!(name));
        details.insert("Industry".to_owned(), json!(industry));

        let mut accounts = self.accounts.write().await;
        accounts.entry(id.as_str().to_owned()).or_default().details = details;
    }

    pub async fn insert_contact(&self, id: &AccountId, contact: Contact) {
        let mut accounts = self.accounts.write().await;
        accounts.entry(id.as_str().to_owned()).or_default().contacts.push(contact);
    }

    pub async fn insert_opportunity(&self, id: &AccountId, opportunity: Opportunity) {
        let mut accounts = self.accounts.write().await;
        accounts.entry(id.as_str().to_owned()).or_default().opportunities.push(opportunity);
    }

    pub async fn insert_case(&self, id: &AccountId, case: Case) {
        let mut accounts = self.accounts.write().await;
        accounts.entry(id.as_str().to_owned()).or_default().cases.push(case);
    }

    pub async fn notes_for(&self, id: &AccountId) -> Vec<NewNote> {
        let accounts = self.accounts.read().await;
        accounts.get(id.as_str()).map(|records| records.notes.clone()).unwrap_or_default()
    }

    fn next_record_id(&self, prefix: &str) -> String {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}{sequence:015}")
    }

    async fn related<T: Clone>(
        &self,
        id: &AccountId,
        select: impl Fn(&AccountRecords) -> &Vec<T>,
    ) -> Vec<T> {
        let accounts = self.accounts.read().await;
        accounts.get(id.as_str()).map(|records| select(records).clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl CrmRepository for InMemoryCrm {
    async fn search_accounts(&self, term: &str) -> Result<Vec<AccountMatch>, ClientError> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ClientError::InvalidInput("search term must not be empty".to_owned()));
        }

        let accounts = self.accounts.read().await;
        let mut matches: Vec<AccountMatch> = accounts
            .iter()
            .filter_map(|(id, records)| {
                let name = records.details.get("Name").and_then(Value::as_str)?;
                name.to_lowercase().contains(&needle).then(|| AccountMatch {
                    id: id.clone(),
                    name: name.to_owned(),
                    industry: records
                        .details
                        .get("Industry")
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                })
            })
            .collect();
        matches.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(matches)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Map<String, Value>>, ClientError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(id.as_str())
            .map(|records| records.details.clone())
            .filter(|details| !details.is_empty()))
    }

    async fn contacts_for_account(&self, id: &AccountId) -> Result<Vec<Contact>, ClientError> {
        Ok(self.related(id, |records| &records.contacts).await)
    }

    async fn opportunities_for_account(
        &self,
        id: &AccountId,
    ) -> Result<Vec<Opportunity>, ClientError> {
        Ok(self.related(id, |records| &records.opportunities).await)
    }

    async fn cases_for_account(&self, id: &AccountId) -> Result<Vec<Case>, ClientError> {
        Ok(self.related(id, |records| &records.cases).await)
    }

    async fn tasks_for_account(&self, id: &AccountId) -> Result<Vec<Task>, ClientError> {
        Ok(self.related(id, |records| &records.tasks).await)
    }

    async fn create_task(&self, task: NewTask) -> Result<CreatedRecord, ClientError> {
        task.validate()?;
        let record_id = self.next_record_id("00T");
        let mut accounts = self.accounts.write().await;
        let records = accounts.get_mut(task.account_id.as_str()).ok_or_else(|| {
            ClientError::NotFound {
                service: "salesforce",
                resource: format!("account {}", task.account_id),
            }
        })?;
        records.tasks.push(Task {
            id: record_id.clone(),
            subject: Some(task.subject),
            status: Some(task.status),
            activity_date: task.activity_date,
        });
        Ok(CreatedRecord { id: record_id, success: true, errors: Vec::new() })
    }

    async fn add_note(&self, note: NewNote) -> Result<CreatedRecord, ClientError> {
        note.validate()?;
        let record_id = self.next_record_id("002");
        let mut accounts = self.accounts.write().await;
        let records = accounts.get_mut(note.account_id.as_str()).ok_or_else(|| {
            ClientError::NotFound {
                service: "salesforce",
                resource: format!("account {}", note.account_id),
            }
        })?;
        records.notes.push(note);
        Ok(CreatedRecord { id: record_id, success: true, errors: Vec::new() })
    }
}
