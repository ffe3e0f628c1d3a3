//! The fixed set of CRM functions offered to the model.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use opshub_clients::{account_snapshot, CrmRepository};
use opshub_core::domain::crm::AccountId;

use crate::tools::{required_str, Tool, ToolInputError, ToolRegistry};

pub const ACCOUNT_ID_ARG: &str = "account_id";
pub const SEARCH_TERM_ARG: &str = "search_term";

pub fn crm_tool_registry(crm: Arc<dyn CrmRepository>) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(SearchAccounts(crm.clone()));
    registry.register(GetAccountData(crm.clone()));
    registry.register(RelatedList::new(crm.clone(), RelatedKind::Contacts));
    registry.register(RelatedList::new(crm.clone(), RelatedKind::Opportunities));
    registry.register(RelatedList::new(crm.clone(), RelatedKind::Cases));
    registry.register(RelatedList::new(crm, RelatedKind::Tasks));
    registry
}

fn account_id_schema(purpose: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            ACCOUNT_ID_ARG: {
                "type": "string",
                "description": format!("The 15 or 18 character Salesforce account ID {purpose}")
            }
        },
        "required": [ACCOUNT_ID_ARG]
    })
}

fn account_id_arg(input: &Value) -> Result<AccountId, ToolInputError> {
    let raw = required_str(input, ACCOUNT_ID_ARG)?;
    AccountId::parse(raw)
        .map_err(|error| ToolInputError::Invalid { name: ACCOUNT_ID_ARG, detail: error.to_string() })
}

struct SearchAccounts(Arc<dyn CrmRepository>);

#[async_trait]
impl Tool for SearchAccounts {
    fn name(&self) -> &'static str {
        "search_accounts"
    }

    fn description(&self) -> &'static str {
        "Search Salesforce accounts by name or keyword and return their IDs, names and industries."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                SEARCH_TERM_ARG: {"type": "string", "description": "Account name or keyword to search for"}
            },
            "required": [SEARCH_TERM_ARG]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let term = required_str(&input, SEARCH_TERM_ARG)?;
        let accounts = self.0.search_accounts(term).await?;
        Ok(json!({ "search_term": term, "accounts": accounts }))
    }
}

struct GetAccountData(Arc<dyn CrmRepository>);

#[async_trait]
impl Tool for GetAccountData {
    fn name(&self) -> &'static str {
        "get_account_data"
    }

    fn description(&self) -> &'static str {
        "Retrieve an account's details together with its contacts, cases, opportunities and activities."
    }

    fn parameters(&self) -> Value {
        account_id_schema("to summarize")
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let account_id = account_id_arg(&input)?;
        Ok(match account_snapshot(self.0.as_ref(), &account_id).await? {
            Some(snapshot) => Value::String(snapshot.render_summary()),
            None => Value::String(format!("No data found for account ID {account_id}")),
        })
    }
}

#[derive(Clone, Copy)]
enum RelatedKind {
    Contacts,
    Opportunities,
    Cases,
    Tasks,
}

impl RelatedKind {
    fn key(self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Opportunities => "opportunities",
            Self::Cases => "cases",
            Self::Tasks => "tasks",
        }
    }
}

struct RelatedList {
    crm: Arc<dyn CrmRepository>,
    kind: RelatedKind,
}

impl RelatedList {
    fn new(crm: Arc<dyn CrmRepository>, kind: RelatedKind) -> Self {
        Self { crm, kind }
    }
}

#[async_trait]
impl Tool for RelatedList {
    fn name(&self) -> &'static str {
        match self.kind {
            RelatedKind::Contacts => "get_contacts",
            RelatedKind::Opportunities => "get_opportunities",
            RelatedKind::Cases => "get_cases",
            RelatedKind::Tasks => "get_tasks",
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            RelatedKind::Contacts => "List the contacts (name and email) of a Salesforce account.",
            RelatedKind::Opportunities => {
                "List the opportunities (name, stage and amount) of a Salesforce account."
            }
            RelatedKind::Cases => "List the support cases (subject and status) of a Salesforce account.",
            RelatedKind::Tasks => {
                "List the tasks and activities (subject, status and date) of a Salesforce account."
            }
        }
    }

    fn parameters(&self) -> Value {
        account_id_schema(&format!("whose {} to list", self.kind.key()))
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let account_id = account_id_arg(&input)?;
        let records = match self.kind {
            RelatedKind::Contacts => serde_json::to_value(self.crm.contacts_for_account(&account_id).await?)?,
            RelatedKind::Opportunities => {
                serde_json::to_value(self.crm.opportunities_for_account(&account_id).await?)?
            }
            RelatedKind::Cases => serde_json::to_value(self.crm.cases_for_account(&account_id).await?)?,
            RelatedKind::Tasks => serde_json::to_value(self.crm.tasks_for_account(&account_id).await?)?,
        };

        Ok(json!({ ACCOUNT_ID_ARG: account_id.as_str(), self.kind.key(): records }))
    }
}
