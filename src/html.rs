//! HTML pages rendered from the askama templates under `templates/`.

use crate::errors::AppError;
use crate::linkedin_models::{AdAccount, AnswerRecord};
use askama::Template;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate;

struct AccountRow<'a> {
    id: &'a str,
    name: &'a str,
}

#[derive(Template)]
#[template(path = "ads_accounts.html")]
struct AdsAccountsTemplate<'a> {
    display_name: &'a str,
    accounts: Vec<AccountRow<'a>>,
}

#[derive(Template)]
#[template(path = "sync_result.html")]
struct SyncResultTemplate<'a> {
    account_id: &'a str,
    columns: &'a [&'static str],
    records: &'a [AnswerRecord],
}

fn render<T: Template>(template: &T) -> Result<String, AppError> {
    template
        .render()
        .map_err(|e| AppError::InternalError(format!("Failed to render page: {}", e)))
}

pub fn index_page() -> Result<String, AppError> {
    render(&IndexTemplate)
}

/// Account list, each row with a form posting its id to `/sync_leads`.
pub fn ads_accounts_page(display_name: &str, accounts: &[AdAccount]) -> Result<String, AppError> {
    let accounts = accounts
        .iter()
        .map(|account| AccountRow {
            id: account.id.as_deref().unwrap_or_default(),
            name: &account.name,
        })
        .collect();

    render(&AdsAccountsTemplate {
        display_name,
        accounts,
    })
}

/// Result table, one column per `AnswerRecord::COLUMNS` entry.
pub fn sync_result_page(account_id: &str, records: &[AnswerRecord]) -> Result<String, AppError> {
    render(&SyncResultTemplate {
        account_id,
        columns: &AnswerRecord::COLUMNS,
        records,
    })
}
