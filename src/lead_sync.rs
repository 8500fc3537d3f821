/// Lead sync pipeline
///
/// 1. Fetch the lead submissions of one account
/// 2. Resolve the questions of every distinct form seen
/// 3. Flatten each lead into answer rows
///
/// Export and webhook delivery happen in the handler once rows exist.
use crate::errors::{AppError, ResultExt};
use crate::flatten::flatten_lead;
use crate::linkedin_client::{LinkedInClient, Paging, TimeWindow};
use crate::linkedin_models::{AnswerRecord, FormQuestions};
use crate::normalize::{extract_form_id, is_valid_account_id, strip_urn};
use std::collections::HashMap;

#[derive(Clone)]
pub struct LeadSyncService {
    client: LinkedInClient,
}

impl LeadSyncService {
    pub fn new(client: LinkedInClient) -> Self {
        Self { client }
    }

    /// Runs one sync for `account_id` (bare id or sponsored-account URN).
    ///
    /// Any LinkedIn failure aborts the whole sync. Form lists are requested
    /// once per distinct (account, form) pair and dropped afterwards.
    pub async fn sync(
        &self,
        token: &str,
        account_id: &str,
        window: TimeWindow,
        paging: Paging,
    ) -> Result<Vec<AnswerRecord>, AppError> {
        if !is_valid_account_id(account_id) {
            return Err(AppError::BadRequest(format!(
                "Invalid account id: {}",
                account_id
            )));
        }
        if window.start >= window.end {
            return Err(AppError::BadRequest(
                "Time window start must be before end".to_string(),
            ));
        }
        let account_id = strip_urn(Some(account_id.trim()));

        let leads = self
            .client
            .fetch_leads(token, &account_id, window, paging)
            .await
            .with_context(|| format!("Lead sync for account {}", account_id))?;

        let mut forms: HashMap<(String, String), FormQuestions> = HashMap::new();
        let mut records = Vec::new();

        for lead in &leads {
            // Forms belong to the lead's owner account; fall back to the one requested
            let owner = strip_urn(lead.owner.sponsored_account.as_deref());
            let owner = if is_valid_account_id(&owner) {
                owner
            } else {
                if !owner.is_empty() {
                    tracing::warn!("Ignoring malformed lead owner {:?}", owner);
                }
                account_id.clone()
            };

            let questions = match extract_form_id(lead.versioned_lead_gen_form_urn.as_deref()) {
                Some(form_id) => {
                    let key = (owner, form_id);
                    if !forms.contains_key(&key) {
                        let resolved = self
                            .client
                            .fetch_form_questions(token, &key.0, &key.1)
                            .await
                            .with_context(|| format!("Resolving form {}", key.1))?;
                        forms.insert(key.clone(), resolved);
                    }
                    forms[&key].clone()
                }
                None => {
                    tracing::warn!(
                        "Lead {:?} has no recognisable form URN: {:?}",
                        lead.id,
                        lead.versioned_lead_gen_form_urn
                    );
                    FormQuestions::unknown()
                }
            };

            records.extend(flatten_lead(lead, &questions));
        }

        tracing::info!(
            "Lead data synced for account {}: {} lead(s), {} form(s), {} record(s)",
            account_id,
            leads.len(),
            forms.len(),
            records.len()
        );

        Ok(records)
    }
}
