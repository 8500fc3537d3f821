use crate::config::Config;
use crate::errors::AppError;
use crate::linkedin_models::{
    AdAccount, ElementsResponse, FormQuestions, LeadForm, LeadSubmission, MemberProfile,
};
use chrono::{TimeDelta, Utc};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

/// Projection requested from `/rest/leadFormResponses`.
const LEAD_FIELDS: &str = "ownerInfo,associatedEntityInfo,leadMetadataInfo,owner,leadType,\
versionedLeadGenFormUrn,id,submittedAt,testLead,formResponse,\
form:(hiddenFields,creationLocale,name,id,content)";

/// Submission-time window `[start, end)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// The last `days` days through now. `None` when the start would fall
    /// outside the representable date range.
    pub fn last_days(days: i64) -> Option<Self> {
        let now = Utc::now();
        let start = now.checked_sub_signed(TimeDelta::try_days(days)?)?;
        Some(Self {
            start: start.timestamp_millis(),
            end: now.timestamp_millis(),
        })
    }
}

/// Restli pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub count: u32,
    pub start: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            count: 1000,
            start: 0,
        }
    }
}

/// Client for the LinkedIn Marketing REST API.
///
/// The bearer token is passed to every call; the client itself holds no
/// session state.
#[derive(Clone)]
pub struct LinkedInClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl LinkedInClient {
    /// Creates a new `LinkedInClient` with the configured request timeout.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create LinkedIn client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header("cache-control", "no-cache")
            .header("X-Restli-Protocol-Version", RESTLI_PROTOCOL_VERSION)
            .header("LinkedIn-Version", &self.api_version)
    }

    async fn get(&self, url: &str, token: &str, context: &str) -> Result<Response, AppError> {
        tracing::debug!("GET {}", url);
        self.authorized(self.client.get(url), token)
            .send()
            .await
            .map_err(|e| AppError::from_request(context, e))
    }

    /// Lists ACTIVE ad accounts reachable by `token`.
    ///
    /// Fails on a non-2xx response or a body without `elements`.
    pub async fn list_ad_accounts(&self, token: &str) -> Result<Vec<AdAccount>, AppError> {
        let url = format!(
            "{}/rest/adAccounts?q=search&search=(status:(values:List(ACTIVE)))",
            self.base_url
        );
        let response = self.get(&url, token, "Ad accounts").await?;
        let body: ElementsResponse<AdAccount> = read_json(response, "Ad accounts").await?;

        let accounts = body.elements.ok_or_else(|| AppError::Decode {
            message: "Ad accounts data missing 'elements' key".to_string(),
            body: String::new(),
        })?;

        tracing::info!("Retrieved {} active ad account(s)", accounts.len());
        Ok(accounts)
    }

    /// Fetches the raw lead submissions of `account_id` within `window`.
    ///
    /// A single page is requested; HTTP and decode errors are returned with
    /// the upstream body attached.
    pub async fn fetch_leads(
        &self,
        token: &str,
        account_id: &str,
        window: TimeWindow,
        paging: Paging,
    ) -> Result<Vec<LeadSubmission>, AppError> {
        // Restli syntax: parentheses and colons stay literal, the URN is pre-encoded
        let url = format!(
            "{}/rest/leadFormResponses?q=owner\
             &owner=(sponsoredAccount:urn%3Ali%3AsponsoredAccount%3A{})\
             &leadType=(leadType:SPONSORED)&limitedToTestLeads=false\
             &submittedAtTimeRange=(start:{},end:{})\
             &fields={}&count={}&start={}",
            self.base_url,
            account_id,
            window.start,
            window.end,
            LEAD_FIELDS,
            paging.count,
            paging.start
        );

        tracing::info!(
            "Fetching leads for account {} ({} -> {})",
            account_id,
            window.start,
            window.end
        );

        let response = self.get(&url, token, "Lead form responses").await?;
        let body: ElementsResponse<LeadSubmission> =
            read_json(response, "Lead form responses").await?;
        let leads = body.elements.unwrap_or_default();

        tracing::info!("Fetched {} lead(s) for account {}", leads.len(), account_id);
        Ok(leads)
    }

    /// Resolves the question labels and name of one lead form.
    ///
    /// LinkedIn has no per-form lookup, so the whole form list of the
    /// account is fetched and filtered here. Non-2xx responses and unknown
    /// ids resolve to `FormQuestions::unknown()`.
    pub async fn fetch_form_questions(
        &self,
        token: &str,
        account_id: &str,
        form_id: &str,
    ) -> Result<FormQuestions, AppError> {
        let url = format!(
            "{}/rest/leadForms?q=owner\
             &owner=(sponsoredAccount:urn%3Ali%3AsponsoredAccount%3A{})\
             &count=9999&start=0",
            self.base_url, account_id
        );

        let response = self.get(&url, token, "Lead forms").await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                "Lead forms for account {} returned {}: {}",
                account_id,
                status,
                error_text
            );
            return Ok(FormQuestions::unknown());
        }

        let body: ElementsResponse<LeadForm> = read_json(response, "Lead forms").await?;
        let resolved = body
            .elements
            .unwrap_or_default()
            .iter()
            .find(|form| form.id.as_deref() == Some(form_id))
            .map(FormQuestions::from_form);

        match resolved {
            Some(questions) => {
                tracing::debug!(
                    "Resolved form {} ({}) with {} question(s)",
                    form_id,
                    questions.form_name,
                    questions.questions.len()
                );
                Ok(questions)
            }
            None => {
                tracing::warn!("Form {} not found for account {}", form_id, account_id);
                Ok(FormQuestions::unknown())
            }
        }
    }

    /// Fetches the authenticated member's lite profile.
    pub async fn fetch_profile(&self, token: &str) -> Result<MemberProfile, AppError> {
        let url = format!("{}/v2/me", self.base_url);
        let response = self.get(&url, token, "Member profile").await?;
        read_json(response, "Member profile").await
    }

    /// Fetches the member's primary email address, if exposed.
    pub async fn fetch_primary_email(&self, token: &str) -> Result<Option<String>, AppError> {
        let url = format!(
            "{}/v2/emailAddress?q=members&projection=(elements*(handle~))",
            self.base_url
        );
        let response = self.get(&url, token, "Member email").await?;
        let body: Value = read_json(response, "Member email").await?;

        Ok(body
            .get("elements")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("handle~"))
            .and_then(|h| h.get("emailAddress"))
            .and_then(|a| a.as_str())
            .map(str::to_string))
    }
}

/// Checks the status, then decodes the body. The raw body is kept on
/// failure so callers can surface it.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, AppError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::from_request(context, e))?;

    if !status.is_success() {
        return Err(AppError::Upstream {
            context: context.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| AppError::Decode {
        message: format!("Failed to parse {} response: {}", context, e),
        body,
    })
}
