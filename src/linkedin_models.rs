use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Restli list envelope shared by every LinkedIn collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementsResponse<T> {
    pub elements: Option<Vec<T>>,
}

/// Ad account as listed by `/rest/adAccounts`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AdAccount {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,

    #[serde(default = "unknown_account_name", deserialize_with = "name_or_unknown")]
    pub name: String,
}

fn unknown_account_name() -> String {
    "Unknown Name".to_string()
}

fn name_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_account_name))
}

/// Lead form response as returned by `/rest/leadFormResponses`.
///
/// Every nested object may be missing or `null`; both read as empty.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,

    /// Epoch milliseconds
    #[serde(default)]
    pub submitted_at: Option<i64>,

    #[serde(default, deserialize_with = "null_default")]
    pub owner: LeadOwner,

    #[serde(default, deserialize_with = "null_default")]
    pub owner_info: OwnerInfo,

    #[serde(default, deserialize_with = "null_default")]
    pub lead_metadata_info: LeadMetadataInfo,

    #[serde(default, deserialize_with = "null_default")]
    pub associated_entity_info: AssociatedEntityInfo,

    #[serde(default)]
    pub versioned_lead_gen_form_urn: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub form_response: FormResponse,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadOwner {
    /// `urn:li:sponsoredAccount:{id}`
    #[serde(default)]
    pub sponsored_account: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerInfo {
    #[serde(default, deserialize_with = "null_default")]
    pub sponsored_account_info: SponsoredAccountInfo,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SponsoredAccountInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMetadataInfo {
    #[serde(default, deserialize_with = "null_default")]
    pub sponsored_lead_metadata_info: SponsoredLeadMetadataInfo,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SponsoredLeadMetadataInfo {
    #[serde(default, deserialize_with = "null_default")]
    pub campaign: CampaignInfo,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CampaignInfo {
    /// `urn:li:sponsoredCampaign:{id}`
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedEntityInfo {
    #[serde(default, deserialize_with = "null_default")]
    pub associated_creative: CreativeInfo,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreativeInfo {
    /// `urn:li:sponsoredCreative:{id}`
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(default, deserialize_with = "id_string")]
    pub question_id: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub answer_details: AnswerDetails,
}

impl Answer {
    /// Free-text answer, if the question was a text question.
    pub fn text(&self) -> Option<&str> {
        self.answer_details
            .text_question_answer
            .as_ref()
            .and_then(|t| t.answer.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetails {
    #[serde(default)]
    pub text_question_answer: Option<TextQuestionAnswer>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextQuestionAnswer {
    #[serde(default)]
    pub answer: Option<String>,
}

/// Lead form definition as listed by `/rest/leadForms`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadForm {
    #[serde(default, deserialize_with = "id_string")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub content: LeadFormContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFormContent {
    #[serde(default, deserialize_with = "null_default")]
    pub questions: Vec<LeadFormQuestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFormQuestion {
    #[serde(default, deserialize_with = "id_string")]
    pub question_id: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub question: LocalizedText,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedText {
    #[serde(default, deserialize_with = "null_default")]
    pub localized: BTreeMap<String, String>,
}

impl LocalizedText {
    /// `en_US` text, else the first locale present.
    pub fn preferred(&self) -> Option<&str> {
        self.localized
            .get("en_US")
            .or_else(|| self.localized.values().next())
            .map(String::as_str)
    }
}

/// One question of a form, snapshotted when the form list was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormQuestion {
    pub question_id: String,
    pub label: String,
}

/// Labels and name of a single lead form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormQuestions {
    pub questions: Vec<FormQuestion>,
    pub form_name: String,
}

impl FormQuestions {
    pub const UNKNOWN_FORM: &'static str = "Unknown Form";

    /// Result used when the form cannot be resolved.
    pub fn unknown() -> Self {
        Self {
            questions: Vec::new(),
            form_name: Self::UNKNOWN_FORM.to_string(),
        }
    }

    pub fn from_form(form: &LeadForm) -> Self {
        let questions = form
            .content
            .questions
            .iter()
            .filter_map(|q| {
                let question_id = q.question_id.clone()?;
                let label = q
                    .question
                    .preferred()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Question {}", question_id));
                Some(FormQuestion { question_id, label })
            })
            .collect();

        Self {
            questions,
            form_name: form
                .name
                .clone()
                .unwrap_or_else(|| Self::UNKNOWN_FORM.to_string()),
        }
    }

    pub fn label_for(&self, question_id: &str) -> Option<&str> {
        self.questions
            .iter()
            .find(|q| q.question_id == question_id)
            .map(|q| q.label.as_str())
    }
}

/// One output row: a single answered question of a single lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: Option<String>,
    #[serde(rename = "form name")]
    pub form_name: String,
    #[serde(rename = "submittedAt")]
    pub submitted_at: Option<String>,
    #[serde(rename = "lead response id")]
    pub lead_response_id: Option<String>,
    #[serde(rename = "lead form id")]
    pub lead_form_id: Option<String>,
    #[serde(rename = "account id")]
    pub account_id: String,
    #[serde(rename = "account name")]
    pub account_name: String,
    #[serde(rename = "campaign id")]
    pub campaign_id: String,
    #[serde(rename = "campaign name")]
    pub campaign_name: String,
    #[serde(rename = "creative id")]
    pub creative_id: String,
}

impl AnswerRecord {
    /// Column headers, in serialization order.
    pub const COLUMNS: [&'static str; 11] = [
        "question",
        "answer",
        "form name",
        "submittedAt",
        "lead response id",
        "lead form id",
        "account id",
        "account name",
        "campaign id",
        "campaign name",
        "creative id",
    ];

    /// Cell values in `COLUMNS` order; nulls become empty strings.
    pub fn cells(&self) -> [String; 11] {
        [
            self.question.clone(),
            self.answer.clone().unwrap_or_default(),
            self.form_name.clone(),
            self.submitted_at.clone().unwrap_or_default(),
            self.lead_response_id.clone().unwrap_or_default(),
            self.lead_form_id.clone().unwrap_or_default(),
            self.account_id.clone(),
            self.account_name.clone(),
            self.campaign_id.clone(),
            self.campaign_name.clone(),
            self.creative_id.clone(),
        ]
    }
}

/// Webhook body: `{"data": [AnswerRecord, ...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct LeadsPayload<'a> {
    pub data: &'a [AnswerRecord],
}

/// Profile subset returned by `/v2/me`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub localized_first_name: Option<String>,
    #[serde(default)]
    pub localized_last_name: Option<String>,
}

impl MemberProfile {
    pub fn display_name(&self) -> String {
        [
            self.localized_first_name.as_deref(),
            self.localized_last_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Token endpoint response. `access_token` is absent on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

fn value_to_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts string or numeric ids; anything else reads as `None`.
fn id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_id))
}

fn required_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    value_to_id(Value::deserialize(deserializer)?)
        .ok_or_else(|| serde::de::Error::custom("id must be a string or number"))
}

/// Treats an explicit `null` like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
