/// Lead flattening
///
/// Turns one `LeadSubmission` plus the labels of its form into one
/// `AnswerRecord` per answered question. No I/O happens here.
use crate::linkedin_models::{Answer, AnswerRecord, FormQuestions, LeadSubmission};
use crate::normalize::{convert_epoch_to_utc, extract_form_id, strip_urn};

/// Identifiers shared by every row produced from one lead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadContext {
    pub lead_response_id: Option<String>,
    pub lead_form_id: Option<String>,
    pub submitted_at: Option<String>,
    pub account_id: String,
    pub account_name: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub creative_id: String,
}

impl LeadContext {
    pub fn from_submission(lead: &LeadSubmission) -> Self {
        let campaign = &lead.lead_metadata_info.sponsored_lead_metadata_info.campaign;

        Self {
            lead_response_id: lead.id.clone(),
            lead_form_id: extract_form_id(lead.versioned_lead_gen_form_urn.as_deref()),
            submitted_at: convert_epoch_to_utc(lead.submitted_at),
            account_id: strip_urn(lead.owner.sponsored_account.as_deref()),
            account_name: lead
                .owner_info
                .sponsored_account_info
                .name
                .clone()
                .unwrap_or_default(),
            campaign_id: strip_urn(campaign.id.as_deref()),
            campaign_name: campaign.name.clone().unwrap_or_default(),
            creative_id: strip_urn(
                lead.associated_entity_info
                    .associated_creative
                    .id
                    .as_deref(),
            ),
        }
    }
}

/// One row per answer, labelled from `questions`.
///
/// Unknown question ids are labelled `Question {id}`.
pub fn extract_question_answers(
    answers: &[Answer],
    context: &LeadContext,
    questions: &FormQuestions,
) -> Vec<AnswerRecord> {
    answers
        .iter()
        .map(|answer| {
            let question_id = answer.question_id.as_deref().unwrap_or_default();
            let question = questions
                .label_for(question_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Question {}", question_id));

            AnswerRecord {
                question,
                answer: answer.text().map(str::to_string),
                form_name: questions.form_name.clone(),
                submitted_at: context.submitted_at.clone(),
                lead_response_id: context.lead_response_id.clone(),
                lead_form_id: context.lead_form_id.clone(),
                account_id: context.account_id.clone(),
                account_name: context.account_name.clone(),
                campaign_id: context.campaign_id.clone(),
                campaign_name: context.campaign_name.clone(),
                creative_id: context.creative_id.clone(),
            }
        })
        .collect()
}

/// Flatten a whole lead.
pub fn flatten_lead(lead: &LeadSubmission, questions: &FormQuestions) -> Vec<AnswerRecord> {
    let context = LeadContext::from_submission(lead);
    extract_question_answers(&lead.form_response.answers, &context, questions)
}
