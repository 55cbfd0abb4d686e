//! Rule-based symptom assistant.
//!
//! A deterministic two-state dialogue policy with no language understanding:
//!
//! ```text
//! NoSymptomCaptured ──utterance──► AwaitingSeverity ──draft added──► NoSymptomCaptured
//!                                        │
//!                                        └──utterance──► (acknowledge, draft untouched)
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Symptom, SymptomReport};

/// Opening message of every conversation.
pub const GREETING: &str = "Hello! I'm your virtual medical assistant. I'll help collect information about your symptoms before your visit. What brings you in today?";

/// Reply after the first utterance of a new symptom.
pub const SEVERITY_PROMPT: &str = "I understand you're experiencing some discomfort. Let's add this as a symptom to track. Could you tell me how severe this is on a scale from mild to severe?";

/// Reply to every later utterance.
pub const ACKNOWLEDGMENT: &str = "Thank you for providing that information. Is there anything else you'd like to add about your symptoms or medical history?";

/// Dialogue state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssistantState {
    NoSymptomCaptured,
    AwaitingSeverity,
}

/// Who sent a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: String,
}

impl Message {
    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Drives symptom capture for the symptom intake stage.
#[derive(Debug, Clone)]
pub struct SymptomAssistant {
    state: AssistantState,
    draft: Option<Symptom>,
    symptoms: Vec<Symptom>,
    transcript: Vec<Message>,
}

impl SymptomAssistant {
    /// Start a conversation with the greeting.
    pub fn new() -> Self {
        Self {
            state: AssistantState::NoSymptomCaptured,
            draft: None,
            symptoms: Vec::new(),
            transcript: vec![Message::new(Sender::Assistant, GREETING)],
        }
    }

    pub fn state(&self) -> AssistantState {
        self.state
    }

    /// The symptom currently being described, if any.
    pub fn draft(&self) -> Option<&Symptom> {
        self.draft.as_ref()
    }

    pub fn symptoms(&self) -> &[Symptom] {
        &self.symptoms
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Handle one user utterance and return the assistant's reply.
    ///
    /// Blank utterances are ignored and produce no reply.
    pub fn respond(&mut self, utterance: &str) -> Option<&Message> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return None;
        }
        self.transcript.push(Message::new(Sender::User, utterance));

        let reply = match self.state {
            AssistantState::NoSymptomCaptured => {
                let mut draft = Symptom::named(utterance);
                draft.id = uuid::Uuid::new_v4().to_string();
                self.draft = Some(draft);
                self.state = AssistantState::AwaitingSeverity;
                SEVERITY_PROMPT
            }
            AssistantState::AwaitingSeverity => ACKNOWLEDGMENT,
        };
        debug!(state = ?self.state, turns = self.transcript.len(), "assistant turn");

        self.transcript.push(Message::new(Sender::Assistant, reply));
        self.transcript.last()
    }

    /// Edit the current draft. Returns false when there is no draft.
    pub fn update_draft(&mut self, edit: impl FnOnce(&mut Symptom)) -> bool {
        match self.draft.as_mut() {
            Some(draft) => {
                edit(draft);
                true
            }
            None => false,
        }
    }

    /// Add a symptom to the list. A blank name is a silent no-op.
    pub fn add_symptom(&mut self, mut symptom: Symptom) -> bool {
        if !symptom.has_name() {
            return false;
        }
        if symptom.id.is_empty() {
            symptom.id = uuid::Uuid::new_v4().to_string();
        }
        self.symptoms.push(symptom);
        true
    }

    /// Add the current draft and restart the dialogue for the next symptom.
    pub fn commit_draft(&mut self) -> bool {
        let Some(draft) = self.draft.take() else {
            return false;
        };
        self.state = AssistantState::NoSymptomCaptured;
        self.add_symptom(draft)
    }

    /// Remove a symptom by id.
    pub fn remove_symptom(&mut self, id: &str) -> bool {
        let before = self.symptoms.len();
        self.symptoms.retain(|s| s.id != id);
        self.symptoms.len() != before
    }

    /// Package the assessment for the symptom intake commit.
    pub fn complete_assessment(&self, chief_complaint: &str) -> SymptomReport {
        SymptomReport {
            symptoms: self.symptoms.clone(),
            chief_complaint: chief_complaint.trim().to_string(),
        }
    }
}

impl Default for SymptomAssistant {
    fn default() -> Self {
        Self::new()
    }
}
