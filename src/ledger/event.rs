//! Audit Event Vocabulary
//!
//! Event types recorded by the proctoring ledger, their severity tiers
//! and the default human-readable summaries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::ledger::block::Payload;

/// Severity classification of a recorded event
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    #[default]
    Info,
    Warning,
    Critical,
    Violation,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Violation => "violation",
        }
    }
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event type of a ledger block.
///
/// Known proctoring events map to dedicated variants; anything else is kept
/// verbatim in [`EventType::Other`] so the vocabulary stays open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Genesis,

    // Session lifecycle
    SessionStart,
    SessionEnd,
    SessionPause,
    SessionResume,

    // Face detection
    FaceDetected,
    FaceLost,
    MultipleFaces,
    NoFace,

    // Behavior classification
    BehaviorNormal,
    BehaviorSuspicious,
    BehaviorVerySuspicious,

    // Credibility scoring
    CredibilityUpdate,
    CredibilityThresholdBreach,

    // Exam actions
    QuestionViewed,
    AnswerSubmitted,
    ExamSubmitted,

    // Security actions
    TabSwitch,
    WindowBlur,
    CopyAttempt,
    PasteAttempt,
    RightClick,
    KeyboardShortcut,

    // System actions
    SystemWarning,
    IntegrityCheck,

    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Genesis => "GENESIS",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::SessionPause => "session_pause",
            Self::SessionResume => "session_resume",
            Self::FaceDetected => "face_detected",
            Self::FaceLost => "face_lost",
            Self::MultipleFaces => "multiple_faces",
            Self::NoFace => "no_face",
            Self::BehaviorNormal => "behavior_normal",
            Self::BehaviorSuspicious => "behavior_suspicious",
            Self::BehaviorVerySuspicious => "behavior_very_suspicious",
            Self::CredibilityUpdate => "credibility_update",
            Self::CredibilityThresholdBreach => "credibility_threshold_breach",
            Self::QuestionViewed => "question_viewed",
            Self::AnswerSubmitted => "answer_submitted",
            Self::ExamSubmitted => "exam_submitted",
            Self::TabSwitch => "tab_switch",
            Self::WindowBlur => "window_blur",
            Self::CopyAttempt => "copy_attempt",
            Self::PasteAttempt => "paste_attempt",
            Self::RightClick => "right_click",
            Self::KeyboardShortcut => "keyboard_shortcut",
            Self::SystemWarning => "system_warning",
            Self::IntegrityCheck => "integrity_check",
            Self::Other(other) => other,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    /// Severity tier of this event type.
    ///
    /// Precedence is violation, then critical, then warning; everything
    /// else is informational.
    pub fn severity(&self) -> EventSeverity {
        match self {
            Self::MultipleFaces | Self::BehaviorVerySuspicious | Self::CredibilityThresholdBreach => {
                EventSeverity::Violation
            }
            Self::SessionEnd => EventSeverity::Critical,
            Self::FaceLost
            | Self::NoFace
            | Self::BehaviorSuspicious
            | Self::TabSwitch
            | Self::WindowBlur
            | Self::CopyAttempt
            | Self::PasteAttempt => EventSeverity::Warning,
            Self::Genesis
            | Self::SessionStart
            | Self::SessionPause
            | Self::SessionResume
            | Self::FaceDetected
            | Self::BehaviorNormal
            | Self::CredibilityUpdate
            | Self::QuestionViewed
            | Self::AnswerSubmitted
            | Self::ExamSubmitted
            | Self::RightClick
            | Self::KeyboardShortcut
            | Self::SystemWarning
            | Self::IntegrityCheck
            | Self::Other(_) => EventSeverity::Info,
        }
    }

    /// Default summary used when a block is created without one
    pub fn default_summary(&self, payload: &Payload) -> String {
        match self {
            Self::Genesis => "Audit ledger genesis block".to_string(),
            Self::SessionStart => "Exam session started".to_string(),
            Self::SessionEnd => "Exam session ended".to_string(),
            Self::SessionPause => "Exam session paused".to_string(),
            Self::SessionResume => "Exam session resumed".to_string(),
            Self::FaceDetected => "Face detected in frame".to_string(),
            Self::FaceLost => "Face lost from frame".to_string(),
            Self::MultipleFaces => "Multiple faces detected - potential violation".to_string(),
            Self::NoFace => "No face detected in frame".to_string(),
            Self::BehaviorNormal => "Normal behavior observed".to_string(),
            Self::BehaviorSuspicious => "Suspicious behavior detected".to_string(),
            Self::BehaviorVerySuspicious => "Very suspicious behavior detected".to_string(),
            Self::CredibilityUpdate => format!(
                "Credibility score updated to {}",
                payload_field(payload, "score")
            ),
            Self::CredibilityThresholdBreach => "Credibility score below threshold".to_string(),
            Self::QuestionViewed => format!(
                "Question {} viewed",
                payload_field(payload, "questionNumber")
            ),
            Self::AnswerSubmitted => format!(
                "Answer submitted for question {}",
                payload_field(payload, "questionNumber")
            ),
            Self::ExamSubmitted => "Exam submitted".to_string(),
            Self::TabSwitch => "Tab switch detected".to_string(),
            Self::WindowBlur => "Window lost focus".to_string(),
            Self::CopyAttempt => "Copy attempt blocked".to_string(),
            Self::PasteAttempt => "Paste attempt blocked".to_string(),
            Self::RightClick => "Right-click attempt blocked".to_string(),
            Self::KeyboardShortcut => "Keyboard shortcut blocked".to_string(),
            Self::SystemWarning => match payload.get("message") {
                Some(Value::String(message)) if !message.is_empty() => message.clone(),
                _ => "System warning".to_string(),
            },
            Self::IntegrityCheck => "Integrity verification performed".to_string(),
            Self::Other(other) => format!("Event: {}", other),
        }
    }
}

/// Render a payload field for a summary, `N/A` when absent or empty
fn payload_field(payload: &Payload, key: &str) -> String {
    match payload.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => "N/A".to_string(),
        Some(Value::String(s)) if s.is_empty() => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        // whole floats print without a trailing `.0`
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "GENESIS" => Self::Genesis,
            "session_start" => Self::SessionStart,
            "session_end" => Self::SessionEnd,
            "session_pause" => Self::SessionPause,
            "session_resume" => Self::SessionResume,
            "face_detected" => Self::FaceDetected,
            "face_lost" => Self::FaceLost,
            "multiple_faces" => Self::MultipleFaces,
            "no_face" => Self::NoFace,
            "behavior_normal" => Self::BehaviorNormal,
            "behavior_suspicious" => Self::BehaviorSuspicious,
            "behavior_very_suspicious" => Self::BehaviorVerySuspicious,
            "credibility_update" => Self::CredibilityUpdate,
            "credibility_threshold_breach" => Self::CredibilityThresholdBreach,
            "question_viewed" => Self::QuestionViewed,
            "answer_submitted" => Self::AnswerSubmitted,
            "exam_submitted" => Self::ExamSubmitted,
            "tab_switch" => Self::TabSwitch,
            "window_blur" => Self::WindowBlur,
            "copy_attempt" => Self::CopyAttempt,
            "paste_attempt" => Self::PasteAttempt,
            "right_click" => Self::RightClick,
            "keyboard_shortcut" => Self::KeyboardShortcut,
            "system_warning" => Self::SystemWarning,
            "integrity_check" => Self::IntegrityCheck,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior classification reported by the proctoring model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorClass {
    Normal,
    Suspicious,
    VerySuspicious,
}

impl BehaviorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Suspicious => "suspicious",
            Self::VerySuspicious => "very_suspicious",
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Normal => EventType::BehaviorNormal,
            Self::Suspicious => EventType::BehaviorSuspicious,
            Self::VerySuspicious => EventType::BehaviorVerySuspicious,
        }
    }
}
