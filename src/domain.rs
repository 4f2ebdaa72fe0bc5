//! Rule-based academic profiling of a query.
//!
//! Cheap, offline signal about what kind of study request a query is. The
//! refinement prompt gets it as a hint, and a failed synthesis uses the domain
//! as its single fallback tag.

use serde::{Deserialize, Serialize};
use std::fmt;

const ACADEMIC_KEYWORDS: &[&str] = &[
    "exam",
    "study",
    "homework",
    "assignment",
    "course",
    "syllabus",
    "subject",
    "topic",
    "school",
    "university",
    "college",
    "test",
    "grade",
    "board",
    "curriculum",
];

const SUBJECT_KEYWORDS: &[(&str, &str)] = &[
    ("math", "Mathematics"),
    ("science", "Science"),
    ("history", "History"),
    ("physics", "Physics"),
    ("chemistry", "Chemistry"),
    ("biology", "Biology"),
    ("english", "English"),
    ("geography", "Geography"),
    ("computer", "Computer Science"),
    ("economics", "Economics"),
];

const SYLLABI: &[(&str, &str)] = &[("cbse", "CBSE"), ("icse", "ICSE")];

const TOPIC_MARKERS: &[&str] = &["topic", "chapter", "lesson"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Academic,
    General,
}

impl Domain {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What the keyword rules could tell about a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainProfile {
    pub domain: Domain,
    pub subject: Option<String>,
    pub syllabus: Option<String>,
    pub exam_focus: Option<String>,
    /// Context an academic query does not state
    pub missing_info: Vec<String>,
    /// Short hints for making the query more specific
    pub suggestions: Vec<String>,
}

impl DomainProfile {
    /// One-line summary embedded in refinement prompts
    pub fn hint(&self) -> String {
        let mut parts = vec![format!("domain={}", self.domain)];
        if let Some(subject) = &self.subject {
            parts.push(format!("subject={subject}"));
        }
        if let Some(syllabus) = &self.syllabus {
            parts.push(format!("syllabus={syllabus}"));
        }
        if let Some(exam_focus) = &self.exam_focus {
            parts.push(format!("focus={exam_focus}"));
        }
        if !self.missing_info.is_empty() {
            parts.push(format!("missing: {}", self.missing_info.join("; ")));
        }
        parts.join(", ")
    }
}

/// Profile `query` with the fixed keyword tables
pub fn analyze_domain(query: &str) -> DomainProfile {
    let lowered = query.to_lowercase();
    let domain = if ACADEMIC_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        Domain::Academic
    } else {
        Domain::General
    };

    let mut profile = DomainProfile {
        domain,
        subject: None,
        syllabus: None,
        exam_focus: None,
        missing_info: Vec::new(),
        suggestions: Vec::new(),
    };
    if domain == Domain::General {
        return profile;
    }

    profile.subject = lookup(&lowered, SUBJECT_KEYWORDS);
    profile.syllabus = lookup(&lowered, SYLLABI);
    if lowered.contains("exam") {
        profile.exam_focus = Some("Exam Preparation".to_string());
    }

    if profile.subject.is_none() {
        profile.missing_info.push("Subject not specified".to_string());
        profile.suggestions.push("Add subject area".to_string());
    }
    if profile.syllabus.is_none() {
        profile.missing_info.push("Syllabus not specified".to_string());
        profile.suggestions.push("Specify syllabus or board".to_string());
    }
    if profile.exam_focus.is_none() {
        profile.missing_info.push("Exam focus not specified".to_string());
        profile
            .suggestions
            .push("Mention exam focus if relevant".to_string());
    }
    if !TOPIC_MARKERS.iter().any(|m| lowered.contains(m)) {
        profile.missing_info.push("Topic not specified".to_string());
    }
    profile
        .suggestions
        .push("Include educational level (grade/class)".to_string());
    profile.suggestions.push("Specify topic or chapter".to_string());

    profile
}

fn lookup(lowered: &str, table: &[(&str, &str)]) -> Option<String> {
    table
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, value)| (*value).to_string())
}
