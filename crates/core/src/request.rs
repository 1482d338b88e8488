//! Selection request: who is asking, what they need, which documents to read.

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub filename: String,
    /// Carried through but unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A parsed and validated selection request.
///
/// ```json
/// {
///   "persona": { "role": "Travel Planner" },
///   "job_to_be_done": { "task": "Plan a trip of 4 days" },
///   "documents": [{ "filename": "south_of_france.pdf", "title": "..." }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub persona: Persona,
    pub job_to_be_done: Job,
    pub documents: Vec<DocumentRef>,
}

/// Raw shape with every field optional, so missing fields can be reported
/// by name instead of as a serde error.
#[derive(Deserialize)]
struct RawRequest {
    persona: Option<Persona>,
    job_to_be_done: Option<Job>,
    documents: Option<Vec<DocumentRef>>,
}

impl Request {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: RawRequest =
            serde_json::from_str(json).map_err(|e| Error::InvalidRequest(e.to_string()))?;

        let request = Request {
            persona: raw
                .persona
                .ok_or_else(|| Error::InvalidRequest("missing field persona".into()))?,
            job_to_be_done: raw
                .job_to_be_done
                .ok_or_else(|| Error::InvalidRequest("missing field job_to_be_done".into()))?,
            documents: raw
                .documents
                .ok_or_else(|| Error::InvalidRequest("missing field documents".into()))?,
        };

        request.validate()?;
        Ok(request)
    }

    /// Check that persona role, task and the document list are all usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.persona.role.trim().is_empty() {
            return Err(Error::InvalidRequest("persona.role is empty".into()));
        }
        if self.job_to_be_done.task.trim().is_empty() {
            return Err(Error::InvalidRequest("job_to_be_done.task is empty".into()));
        }
        if self.documents.is_empty() {
            return Err(Error::InvalidRequest("documents is empty".into()));
        }
        if let Some(i) = self
            .documents
            .iter()
            .position(|d| d.filename.trim().is_empty())
        {
            return Err(Error::InvalidRequest(format!(
                "documents[{i}].filename is empty"
            )));
        }
        Ok(())
    }

    pub fn filenames(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.filename.clone()).collect()
    }

    pub fn query(&self) -> Query {
        Query {
            persona: self.persona.role.clone(),
            task: self.job_to_be_done.task.clone(),
        }
    }
}

/// Persona and task, embedded together as the relevance query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub persona: String,
    pub task: String,
}

impl Query {
    /// Task first, then persona, separated by one space.
    pub fn text(&self) -> String {
        format!("{} {}", self.task, self.persona)
    }
}
