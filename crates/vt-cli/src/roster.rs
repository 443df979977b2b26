//! File-backed roster: the stand-in for the session platform's member and
//! role directory at the engine's collaborator boundary.
//!
//! The roster file is a JSON array of members:
//!
//! ```json
//! [
//!   { "id": "1157", "name": "Alice", "leader": true },
//!   { "id": "42", "name": "Bert" }
//! ]
//! ```
//!
//! The `leader` flag is the leader designation the rollover grants and
//! revokes; mutations write the file back so the designation survives
//! restarts.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vt_core::{ParticipantId, Roster, RosterError};

/// One roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub leader: bool,
}

/// Roster loaded from a JSON file, written back on every mutation.
#[derive(Debug, Clone)]
pub struct FileRoster {
    path: PathBuf,
    members: Vec<Member>,
}

impl FileRoster {
    /// Loads the roster, treating a missing file as an empty roster.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let members = match fs::read(&path) {
            Ok(body) => serde_json::from_slice(&body)
                .with_context(|| format!("malformed roster file {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no roster file, starting empty");
                Vec::new()
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read roster {}", path.display()));
            }
        };
        Ok(Self { path, members })
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The roster file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn member_mut(&mut self, participant: &ParticipantId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.id == participant)
    }

    fn persist(&self) -> Result<(), RosterError> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let body = serde_json::to_vec_pretty(&self.members)?;
            let tmp = self.path.with_extension("json.tmp");
            fs::write(&tmp, body)?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|err| RosterError::OperationFailed {
            participant: String::new(),
            message: format!("failed to write roster {}: {err}", self.path.display()),
        })
    }
}

impl Roster for FileRoster {
    fn display_name(&self, participant: &ParticipantId) -> Option<String> {
        self.members
            .iter()
            .find(|m| &m.id == participant)
            .map(|m| m.name.clone())
    }

    fn leader_holders(&self) -> Vec<ParticipantId> {
        self.members
            .iter()
            .filter(|m| m.leader)
            .map(|m| m.id.clone())
            .collect()
    }

    fn grant_leader(&mut self, participant: &ParticipantId) -> Result<(), RosterError> {
        let Some(member) = self.member_mut(participant) else {
            return Err(RosterError::OperationFailed {
                participant: participant.to_string(),
                message: "not in roster".to_string(),
            });
        };
        member.leader = true;
        self.persist()
    }

    fn revoke_leader(&mut self, participant: &ParticipantId) -> Result<(), RosterError> {
        let Some(member) = self.member_mut(participant) else {
            return Err(RosterError::OperationFailed {
                participant: participant.to_string(),
                message: "not in roster".to_string(),
            });
        };
        member.leader = false;
        self.persist()
    }
}
