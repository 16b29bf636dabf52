// Durable local fallback for running without a hosted backend.
//
// Purpose
// - Keep pledges across restarts in a single JSON key-value document on disk.
//
// Responsibilities
// - Read the document once when opened.
// - Rewrite the document after every insert, keeping unrelated keys intact.
// - Tag the pledge records with a format version and refuse versions it does not know.
// - Accept the unversioned array written by earlier releases.
//
// No change feed: this backend has a single writer.

use crate::modules::pledges::core::errors::{QueryError, WriteError};
use crate::modules::pledges::core::pledge::{NewPledge, Pledge};
use crate::modules::pledges::core::ports::{PledgeOrder, PledgeRepository};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const RECORDS_KEY: &str = "pledge-records";
pub const RECORDS_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct VersionedRecords {
    version: u32,
    pledges: Vec<Pledge>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    id: String,
    name: String,
    monthly_amount: f64,
    timestamp: i64,
}

impl From<LegacyRecord> for Pledge {
    fn from(r: LegacyRecord) -> Self {
        Pledge {
            id: r.id,
            name: r.name,
            monthly_amount: r.monthly_amount,
            created_at: r.timestamp,
        }
    }
}

struct Document {
    entries: Map<String, Value>,
    pledges: Vec<Pledge>,
}

pub struct LocalFilePledgeRepository {
    path: PathBuf,
    document: Mutex<Document>,
}

impl LocalFilePledgeRepository {
    /// A missing file is an empty store; it is created on the first insert.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, QueryError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(entries)) => entries,
                Ok(_) => return Err(QueryError::Corrupt("document is not a JSON object".into())),
                Err(e) => return Err(QueryError::Corrupt(e.to_string())),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(QueryError::Backend(e.to_string())),
        };
        let pledges = match entries.get(RECORDS_KEY) {
            Some(value) => decode_records(value.clone())?,
            None => Vec::new(),
        };
        tracing::info!(path = %path.display(), count = pledges.len(), "local pledge records opened");
        Ok(Self {
            path,
            document: Mutex::new(Document { entries, pledges }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &Document) -> Result<(), WriteError> {
        let records = VersionedRecords {
            version: RECORDS_VERSION,
            pledges: document.pledges.clone(),
        };
        let mut entries = document.entries.clone();
        entries.insert(
            RECORDS_KEY.to_string(),
            serde_json::to_value(records).map_err(|e| WriteError::Backend(e.to_string()))?,
        );
        let text = serde_json::to_string_pretty(&Value::Object(entries))
            .map_err(|e| WriteError::Backend(e.to_string()))?;

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, text)
            .await
            .map_err(|e| WriteError::Backend(e.to_string()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| WriteError::Backend(e.to_string()))
    }
}

fn decode_records(value: Value) -> Result<Vec<Pledge>, QueryError> {
    match value {
        Value::Array(_) => {
            let legacy: Vec<LegacyRecord> =
                serde_json::from_value(value).map_err(|e| QueryError::Corrupt(e.to_string()))?;
            Ok(legacy.into_iter().map(Pledge::from).collect())
        }
        Value::Object(_) => {
            let records: VersionedRecords =
                serde_json::from_value(value).map_err(|e| QueryError::Corrupt(e.to_string()))?;
            if records.version > RECORDS_VERSION {
                return Err(QueryError::Corrupt(format!(
                    "unsupported records version {}",
                    records.version
                )));
            }
            Ok(records.pledges)
        }
        _ => Err(QueryError::Corrupt(format!("{RECORDS_KEY} has an unexpected shape"))),
    }
}

#[async_trait::async_trait]
impl PledgeRepository for LocalFilePledgeRepository {
    async fn list_pledges(
        &self,
        order: PledgeOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Pledge>, QueryError> {
        let document = self.document.lock().await;
        let mut items = match order {
            PledgeOrder::NewestFirst => {
                let mut items: Vec<Pledge> = document.pledges.iter().rev().cloned().collect();
                items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                items
            }
            PledgeOrder::InsertionOrder => document.pledges.clone(),
        };
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn insert_pledge(&self, pledge: NewPledge) -> Result<Pledge, WriteError> {
        if pledge.name.trim().is_empty() {
            return Err(WriteError::Rejected("name must not be empty".into()));
        }
        if !(pledge.monthly_amount.is_finite() && pledge.monthly_amount > 0.0) {
            return Err(WriteError::Rejected("monthly_amount must be positive".into()));
        }

        let stored = pledge.into_pledge(Uuid::now_v7().to_string(), Utc::now().timestamp_millis());
        let mut document = self.document.lock().await;
        document.pledges.push(stored.clone());
        if let Err(e) = self.persist(&document).await {
            document.pledges.pop();
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist pledge records");
            return Err(e);
        }
        Ok(stored)
    }
}
