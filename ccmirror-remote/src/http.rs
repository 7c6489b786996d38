//! JSON-over-HTTP client for the remote mirror table.
//!
//! Endpoints, relative to `<url>/api/v1`:
//!
//! ```text
//! POST   /session                 login → {"token": "..."}
//! DELETE /session                 logout
//! POST   /tables/{table}/lock     lock (409 → {"locked_by": "..."})
//! POST   /tables/{table}/save     persist pending writes
//! DELETE /tables/{table}/lock     unlock
//! GET    /tables/{table}/rows     [{"id": "...", "fields": {...}}]
//! POST   /tables/{table}/rows     {"fields": {...}} → {"id": "..."}
//! PATCH  /tables/{table}/rows/{id} {"fields": {...}}
//! ```

use std::time::Duration;

use ccmirror_core::{Credentials, FieldSet, RemoteConfig, RemoteRow, RowId};
use serde::{Deserialize, Serialize};
use urlencoding::encode;

use crate::{RemoteApi, RemoteError};

const API_PREFIX: &str = "api/v1";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct LockConflict {
    locked_by: Option<String>,
}

#[derive(Serialize)]
struct RowWrite<'a> {
    fields: &'a FieldSet,
}

#[derive(Deserialize)]
struct CreatedRow {
    id: RowId,
}

struct Session {
    base: String,
    token: String,
}

pub struct HttpRemote {
    agent: ureq::Agent,
    table: String,
    session: Option<Session>,
}

impl HttpRemote {
    pub fn new(table: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            table: table.into(),
            session: None,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(
            config.table.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn session(&self) -> Result<&Session, RemoteError> {
        self.session.as_ref().ok_or(RemoteError::NotConnected)
    }

    fn table_url(&self, suffix: &str) -> Result<String, RemoteError> {
        let session = self.session()?;
        Ok(format!(
            "{}/tables/{}/{}",
            session.base,
            encode(&self.table),
            suffix
        ))
    }

    fn request(&self, method: &str, url: &str) -> Result<ureq::Request, RemoteError> {
        let session = self.session()?;
        Ok(self
            .agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", session.token)))
    }
}

impl RemoteApi for HttpRemote {
    fn login(&mut self, endpoint: &str, credentials: &Credentials) -> Result<(), RemoteError> {
        let base = api_base(endpoint);
        let response = self
            .agent
            .post(&format!("{base}/session"))
            .send_json(LoginRequest {
                username: &credentials.username,
                password: &credentials.password,
            })
            .map_err(map_ureq_error)?;
        let body: LoginResponse = response
            .into_json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        self.session = Some(Session {
            base,
            token: body.token,
        });
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    fn logout(&mut self) -> Result<(), RemoteError> {
        let url = format!("{}/session", self.session()?.base);
        let result = self.request("DELETE", &url)?.call();
        // The token is unusable either way once logout was attempted.
        self.session = None;
        result.map(|_| ()).map_err(map_ureq_error)
    }

    fn lock_table(&mut self) -> Result<(), RemoteError> {
        let url = self.table_url("lock")?;
        match self.request("POST", &url)?.call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(409, response)) => {
                let holder = response
                    .into_json::<LockConflict>()
                    .ok()
                    .and_then(|c| c.locked_by);
                Err(RemoteError::Locked { holder })
            }
            Err(err) => Err(map_ureq_error(err)),
        }
    }

    fn save_table(&mut self) -> Result<(), RemoteError> {
        let url = self.table_url("save")?;
        self.request("POST", &url)?
            .call()
            .map(|_| ())
            .map_err(map_ureq_error)
    }

    fn unlock_table(&mut self) -> Result<(), RemoteError> {
        let url = self.table_url("lock")?;
        self.request("DELETE", &url)?
            .call()
            .map(|_| ())
            .map_err(map_ureq_error)
    }

    fn read_rows(&mut self) -> Result<Vec<RemoteRow>, RemoteError> {
        let url = self.table_url("rows")?;
        self.request("GET", &url)?
            .call()
            .map_err(map_ureq_error)?
            .into_json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    fn create_row(&mut self, fields: &FieldSet) -> Result<RowId, RemoteError> {
        let url = self.table_url("rows")?;
        let created: CreatedRow = self
            .request("POST", &url)?
            .send_json(RowWrite { fields })
            .map_err(map_ureq_error)?
            .into_json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(created.id)
    }

    fn update_row(&mut self, id: &RowId, fields: &FieldSet) -> Result<(), RemoteError> {
        let url = self.table_url(&format!("rows/{}", encode(&id.0)))?;
        self.request("PATCH", &url)?
            .send_json(RowWrite { fields })
            .map(|_| ())
            .map_err(map_ureq_error)
    }
}

fn api_base(endpoint: &str) -> String {
    format!("{}/{API_PREFIX}", endpoint.trim_end_matches('/'))
}

fn map_ureq_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_string()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            RemoteError::Rejected { status, message }
        }
        ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_percent_encoded() {
        let mut remote = HttpRemote::new("Cost center mirror", Duration::from_secs(1));
        remote.session = Some(Session {
            base: api_base("https://x.test"),
            token: "t".into(),
        });
        assert_eq!(
            remote.table_url("rows").unwrap(),
            "https://x.test/api/v1/tables/Cost%20center%20mirror/rows"
        );
        assert_eq!(
            remote.table_url(&format!("rows/{}", encode("a/b"))).unwrap(),
            "https://x.test/api/v1/tables/Cost%20center%20mirror/rows/a%2Fb"
        );
    }

    #[test]
    fn row_write_uses_tagged_field_values() {
        let mut fields = FieldSet::new();
        fields.insert(
            "Status".to_string(),
            ccmirror_core::FieldValue::Text("active".into()),
        );
        let body = serde_json::to_value(RowWrite { fields: &fields }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"fields": {"Status": {"type": "text", "value": "active"}}})
        );
    }

    #[test]
    fn api_base_strips_trailing_slash() {
        assert_eq!(api_base("https://x.test/"), "https://x.test/api/v1");
        assert_eq!(api_base("https://x.test"), "https://x.test/api/v1");
    }

    #[test]
    fn calls_before_login_are_not_connected() {
        let mut remote = HttpRemote::new("Cost center mirror", Duration::from_secs(1));
        assert!(!remote.is_logged_in());
        assert_eq!(remote.lock_table(), Err(RemoteError::NotConnected));
        assert_eq!(remote.read_rows(), Err(RemoteError::NotConnected));
        assert_eq!(remote.logout(), Err(RemoteError::NotConnected));
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let mut remote = HttpRemote::new("t", Duration::from_millis(200));
        let creds = Credentials {
            username: "u".into(),
            password: "p".into(),
        };
        let err = remote.login("http://127.0.0.1:1", &creds).unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)), "got {err:?}");
        assert!(!remote.is_logged_in());
    }
}
