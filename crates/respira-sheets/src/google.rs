use crate::appender::RowAppender;
use async_trait::async_trait;
use respira_core::{RespiraError, RespiraResult};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Google Sheets destination.
///
/// Appends rows via the `values:append` REST call with the
/// `USER_ENTERED` input option, so formula cells (the user hyperlink)
/// are interpreted by the sheet. Credential acquisition is not this
/// client's concern; it consumes a pre-issued bearer token.
pub struct SheetsClient {
    name: String,
    spreadsheet_id: String,
    access_token: String,
    base_url: String,
    client: reqwest::Client,
}

// ── Sheets API request/response types ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct AppendRequest<'a> {
    values: [&'a [String]; 1],
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
struct AppendUpdates {
    #[serde(rename = "updatedRange")]
    updated_range: Option<String>,
}

// ── Implementation ──────────────────────────────────────────────────────────

impl SheetsClient {
    /// Creates a client for one destination spreadsheet.
    ///
    /// * `name` – Destination name used in logs.
    /// * `spreadsheet_id` – The spreadsheet to append into.
    /// * `access_token` – Bearer token with spreadsheet write scope.
    pub fn new(
        name: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn append_url(&self, sheet: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}!A1:append",
            self.base_url, self.spreadsheet_id, sheet
        )
    }
}

#[async_trait]
impl RowAppender for SheetsClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&self, sheet: &str, row: &[String]) -> RespiraResult<()> {
        let payload = AppendRequest { values: [row] };

        let response = self
            .client
            .post(self.append_url(sheet))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RespiraError::Sheets(format!("Sheets append error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RespiraError::Sheets(format!(
                "Sheets append failed ({status}): {body}"
            )));
        }

        let body: AppendResponse = response
            .json()
            .await
            .map_err(|e| RespiraError::Sheets(format!("Sheets parse error: {e}")))?;

        tracing::debug!(
            destination = %self.name,
            range = body
                .updates
                .and_then(|u| u.updated_range)
                .unwrap_or_default(),
            "Row appended"
        );
        Ok(())
    }
}
