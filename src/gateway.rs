use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ClientError;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Result of `/parse-template`: the raw variable schema plus the server-side
/// session filename to reference in later `/generate` calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedTemplate {
    pub variables: Value,
    pub template_file: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// One entry of the saved-template library.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: String,
}

/// A saved template fetched back from the library.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDetail {
    pub template_file: String,
    pub variables: Value,
    pub name: String,
}

/// One entry of the generated-document history.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub output_filename: String,
    #[serde(default)]
    pub template_name: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// The JSON payload a past document was generated from.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryData {
    pub json_data: Value,
    pub output_filename: String,
    #[serde(default)]
    pub template_name: Option<String>,
    pub created_at: String,
}

/// Which template a `/generate` call should use: a fresh local upload or the
/// file already saved in the server session by `/parse-template`.
#[derive(Debug, Clone)]
pub enum TemplateRef {
    Upload { filename: String, bytes: Vec<u8> },
    Session(String),
}

/// Thin request/response layer over the backend.
///
/// Every method maps to exactly one endpoint. A 401 anywhere becomes
/// `AuthExpired` with a `/login?next=...` redirect target; a `success: false`
/// body becomes `Server` with the server's `error` string verbatim;
/// transport failures become `Network`.
pub struct RemoteGateway {
    client: Client,
    base_url: String,
    /// Page path carried as the `next` target when a 401 forces a login
    /// redirect
    page_path: String,
}

impl RemoteGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        RemoteGateway {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_path: "/".to_string(),
        }
    }

    /// Sets the page path used for the 401 redirect target.
    pub fn with_page_path(mut self, path: impl Into<String>) -> Self {
        self.page_path = path.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Uploads a template and returns the extracted variable schema.
    pub async fn parse_template(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ParsedTemplate, ClientError> {
        debug!("parse-template: {} ({} bytes)", filename, bytes.len());
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(DOCX_MIME)
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let form = Form::new().part("template", part);

        let response = self
            .client
            .post(self.url("/parse-template"))
            .multipart(form)
            .send()
            .await?;
        let body = self.expect_envelope(response).await?;
        from_body(body)
    }

    /// Requests document generation and returns the output filename.
    pub async fn generate(
        &self,
        template: TemplateRef,
        data_json: &str,
    ) -> Result<String, ClientError> {
        let mut form = Form::new().text("data", data_json.to_string());
        match template {
            TemplateRef::Upload { filename, bytes } => {
                debug!("generate: uploading {} ({} bytes)", filename, bytes.len());
                let part = Part::bytes(bytes)
                    .file_name(filename)
                    .mime_str(DOCX_MIME)
                    .map_err(|e| ClientError::Network(e.to_string()))?;
                form = form.part("template", part);
            }
            TemplateRef::Session(template_file) => {
                debug!("generate: reusing session file {}", template_file);
                form = form.text("template_file", template_file);
            }
        }

        let response = self
            .client
            .post(self.url("/generate"))
            .multipart(form)
            .send()
            .await?;
        let body = self.expect_envelope(response).await?;
        body.get("filename")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Server("Response carried no filename".to_string()))
    }

    /// Fetches a generated file by name.
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>, ClientError> {
        self.fetch_binary(&format!("/download/{}", filename)).await
    }

    /// Lists the saved-template library.
    pub async fn list_templates(&self) -> Result<Vec<TemplateSummary>, ClientError> {
        let response = self.client.get(self.url("/templates")).send().await?;
        let body = self.expect_envelope(response).await?;
        from_field(body, "templates")
    }

    /// Fetches one saved template, schema included.
    pub async fn get_template(&self, id: i64) -> Result<TemplateDetail, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/templates/{}", id)))
            .send()
            .await?;
        let body = self.expect_envelope(response).await?;
        from_body(body)
    }

    /// Persists the current session template under a name.
    pub async fn save_template(
        &self,
        template_file: &str,
        name: &str,
        description: &str,
    ) -> Result<(), ClientError> {
        let form = Form::new()
            .text("template_file", template_file.to_string())
            .text("name", name.to_string())
            .text("description", description.to_string());
        let response = self
            .client
            .post(self.url("/templates/save"))
            .multipart(form)
            .send()
            .await?;
        self.expect_envelope(response).await.map(|_| ())
    }

    /// Removes a saved template.
    pub async fn delete_template(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/templates/{}", id)))
            .send()
            .await?;
        self.expect_envelope(response).await.map(|_| ())
    }

    /// Lists the most recent generated documents.
    pub async fn list_history(&self, limit: u32) -> Result<Vec<HistoryEntry>, ClientError> {
        let response = self
            .client
            .get(self.url("/history"))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body = self.expect_envelope(response).await?;
        from_field(body, "documents")
    }

    /// Fetches a past generated document.
    pub async fn download_history_entry(&self, id: i64) -> Result<Vec<u8>, ClientError> {
        self.fetch_binary(&format!("/history/{}/download", id)).await
    }

    /// Fetches the JSON a past document was generated from.
    pub async fn get_history_data(&self, id: i64) -> Result<HistoryData, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/history/{}/data", id)))
            .send()
            .await?;
        let body = self.expect_envelope(response).await?;
        from_body(body)
    }

    /// Removes one history entry.
    pub async fn delete_history_entry(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/history/{}", id)))
            .send()
            .await?;
        self.expect_envelope(response).await.map(|_| ())
    }

    async fn fetch_binary(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::auth_expired(&self.page_path));
        }
        if !status.is_success() {
            // error bodies on binary endpoints are still JSON envelopes
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(envelope_error(&body));
        }
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Applies the shared response contract: 401 first, then the JSON
    /// envelope's `success` flag.
    async fn expect_envelope(&self, response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::auth_expired(&self.page_path));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        check_envelope(status.is_success(), body)
    }
}

/// Checks the `{success, error?}` envelope shared by all JSON endpoints.
pub fn check_envelope(http_ok: bool, body: Value) -> Result<Value, ClientError> {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    if http_ok && success {
        Ok(body)
    } else {
        Err(envelope_error(&body))
    }
}

fn envelope_error(body: &Value) -> ClientError {
    let msg = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    ClientError::Server(msg)
}

fn from_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    serde_json::from_value(body)
        .map_err(|e| ClientError::Server(format!("Unexpected response shape: {}", e)))
}

fn from_field<T: serde::de::DeserializeOwned>(
    mut body: Value,
    field: &str,
) -> Result<T, ClientError> {
    let value = body
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| ClientError::Server(format!("Response carried no {}", field)))?;
    serde_json::from_value(value)
        .map_err(|e| ClientError::Server(format!("Unexpected response shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_accepts_success() {
        let body = json!({"success": true, "filename": "filled_x.docx"});
        let out = check_envelope(true, body).unwrap();
        assert_eq!(out["filename"], "filled_x.docx");
    }

    #[test]
    fn envelope_surfaces_server_error_verbatim() {
        let body = json!({"success": false, "error": "Only .docx files are allowed"});
        match check_envelope(true, body) {
            Err(ClientError::Server(msg)) => {
                assert_eq!(msg, "Only .docx files are allowed")
            }
            other => panic!("expected server rejection, got {:?}", other),
        }
    }

    #[test]
    fn envelope_treats_missing_success_as_failure() {
        match check_envelope(true, json!({"filename": "x"})) {
            Err(ClientError::Server(msg)) => assert_eq!(msg, "Unknown error"),
            other => panic!("expected server rejection, got {:?}", other),
        }
    }

    #[test]
    fn envelope_rejects_http_failure_even_with_success_body() {
        assert!(check_envelope(false, json!({"success": true})).is_err());
    }

    #[test]
    fn urls_are_joined_without_double_slash() {
        let gw = RemoteGateway::new("http://127.0.0.1:5000/");
        assert_eq!(gw.url("/generate"), "http://127.0.0.1:5000/generate");
        assert_eq!(gw.url("/history/3/data"), "http://127.0.0.1:5000/history/3/data");
    }

    /// Serves exactly one canned HTTP response, then closes.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let mut total = 0;
                loop {
                    match sock.read(&mut buf[total..]).await {
                        Ok(0) => break,
                        Ok(n) => {
                            total += n;
                            if buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                            if total == buf.len() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn unauthorized_turns_into_login_redirect() {
        let addr = one_shot_server("401 Unauthorized", "{}").await;
        let gw = RemoteGateway::new(format!("http://{}", addr)).with_page_path("/current/path");
        match gw.list_templates().await {
            Err(ClientError::AuthExpired { next }) => {
                assert_eq!(next, "/login?next=%2Fcurrent%2Fpath")
            }
            other => panic!("expected auth expiry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejection_body_is_surfaced_verbatim() {
        let addr = one_shot_server(
            "400 Bad Request",
            "{\"success\": false, \"error\": \"Only .docx files are allowed\"}",
        )
        .await;
        let gw = RemoteGateway::new(format!("http://{}", addr));
        match gw.list_templates().await {
            Err(ClientError::Server(msg)) => assert_eq!(msg, "Only .docx files are allowed"),
            other => panic!("expected server rejection, got {:?}", other),
        }
    }

    #[test]
    fn list_shapes_deserialize() {
        let body = json!({
            "success": true,
            "templates": [
                {"id": 1, "name": "Invoice", "description": "monthly", "created_at": "2025-01-01T00:00:00"},
                {"id": 2, "name": "Contract", "created_at": "2025-02-01T00:00:00"},
            ],
        });
        let templates: Vec<TemplateSummary> = from_field(body, "templates").unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].name, "Invoice");
        assert_eq!(templates[1].description, None);

        let body = json!({
            "success": true,
            "documents": [{
                "id": 7,
                "output_filename": "filled_invoice.docx",
                "template_name": "Invoice",
                "created_at": "2025-03-01T10:00:00",
                "file_size": 2048,
            }],
        });
        let docs: Vec<HistoryEntry> = from_field(body, "documents").unwrap();
        assert_eq!(docs[0].file_size, Some(2048));
    }
}
