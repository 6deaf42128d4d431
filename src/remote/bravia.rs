//! Sony Bravia remote control over the TV's HTTP API
//!
//! Button presses are IRCC codes posted as SOAP to `/sony/IRCC`; the code
//! table comes from `getRemoteControllerInfo` on `/sony/system` and is fetched
//! once per session. Input switching is a `setPlayContent` JSON-RPC call on
//! `/sony/avContent`. Every request carries the pre-shared key.

use super::{RemoteAction, RemoteControl};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

const PSK_HEADER: &str = "X-Auth-PSK";
const SOAP_ACTION: &str = "\"urn:schemas-sony-com:service:IRCC:1#X_SendIRCC\"";

/// Request id of the content-selection call
const PLAY_CONTENT_ID: u32 = 101;
const CONTROLLER_INFO_ID: u32 = 10;

#[derive(Debug, Serialize)]
struct RpcRequest<P: Serialize> {
    method: &'static str,
    id: u32,
    params: Vec<P>,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ContentUri<'a> {
    uri: &'a str,
}

/// Fail on a JSON-RPC `error` member
fn check_rpc(body: &serde_json::Value) -> Result<()> {
    match body.get("error") {
        Some(err) => Err(anyhow!("TV returned error: {}", err)),
        None => Ok(()),
    }
}

/// Extract `name -> code` from a `getRemoteControllerInfo` result
fn parse_controller_info(body: &serde_json::Value) -> Result<HashMap<String, String>> {
    check_rpc(body)?;

    let codes = body
        .get("result")
        .and_then(|r| r.get(1))
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow!("Malformed remote controller info"))?;

    Ok(codes
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let value = entry.get("value")?.as_str()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect())
}

fn ircc_envelope(code: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\"?>",
            "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" ",
            "s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">",
            "<s:Body>",
            "<u:X_SendIRCC xmlns:u=\"urn:schemas-sony-com:service:IRCC:1\">",
            "<IRCCCode>{}</IRCCCode>",
            "</u:X_SendIRCC>",
            "</s:Body>",
            "</s:Envelope>"
        ),
        code
    )
}

/// Resolve an action to its IRCC code; sets without `PowerOn` wake via `WakeUp`
fn lookup_code<'a>(codes: &'a HashMap<String, String>, action: RemoteAction) -> Result<&'a str> {
    let name = action.name();
    let found = codes.get(&name).or_else(|| match action {
        RemoteAction::PowerOn => codes.get("WakeUp").or_else(|| codes.get("TvPower")),
        _ => None,
    });

    found
        .map(String::as_str)
        .ok_or_else(|| anyhow!("TV has no IRCC code for {}", name))
}

/// Remote-control session for one Bravia TV
pub struct BraviaRemote {
    base_url: String,
    psk: String,
    http: reqwest::Client,
    codes: OnceCell<HashMap<String, String>>,
}

impl BraviaRemote {
    /// Create a session for the TV at `address` (host or host:port)
    pub fn new(address: &str, psk: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: format!("http://{}", address.trim_end_matches('/')),
            psk: psk.into(),
            http,
            codes: OnceCell::new(),
        })
    }

    async fn post_rpc<P: Serialize + Send + Sync>(
        &self,
        service: &str,
        request: &RpcRequest<P>,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/sony/{}", self.base_url, service);
        let response = self
            .http
            .post(&url)
            .header(PSK_HEADER, &self.psk)
            .json(request)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("POST {} returned {}", url, status));
        }

        let body: serde_json::Value = response.json().await?;
        check_rpc(&body)?;
        Ok(body)
    }

    async fn codes(&self) -> Result<&HashMap<String, String>> {
        self.codes
            .get_or_try_init(|| async {
                let request: RpcRequest<serde_json::Value> = RpcRequest {
                    method: "getRemoteControllerInfo",
                    id: CONTROLLER_INFO_ID,
                    params: vec![],
                    version: "1.0",
                };
                let body = self.post_rpc("system", &request).await?;
                let codes = parse_controller_info(&body)?;
                debug!("Loaded {} IRCC codes", codes.len());
                Ok(codes)
            })
            .await
    }
}

#[async_trait]
impl RemoteControl for BraviaRemote {
    async fn send_action(&self, action: RemoteAction) -> Result<()> {
        let code = lookup_code(self.codes().await?, action)?.to_string();
        let url = format!("{}/sony/IRCC", self.base_url);

        let response = self
            .http
            .post(&url)
            .header(PSK_HEADER, &self.psk)
            .header("SOAPACTION", SOAP_ACTION)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .body(ircc_envelope(&code))
            .send()
            .await
            .with_context(|| format!("IRCC {} failed", action))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("IRCC {} returned {}", action, status));
        }
        Ok(())
    }

    async fn select_content(&self, uri: &str) -> Result<()> {
        let request = RpcRequest {
            method: "setPlayContent",
            id: PLAY_CONTENT_ID,
            params: vec![ContentUri { uri }],
            version: "1.0",
        };
        let body = self.post_rpc("avContent", &request).await?;
        debug!("setPlayContent response: {}", body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Bravia"
    }
}
