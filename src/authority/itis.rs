//! ITIS SOAP web service client (`searchByScientificName`).
use crate::authority::{Authority, NameMatch, Source};
use crate::config::ItisConfig;
use crate::error::{CrateError, Result};
use async_trait::async_trait;
use log::debug;

const SERVICE: &str = "ITIS";
// closing half of a taxonomic serial number element, e.g. `<ax21:tsn>`
const TSN_MARKER: &str = "tsn>";

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn build_envelope(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:itis="http://itis_service.itis.usgs.gov">
  <soapenv:Header/>
  <soapenv:Body>
    <itis:searchByScientificName>
      <itis:srchKey>{}</itis:srchKey>
    </itis:searchByScientificName>
  </soapenv:Body>
</soapenv:Envelope>"#,
        escape_xml(name)
    )
}

/// Best-effort: the body mentions a TSN element anywhere.
fn body_has_tsn(body: &str) -> bool {
    body.split_whitespace()
        .any(|token| token.to_ascii_lowercase().contains(TSN_MARKER))
}

pub struct ItisClient {
    client: reqwest::Client,
    config: ItisConfig,
}

impl ItisClient {
    pub fn new(client: reqwest::Client, config: ItisConfig) -> Self {
        Self { client, config }
    }

    pub async fn search_scientific_name(&self, name: &str) -> Result<bool> {
        debug!("Querying ITIS for {}", name);
        let response = self
            .client
            .post(&self.config.url)
            .timeout(self.config.endpoint().timeout())
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "")
            .body(build_envelope(name))
            .send()
            .await
            .map_err(CrateError::ApiRequestError)?;

        if !response.status().is_success() {
            return Err(CrateError::ApiStatusError {
                service: SERVICE,
                status: response.status(),
            });
        }

        let body = response.text().await.map_err(CrateError::ApiRequestError)?;
        Ok(body_has_tsn(&body))
    }
}

#[async_trait]
impl Authority for ItisClient {
    fn source(&self) -> Source {
        Source::LookupB
    }

    async fn attempt(&self, name: &str) -> Result<Option<NameMatch>> {
        let found = self.search_scientific_name(name).await?;
        Ok(found.then(|| NameMatch::confirmed(name, Source::LookupB)))
    }
}
