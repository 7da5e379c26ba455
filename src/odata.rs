//! OData v2 client for the book entity set.

use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::RemoteError,
    query::Query,
    traits::BookEndpoint,
    types::book::{Book, IdentityPath},
};

const CSRF_HEADER: &str = "X-CSRF-Token";

/// HTTP verb used for updates. Gateways that only accept partial updates
/// want `MERGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    #[default]
    Put,
    Merge,
}

impl UpdateMethod {
    fn method(&self) -> Method {
        match self {
            UpdateMethod::Put => Method::PUT,
            UpdateMethod::Merge => Method::from_bytes(b"MERGE").unwrap_or(Method::PATCH),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    d: T,
}

#[derive(Deserialize)]
struct Collection<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: ErrorMessage,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    Simple(String),
    Localized { value: String },
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, RemoteError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    Ok(serde_path_to_error::deserialize(de)?)
}

/// Pulls the human readable message out of an OData error body, falling back
/// to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.message {
            ErrorMessage::Simple(message) => message,
            ErrorMessage::Localized { value } => value,
        },
        Err(_) if body.trim().is_empty() => "no details".into(),
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

pub struct ODataClient {
    client:        reqwest::Client,
    service_url:   Url,
    entity_set:    String,
    username:      Option<String>,
    password:      Option<String>,
    sap_client:    Option<String>,
    update_method: UpdateMethod,
    csrf_token:    Mutex<Option<String>>,
}

impl ODataClient {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let mut service_url = config.service_url.trim().to_string();
        if !service_url.ends_with('/') {
            service_url.push('/');
        }
        let service_url =
            Url::parse(&service_url).map_err(|e| RemoteError::Url(format!("{service_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()?;
        Ok(Self {
            client,
            service_url,
            entity_set: config.entity_set.clone(),
            username: config.username.clone().filter(|s| !s.is_empty()),
            password: config.password.clone(),
            sap_client: config.sap_client.clone().filter(|s| !s.is_empty()),
            update_method: config.update_method,
            csrf_token: Mutex::new(None),
        })
    }

    /// Service URL with `segment` appended as a single, percent-encoded path
    /// segment.
    fn url(&self, segment: &str) -> Result<Url, RemoteError> {
        let mut url = self.service_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Url(format!("{} cannot be a base", self.service_url)))?
            .pop_if_empty()
            .push(segment);
        url.query_pairs_mut().append_pair("$format", "json");
        if let Some(sap_client) = &self.sap_client {
            url.query_pairs_mut().append_pair("sap-client", sap_client);
        }
        Ok(url)
    }

    pub fn collection_url(&self, query: &Query) -> Result<Url, RemoteError> {
        let mut url = self.url(&self.entity_set)?;
        if let Some(filter) = query.filter_expression() {
            url.query_pairs_mut().append_pair("$filter", &filter);
        }
        if let Some(order) = query.order_expression() {
            url.query_pairs_mut().append_pair("$orderby", &order);
        }
        Ok(url)
    }

    pub fn entity_url(&self, path: &IdentityPath) -> Result<Url, RemoteError> {
        self.url(&path.to_string())
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_ref()),
            None => request,
        }
    }

    async fn fetch_csrf_token(&self) -> Result<Option<String>, RemoteError> {
        let url = self.url("")?;
        debug!("Fetching CSRF token from {}", url);
        let response = self
            .request(Method::GET, url)
            .header(CSRF_HEADER, "Fetch")
            .send()
            .await?;
        Ok(response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }

    async fn csrf_token(&self) -> Result<Option<String>, RemoteError> {
        let mut cached = self.csrf_token.lock().await;
        if cached.is_none() {
            *cached = self.fetch_csrf_token().await?;
        }
        Ok(cached.clone())
    }

    async fn send_modifying(
        &self,
        method: Method,
        url: Url,
        body: Option<&Book>,
    ) -> Result<(), RemoteError> {
        let mut refreshed = false;
        loop {
            let mut request = self.request(method.clone(), url.clone());
            if let Some(token) = self.csrf_token().await? {
                request = request.header(CSRF_HEADER, token);
            }
            if let Some(book) = body {
                request = request.json(book);
            }
            debug!("{} {}", method, url);
            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let token_rejected = status == StatusCode::FORBIDDEN
                && response
                    .headers()
                    .get(CSRF_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|value| value.eq_ignore_ascii_case("required"));
            if token_rejected && !refreshed {
                warn!("CSRF token expired, fetching a new one");
                *self.csrf_token.lock().await = None;
                refreshed = true;
                continue;
            }
            let text = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status,
                message: error_message(&text),
            });
        }
    }
}

impl BookEndpoint for ODataClient {
    fn entity_set(&self) -> &str {
        &self.entity_set
    }

    async fn query(&self, query: &Query) -> Result<Vec<Book>, RemoteError> {
        let url = self.collection_url(query)?;
        debug!("GET {}", url);
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status,
                message: error_message(&text),
            });
        }
        let envelope: Envelope<Collection<Book>> = decode(&text)?;
        info!("Loaded {} books", envelope.d.results.len());
        Ok(envelope.d.results)
    }

    async fn create(&self, book: &Book) -> Result<(), RemoteError> {
        let url = self.url(&self.entity_set)?;
        self.send_modifying(Method::POST, url, Some(book)).await
    }

    async fn update(&self, path: &IdentityPath, book: &Book) -> Result<(), RemoteError> {
        let url = self.entity_url(path)?;
        self.send_modifying(self.update_method.method(), url, Some(book))
            .await
    }

    async fn delete(&self, path: &IdentityPath) -> Result<(), RemoteError> {
        let url = self.entity_url(path)?;
        self.send_modifying(Method::DELETE, url, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Filter, SortKey};

    fn client() -> ODataClient {
        let config = Config {
            service_url: "https://gateway.example.com/sap/opu/odata/SAP/Z801_BOOKLIST_DARU_SRV"
                .into(),
            sap_client: Some("100".into()),
            ..Config::default()
        };
        ODataClient::new(&config).unwrap()
    }

    #[test]
    fn entity_url_keeps_service_path() {
        let client = client();
        let path = IdentityPath::new("Z801_book_entity_daruSet", "9780140449136");
        let url = client.entity_url(&path).unwrap();
        assert_eq!(
            url.path(),
            "/sap/opu/odata/SAP/Z801_BOOKLIST_DARU_SRV/Z801_book_entity_daruSet('9780140449136')"
        );
        assert_eq!(url.query(), Some("%24format=json&sap-client=100"));
    }

    #[test]
    fn entity_url_encodes_key() {
        let client = client();
        let path = IdentityPath::new("Z801_book_entity_daruSet", "12#3/4?5");
        let url = client.entity_url(&path).unwrap();
        assert_eq!(
            url.path(),
            "/sap/opu/odata/SAP/Z801_BOOKLIST_DARU_SRV/Z801_book_entity_daruSet('12%233%2F4%3F5')"
        );
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("%24format=json&sap-client=100"));
    }

    #[test]
    fn service_document_url() {
        let url = client().url("").unwrap();
        assert_eq!(url.path(), "/sap/opu/odata/SAP/Z801_BOOKLIST_DARU_SRV/");
    }

    #[test]
    fn collection_url_carries_filter_and_order() {
        let client = client();
        let query = Query {
            filters:  vec![Filter::TitleContains("War".into())],
            order_by: Some((SortKey::Title, false)),
        };
        let url = client.collection_url(&query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("$filter".into(), "substringof('War',Title)".into())));
        assert!(pairs.contains(&("$orderby".into(), "Title asc".into())));
    }

    #[test]
    fn decodes_collection_envelope() {
        let body = r#"{"d":{"results":[{"__metadata":{"type":"Z801.Book"},
            "Isbn":"9780140449136","Title":"Meditations","Author":"Marcus Aurelius",
            "Language":"English","DatePublished":"/Date(946684800000)/",
            "Totalbooks":5,"Availbooks":3}]}}"#;
        let envelope: Envelope<Collection<Book>> = decode(body).unwrap();
        assert_eq!(envelope.d.results.len(), 1);
        assert_eq!(envelope.d.results[0].date_published.to_display(), "01/01/2000");
    }

    #[test]
    fn decode_error_names_the_field() {
        let body = r#"{"d":{"results":[{"Isbn":"1","Title":"T","Author":"A",
            "Language":"EN","DatePublished":"/Date(0)/","Totalbooks":"five","Availbooks":1}]}}"#;
        let err = decode::<Envelope<Collection<Book>>>(body).err().unwrap();
        match err {
            RemoteError::Decode(e) => assert_eq!(e.path().to_string(), "d.results[0].Totalbooks"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn extracts_gateway_error_message() {
        let body = r#"{"error":{"code":"SY/530","message":{"lang":"en","value":"Book already exists"}}}"#;
        assert_eq!(error_message(body), "Book already exists");
        assert_eq!(error_message(""), "no details");
    }
}
