use serde_json::Value as Json;
use std::sync::Arc;
use tracing::debug;

use super::{ClientRegistry, Criteria, HttpMethod, HttpRequest, HttpResponse, OperationType, Serializer};
use crate::core::{MapperError, Result, Value, WebserviceResponseError};
use crate::metadata::{MetadataProvider, TransferMetadata, parse_composite_id};
use crate::transfer::{Transfer, TransferRef};

/// Outcome of a criteria request, shaped by its operation type.
#[derive(Debug)]
pub enum CriteriaResult {
    Item(Option<Transfer>),
    Collection(Vec<Transfer>),
}

/// Remote operations on transfers. Every non-2xx answer surfaces as
/// `MapperError::Webservice`.
pub trait WebserviceClient {
    /// Single item by id. Composite ids (`a=1;b=2`) are looked up through a
    /// filtered collection request.
    fn get(&self, type_name: &str, id: &Value) -> Result<Option<Transfer>>;

    fn c_get(&self, type_name: &str, filters: &[(&str, Value)]) -> Result<Vec<Transfer>>;

    /// Creates the transfer and hydrates it with the response.
    fn post(&self, transfer: &TransferRef) -> Result<()>;

    /// Updates the transfer and hydrates it with the response.
    fn put(&self, transfer: &TransferRef) -> Result<()>;

    fn delete(&self, type_name: &str, id: &Value) -> Result<()>;

    fn get_by_criteria(&self, criteria: &Criteria, type_name: &str) -> Result<CriteriaResult>;
}

/// `WebserviceClient` speaking JSON over the registered HTTP transports.
pub struct HttpWebserviceClient {
    clients: ClientRegistry,
    metadata: Arc<dyn MetadataProvider>,
    serializer: Serializer,
}

impl HttpWebserviceClient {
    pub fn new(clients: ClientRegistry, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            clients,
            serializer: Serializer::new(metadata.clone()),
            metadata,
        }
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    fn send(&self, metadata: &TransferMetadata, request: HttpRequest) -> Result<HttpResponse> {
        let transport = self.clients.get(&metadata.resource.client)?;
        let uri = request.uri();

        debug!(
            client = %metadata.resource.client,
            method = %request.method,
            uri = %uri,
            "webservice request"
        );
        let response = transport.send(&request)?;
        debug!(status = response.status, uri = %uri, "webservice response");

        if response.status >= 300 {
            return Err(WebserviceResponseError::new(request.method.as_str(), uri, response.status)
                .with_reason(response.reason.clone())
                .with_raw_body(&response.body)
                .into());
        }
        Ok(response)
    }

    fn denormalize_list(&self, json: Option<Json>, type_name: &str) -> Result<Vec<Transfer>> {
        match json {
            None | Some(Json::Null) => Ok(Vec::new()),
            Some(Json::Array(items)) => items
                .iter()
                .map(|item| self.serializer.denormalize(item, type_name))
                .collect(),
            Some(other) => Err(MapperError::Serialization(format!(
                "expected a list of '{}', got {}",
                type_name, other
            ))),
        }
    }

    fn denormalize_item(&self, json: Option<Json>, type_name: &str) -> Result<Option<Transfer>> {
        match json {
            None | Some(Json::Null) => Ok(None),
            Some(json) => self.serializer.denormalize(&json, type_name).map(Some),
        }
    }

    fn write(&self, transfer: &TransferRef, method: HttpMethod) -> Result<()> {
        let (metadata, payload, path) = {
            let current = transfer.borrow();
            let metadata = self.metadata.metadata(current.type_name())?;
            let payload = self.serializer.normalize(&current)?;

            let path = match method {
                HttpMethod::Put => {
                    let id = metadata.id_value(&current)?;
                    if id.is_empty() {
                        return Err(MapperError::MissingIdValue(metadata.name.clone()));
                    }
                    metadata.resource.item_path(&id)
                }
                _ => metadata.resource.route.clone(),
            };
            (metadata, payload, path)
        };

        let response = self.send(&metadata, HttpRequest::new(method, path).json(payload))?;
        if let Some(json) = response.json()? {
            self.serializer.hydrate(&mut transfer.borrow_mut(), &json)?;
        }
        Ok(())
    }
}

impl WebserviceClient for HttpWebserviceClient {
    fn get(&self, type_name: &str, id: &Value) -> Result<Option<Transfer>> {
        if let Some(pairs) = id.as_str().and_then(parse_composite_id) {
            let filters: Vec<(&str, Value)> = pairs
                .iter()
                .map(|(name, value)| (name.as_str(), Value::Text(value.clone())))
                .collect();
            return Ok(self.c_get(type_name, &filters)?.into_iter().next());
        }

        let metadata = self.metadata.metadata(type_name)?;
        let response = self.send(&metadata, HttpRequest::get(metadata.resource.item_path(id)))?;
        self.denormalize_item(response.json()?, type_name)
    }

    fn c_get(&self, type_name: &str, filters: &[(&str, Value)]) -> Result<Vec<Transfer>> {
        let metadata = self.metadata.metadata(type_name)?;
        let request = filters
            .iter()
            .fold(HttpRequest::get(metadata.resource.route.clone()), |request, (name, value)| {
                request.query(*name, value.to_string())
            });

        let response = self.send(&metadata, request)?;
        self.denormalize_list(response.json()?, type_name)
    }

    fn post(&self, transfer: &TransferRef) -> Result<()> {
        self.write(transfer, HttpMethod::Post)
    }

    fn put(&self, transfer: &TransferRef) -> Result<()> {
        self.write(transfer, HttpMethod::Put)
    }

    fn delete(&self, type_name: &str, id: &Value) -> Result<()> {
        let metadata = self.metadata.metadata(type_name)?;
        if id.is_empty() {
            return Err(MapperError::MissingIdValue(type_name.to_string()));
        }

        let request = HttpRequest::new(HttpMethod::Delete, metadata.resource.item_path(id));
        self.send(&metadata, request)?;
        Ok(())
    }

    fn get_by_criteria(&self, criteria: &Criteria, type_name: &str) -> Result<CriteriaResult> {
        let metadata = self.metadata.metadata(type_name)?;
        let response = self.send(&metadata, criteria.create_request(&metadata))?;
        let json = response.json()?;

        Ok(match criteria.operation_type() {
            OperationType::Item => CriteriaResult::Item(self.denormalize_item(json, type_name)?),
            OperationType::Collection => {
                CriteriaResult::Collection(self.denormalize_list(json, type_name)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blog_metadata;
    use crate::webservice::HttpTransport;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Scripted {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<Vec<HttpResponse>>,
    }

    impl Scripted {
        fn reply(self, response: HttpResponse) -> Self {
            self.responses.lock().unwrap().push(response);
            self
        }
    }

    impl HttpTransport for Scripted {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            Ok(if responses.is_empty() {
                HttpResponse::new(204, "")
            } else {
                responses.remove(0)
            })
        }
    }

    fn client(transport: Arc<Scripted>) -> HttpWebserviceClient {
        HttpWebserviceClient::new(ClientRegistry::new().with("blog", transport), blog_metadata())
    }

    #[test]
    fn test_get_item() {
        let transport = Arc::new(
            Scripted::default().reply(HttpResponse::with_json(200, &json!({"id": 1, "title": "a"}))),
        );
        let post = client(transport.clone()).get("Post", &Value::Integer(1)).unwrap().unwrap();

        assert_eq!(post.get("title"), &Value::Text("a".into()));
        assert_eq!(transport.requests.lock().unwrap()[0].uri(), "/posts/1");
    }

    #[test]
    fn test_composite_get_uses_filtered_collection() {
        let transport = Arc::new(Scripted::default().reply(HttpResponse::with_json(
            200,
            &json!([{"x": 1, "y": 2, "name": "first"}, {"x": 1, "y": 2, "name": "second"}]),
        )));
        let cell = client(transport.clone())
            .get("Cell", &Value::Text("x=1;y=2".into()))
            .unwrap()
            .unwrap();

        assert_eq!(cell.get("name"), &Value::Text("first".into()));
        assert_eq!(transport.requests.lock().unwrap()[0].uri(), "/cells?x=1&y=2");
    }

    #[test]
    fn test_post_hydrates_response() {
        let transport = Arc::new(Scripted::default().reply(HttpResponse::with_json(201, &json!({"id": 42}))));
        let post = TransferRef::new(Transfer::new("Post").with("title", "new"));
        client(transport.clone()).post(&post).unwrap();

        assert_eq!(post.get("id"), Value::Integer(42));
        let request = transport.requests.lock().unwrap()[0].clone();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/posts");
        assert_eq!(request.body.unwrap()["title"], json!("new"));
    }

    #[test]
    fn test_put_requires_id() {
        let transport = Arc::new(Scripted::default());
        let post = TransferRef::new(Transfer::new("Post"));
        let err = client(transport).put(&post).unwrap_err();
        assert!(matches!(err, MapperError::MissingIdValue(_)));
    }

    #[test]
    fn test_error_status_is_reported() {
        let transport = Arc::new(Scripted::default().reply(HttpResponse::with_json(
            422,
            &json!({"title": "required"}),
        )));
        let post = TransferRef::new(Transfer::new("Post").with("id", 1));
        let err = client(transport).put(&post).unwrap_err();

        match err {
            MapperError::Webservice(response) => {
                assert_eq!(response.status(), 422);
                assert_eq!(response.method, "PUT");
                assert_eq!(response.path, "/posts/1");
                assert_eq!(response.body, Some(json!({"title": "required"})));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_criteria_item_and_collection() {
        let transport = Arc::new(
            Scripted::default()
                .reply(HttpResponse::with_json(200, &json!({"id": 1})))
                .reply(HttpResponse::with_json(200, &json!([{"id": 1}, {"id": 2}]))),
        );
        let client = client(transport);

        let item = Criteria::new().with_operation_type(OperationType::Item);
        assert!(matches!(
            client.get_by_criteria(&item, "Post").unwrap(),
            CriteriaResult::Item(Some(_))
        ));
        match client.get_by_criteria(&Criteria::new(), "Post").unwrap() {
            CriteriaResult::Collection(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
