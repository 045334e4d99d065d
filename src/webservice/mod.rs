// ============================================================================
// Webservice Layer
// ============================================================================
//
// Everything that talks to the remote side: the `WebserviceClient` contract
// used by the persister and repositories, its HTTP implementation, the JSON
// serializer, criteria requests and the transports behind client names.
//
// ============================================================================

pub mod client;
pub mod config;
pub mod criteria;
pub mod registry;
pub mod serializer;
pub mod transport;

pub use client::{CriteriaResult, HttpWebserviceClient, WebserviceClient};
pub use config::ClientConfig;
pub use criteria::{Criteria, OperationType};
pub use registry::ClientRegistry;
pub use serializer::Serializer;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
