// ============================================================================
// WebMapper Library
// ============================================================================
//
// Data mapper for resources behind REST webservices: transfers are tracked
// by a unit of work, written back by a persister that orders related
// writes, and loaded as lazy proxies that fetch their relations on first
// access.
//
// ============================================================================

//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use webmapper::core::FieldType;
//! use webmapper::metadata::{MetadataRegistry, Resource, TransferMetadata};
//! use webmapper::webservice::ClientConfig;
//! use webmapper::{Transfer, TransferManager, TransferRef};
//!
//! # fn main() -> webmapper::Result<()> {
//! let metadata = MetadataRegistry::new()
//!     .with(
//!         TransferMetadata::builder("User", Resource::new("blog", "/users"))
//!             .id("id", FieldType::Integer)
//!             .field("name", FieldType::Text)
//!             .build()?,
//!     )?
//!     .with(
//!         TransferMetadata::builder("Post", Resource::new("blog", "/posts"))
//!             .id("id", FieldType::Integer)
//!             .field("title", FieldType::Text)
//!             .field("author_id", FieldType::Integer)
//!             .belongs_to("author", "User", "author_id")
//!             .build()?,
//!     )?;
//!
//! let manager = TransferManager::builder()
//!     .with_metadata(Arc::new(metadata))
//!     .with_client_config("blog", ClientConfig::new("http://localhost:8080"))?
//!     .build()?;
//!
//! let author = TransferRef::new(Transfer::new("User").with("name", "ann"));
//! let post = TransferRef::new(Transfer::new("Post").with("title", "hello").with_one("author", &author));
//! manager.persist(&post)?;
//! manager.flush()?;
//!
//! let loaded = manager.find("Post", 1)?;
//! if let Some(post) = loaded {
//!     let author = post.related("author")?;
//!     println!("{:?}", author.map(|user| user.get("name")));
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod event;
pub mod manager;
pub mod metadata;
pub mod persister;
pub mod prelude;
pub mod proxy;
pub mod storage;
pub mod transaction;
pub mod transfer;
pub mod unit_of_work;
pub mod webservice;

#[cfg(test)]
mod testing;

pub use core::{FieldType, MapperError, Result, Value, WebserviceResponseError};
pub use event::{EventDispatcher, EventListener, LifecycleEvent, PersistenceEvent};
pub use manager::{TransferManager, TransferManagerBuilder, TransferManagerRegistry, TransferRepository};
pub use metadata::{MetadataProvider, MetadataRegistry, TransferMetadata};
pub use proxy::ProxyFactory;
pub use transfer::{Transfer, TransferCollection, TransferRef};
pub use unit_of_work::UnitOfWork;
pub use webservice::{ClientConfig, ClientRegistry, Criteria, HttpWebserviceClient, WebserviceClient};
