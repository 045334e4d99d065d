pub mod error;
pub mod types;
pub mod value;

pub use error::{MapperError, Result, WebserviceResponseError};
pub use types::FieldType;
pub use value::Value;
