//! The typed request model consumed by the query engine: names, the selection tree handed
//! over by the transport layer, and the per-request authorization context.

mod names;
mod request;

pub use names::{FieldName, TypeName};
pub use request::{QueryRequest, RequestContext, SelectionField, TYPENAME_FIELD};
