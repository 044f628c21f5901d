pub mod model_client;
pub mod token;
pub mod vertex;

pub use model_client::{ModelClient, ModelRequest, RawPart};
pub use vertex::VertexClient;
