// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # modelgate Providers
//!
//! Provider resolution and model catalogs for the modelgate gateway.
//!
//! This crate turns provider configuration into request-ready models:
//!
//! - **Adapters**: A closed set of adapter kinds plus a generic fallback
//! - **Resolution**: The explicit / legacy / convention / fallback cascade
//! - **Registry**: Cached model-to-provider mapping and provider instances
//! - **Catalog**: Validated visible/default/system models per usage type
//!
//! ## Adapters
//!
//! | Kind | Builtin client |
//! |------|----------------|
//! | OpenAI | Generic (chat completions) |
//! | Anthropic | Generic (compatibility endpoint) |
//! | GWDG | Generic |
//! | Open WebUI | Generic |
//! | Ollama, Google, Vertex AI, Hugging Face, Cohere | Register your own |
//! | Generic | Generic (fallback) |
//!
//! ## Usage
//!
//! ```ignore
//! use modelgate_providers::{ModelCatalog, ProviderRegistry};
//! use modelgate_core::UsageType;
//!
//! let registry = Arc::new(ProviderRegistry::with_builtin_adapters(source, &cache));
//! let catalog = ModelCatalog::new(registry, &cache);
//!
//! let model = catalog.model_or_fail("gpt-4o", UsageType::Default).await?;
//! let client = model.client().await?;
//! let response = client.send_request(&request).await;
//! ```

pub mod adapter;
pub mod catalog;
pub mod error;
pub mod generic;
pub mod provider;
pub mod registry;
pub mod resolution;
pub mod table;

pub use adapter::{AdapterKind, conventional_adapter_name};
pub use catalog::{
    AvailableModelCatalog, AvailableModelsBuilder, CatalogEntry, CatalogSummary, ModelCatalog,
    ModelContext,
};
pub use error::{CatalogError, MissingModel, RegistryError};
pub use generic::GenericClient;
pub use provider::Provider;
pub use registry::{ModelMappings, ProviderRegistry};
pub use resolution::{AdapterResolution, AdapterResolver, ResolutionAttempt, ResolutionStep};
pub use table::{AdapterTable, ClientConstructor};
