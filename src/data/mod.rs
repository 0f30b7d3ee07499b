//! Datasets and the loaders that read them.

pub mod dataset;
pub mod loaders;

pub use dataset::{Dataset, ID_FIELD};
pub use loaders::{DataLoader, FeatureVectorLoader, JsonLoader, DATA_FIELD};

use crate::error::Result;
use crate::registry::{DataLoaderRegistry, RegistryBuilder};

/// Registry holding every built-in data loader.
pub fn default_loaders() -> Result<DataLoaderRegistry> {
    let mut builder: RegistryBuilder<dyn DataLoader> = RegistryBuilder::new("data loader");
    builder.register(FeatureVectorLoader::NAME, Box::new(FeatureVectorLoader))?;
    builder.register(JsonLoader::NAME, Box::new(JsonLoader))?;
    Ok(builder.build())
}
