//! Built-in novelty detection algorithms.

pub mod base_model;
pub mod demud;
pub mod iforest;
pub mod knn;
pub mod loda;
pub mod negative_sampling;
pub mod pca;
pub mod random;
pub mod rx;

pub use base_model::{BaseModel, DetectionInput, OutlierDetection};
pub use demud::DemudOutlierDetection;
pub use iforest::IForestOutlierDetection;
pub use knn::KnnOutlierDetection;
pub use loda::LodaOutlierDetection;
pub use negative_sampling::NegativeSamplingOutlierDetection;
pub use pca::PcaOutlierDetection;
pub use random::RandomOutlierDetection;
pub use rx::RxOutlierDetection;

use crate::error::Result;
use crate::registry::{AlgorithmRegistry, RegistryBuilder};

/// Register every built-in algorithm in `builder`.
pub fn register_algorithms(builder: &mut RegistryBuilder<dyn OutlierDetection>) -> Result<()> {
    let algorithms: Vec<Box<dyn OutlierDetection>> = vec![
        Box::new(DemudOutlierDetection),
        Box::new(IForestOutlierDetection),
        Box::new(KnnOutlierDetection),
        Box::new(LodaOutlierDetection),
        Box::new(NegativeSamplingOutlierDetection),
        Box::new(PcaOutlierDetection),
        Box::new(RandomOutlierDetection),
        Box::new(RxOutlierDetection),
    ];
    for algorithm in algorithms {
        builder.register(algorithm.name(), algorithm)?;
    }
    Ok(())
}

/// Frozen registry of the built-in algorithms.
pub fn default_algorithms() -> Result<AlgorithmRegistry> {
    let mut builder = RegistryBuilder::new("algorithm");
    register_algorithms(&mut builder)?;
    Ok(builder.build())
}
