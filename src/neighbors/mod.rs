pub mod engine;
pub mod smoother;
pub mod whitening;

pub use engine::{inclusive_neighbors, NeighborWeights, TIE_TOLERANCE};
pub use smoother::Smoother;
pub use whitening::WhiteningTransform;
