pub mod error;
pub mod geometry;
pub mod matrix;
pub mod mixer;
pub mod neighbours;
pub mod scale;
pub mod scene;
pub mod walk;

pub use error::SceneError;
pub use matrix::INFINITE_BOX_COST;
pub use mixer::{AudioStream, LinearStream, MAX_VOLUME, Mixer, NUM_CHANNELS, SoundHandle};
pub use scene::SceneContext;
pub use walk::{ActorWalkState, Gates, OldWalkPoints, WalkStep};
