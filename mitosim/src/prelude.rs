pub use mitosim_building_blocks::*;
pub use mitosim_concepts::*;

pub use mitosim_core::errors::*;
pub use mitosim_core::neighbors::*;
pub use mitosim_core::parallel::*;
pub use mitosim_core::simulation::*;
pub use mitosim_core::time::*;
