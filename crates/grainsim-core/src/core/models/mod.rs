pub mod ids;
pub mod neighbor;
pub mod particle;
pub mod system;
pub mod wall;
