pub mod count;
pub mod evolve;
pub mod generate;
pub mod pools;
