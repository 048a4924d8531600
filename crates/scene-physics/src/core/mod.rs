pub mod constraints;
pub mod contacts;
pub(crate) mod convert;
pub(crate) mod registry;
pub mod scene;
pub mod shapes;
pub mod sync;
pub mod time;
pub mod world;
