pub mod camera;
pub mod canvas;
pub mod costs;
pub mod debounce;
pub mod export;
pub mod form;
pub mod pdf;
pub mod photos;
pub mod signature;
