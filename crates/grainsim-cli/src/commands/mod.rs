pub mod run;
pub mod styles;
