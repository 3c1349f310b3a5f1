pub mod configure;
pub mod preview;
pub mod run;
pub mod show;
