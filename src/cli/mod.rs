pub mod aggregate;
pub mod check;
pub mod run;
