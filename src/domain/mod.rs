pub mod dte;
pub mod email;
pub mod search;
pub mod selection;
