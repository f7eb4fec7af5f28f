mod amount;
mod customer;
mod owner;
mod payment;

pub use amount::*;
pub use customer::*;
pub use owner::*;
pub use payment::*;
