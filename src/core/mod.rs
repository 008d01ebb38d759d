//! Invoice model and exact monetary computation.
//!
//! Line items compute their own gross, discount, subtotal, taxes,
//! surcharges and total; the invoice sums them and groups taxes the way
//! the fiscal request declares them.

mod builder;
mod error;
mod invoice;
mod line_item;
pub mod money;
mod tax;
mod validation;

pub use builder::*;
pub use error::*;
pub use invoice::*;
pub use line_item::*;
pub use money::{MAX_MAGNITUDE, check_magnitude, format2, mul2, parse_decimal, round2, sum2};
pub use tax::*;
pub use validation::*;
