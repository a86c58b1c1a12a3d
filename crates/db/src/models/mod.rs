//! Row structs and create DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row plus a DTO for inserts where the caller supplies more than a couple
//! of fields.

pub mod participant;
pub mod room;
pub mod round;
pub mod vote;
