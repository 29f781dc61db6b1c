//! Seminar attendance server.
//!
//! Administrators load a student roster from CSV, create seminars and switch
//! them between `inactive`, `active` and `ended`. At the door every student's
//! QR code is scanned; [`attendance::mark_attendance`] records at most one
//! attendance per student and seminar and reports duplicates, unknown
//! students and seminar mix-ups as distinct outcomes. Attendance is exported
//! per seminar as CSV.
//!
//! Records live in PostgreSQL when `DATABASE_URL` is set and in memory
//! otherwise; see [`config::Config`] for the environment it reads.

pub mod attendance;
pub mod config;
pub mod err;
pub mod export;
pub mod io;
pub mod models;
pub mod qr;
pub mod roster;
pub mod routes;
pub mod state;
pub mod store;

use serde::Serialize;

pub use crate::err::{Error, Fine, Maybe, Nothing, Success};
pub use crate::routes::router;
pub use crate::state::AppState;

pub type Payload<T> = Result<Maybe<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Fine(value))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Ok(Nothing(err))
}
