//! Cross-crate scenarios.
//!
//! Gateway tests run against in-memory collaborators. Tests under `pgsql`
//! need a live PostgreSQL named by `SLUICE_TEST_DATABASE_URL` and are
//! ignored by default.

#[cfg(test)]
mod fakes;
#[cfg(test)]
mod gateway;
#[cfg(test)]
mod pgsql;
