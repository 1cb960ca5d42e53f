/// Router Module Index
///
/// Routes are grouped by the guard that protects them, and each group gets its guard as a
/// `route_layer` in `create_router`. A handler can therefore never be mounted without one.

/// Read-only routes. The caller may be anonymous; a bearer token only personalizes
/// `myStatus`.
pub mod public;

/// Writes on behalf of a user. Requires a valid bearer token.
pub mod authenticated;

/// Blog and post management under `/sa`, guarded by HTTP Basic credentials.
pub mod admin;

/// Data wipe used by end-to-end suites. Only mounted when the testing module is enabled.
pub mod testing;
